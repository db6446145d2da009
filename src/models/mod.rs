use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{SignalError, SignalResult};

/// A single market quote for one symbol, as delivered by the poller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub symbol: String,
    #[serde(alias = "updated_at")]
    pub timestamp: DateTime<Utc>,
    pub ask_price: f64,
    pub ask_size: i64,
    pub bid_price: f64,
    pub bid_size: i64,
    pub last_trade_price: f64,
    #[serde(default)]
    pub mark_price: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Quote {
    /// Check the field invariants the signal core relies on
    pub fn validate(&self) -> SignalResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(SignalError::input("quote symbol is empty"));
        }

        for (name, value) in [
            ("ask_price", self.ask_price),
            ("bid_price", self.bid_price),
            ("last_trade_price", self.last_trade_price),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SignalError::input(format!(
                    "{} {}: {} must be a positive price, got {}",
                    self.symbol, self.timestamp, name, value
                )));
            }
        }

        if let Some(mark) = self.mark_price {
            if !mark.is_finite() || mark <= 0.0 {
                return Err(SignalError::input(format!(
                    "{}: mark_price must be a positive price, got {}",
                    self.symbol, mark
                )));
            }
        }

        if self.ask_size < 0 || self.bid_size < 0 {
            return Err(SignalError::input(format!(
                "{}: sizes must be non-negative (ask {}, bid {})",
                self.symbol, self.ask_size, self.bid_size
            )));
        }

        if let Some(volume) = self.volume {
            if !volume.is_finite() || volume < 0.0 {
                return Err(SignalError::input(format!(
                    "{}: volume must be non-negative, got {}",
                    self.symbol, volume
                )));
            }
        }

        Ok(())
    }

    /// Calendar date of the quote on the market's clock
    pub fn date_in(&self, timezone: Tz) -> NaiveDate {
        self.timestamp.with_timezone(&timezone).date_naive()
    }

    /// Read one of the tracked price fields
    pub fn price(&self, field: PriceField) -> SignalResult<f64> {
        match field {
            PriceField::Ask => Ok(self.ask_price),
            PriceField::Bid => Ok(self.bid_price),
            PriceField::LastTrade => Ok(self.last_trade_price),
            PriceField::Mark => self.mark_price.ok_or_else(|| {
                SignalError::input(format!("{}: mark_price missing", self.symbol))
            }),
        }
    }
}

/// Which quote price a trend is tracked on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Ask,
    Bid,
    #[default]
    LastTrade,
    Mark,
}

/// Side of the opening transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

/// Exchange time zone when a position does not name one
pub const DEFAULT_MARKET_TZ: Tz = chrono_tz::America::New_York;

fn default_market_tz() -> Tz {
    DEFAULT_MARKET_TZ
}

/// An open position the exit engine watches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    /// Trading day the position was opened, on the market's clock
    pub entry_date: NaiveDate,
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub quantity: f64,
    /// IANA zone of the exchange, e.g. `America/New_York`
    #[serde(default = "default_market_tz")]
    pub timezone: Tz,
}

impl Position {
    pub fn new(symbol: impl Into<String>, entry_price: f64, entry_date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            entry_price,
            entry_date,
            side: Side::Buy,
            quantity: 0.0,
            timezone: DEFAULT_MARKET_TZ,
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn validate(&self) -> SignalResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(SignalError::config("position symbol is empty"));
        }
        if !self.entry_price.is_finite() || self.entry_price <= 0.0 {
            return Err(SignalError::config(format!(
                "entry_price must be positive, got {}",
                self.entry_price
            )));
        }
        if !self.quantity.is_finite() || self.quantity < 0.0 {
            return Err(SignalError::config(format!(
                "quantity must be non-negative, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}

/// Outcome of one exit evaluation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Hold,
    Sell,
}

impl Signal {
    pub fn is_sell(self) -> bool {
        self == Signal::Sell
    }
}
