use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::error::{SignalError, SignalResult};
use crate::execution::SlidingWindow;
use crate::indicators::{mean, MAX_TREND_LEVEL};
use crate::models::{Position, Quote, Side, Signal};

/// Trend level below which a move counts as a confirmed sharp drop
const SHARP_DOWN_LEVEL: i8 = -2;

/// Average trend level below which a pullback counts as a reversal
const REVERSAL_TREND_AVG: f64 = -1.0;

/// Minutes of trend levels kept for the reversal average
const TREND_HISTORY_MINUTES: u64 = 3;

/// One-time widening applied to the stop-loss rate
const STOP_LOSS_GRACE: f64 = 1.01;

const RATCHET_UP: f64 = 1.01;
const RATCHET_FLOOR: f64 = 0.99;

/// Tuning for the exit engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellConfig {
    /// Gain over entry that arms the trailing take-profit (0.03 = +3%)
    pub base_profitable_rate: f64,
    /// Loss under entry that triggers the stop (0.03 = -3%)
    pub stop_loss_rate: f64,
    /// Seconds between ticks
    pub refresh_rate_secs: u64,
}

impl Default for SellConfig {
    fn default() -> Self {
        Self {
            base_profitable_rate: 0.03,
            stop_loss_rate: 0.03,
            refresh_rate_secs: 5,
        }
    }
}

impl SellConfig {
    pub fn validate(&self) -> SignalResult<()> {
        if !self.base_profitable_rate.is_finite() || self.base_profitable_rate <= 0.0 {
            return Err(SignalError::config(format!(
                "base_profitable_rate must be positive, got {}",
                self.base_profitable_rate
            )));
        }
        if !self.stop_loss_rate.is_finite()
            || self.stop_loss_rate <= 0.0
            || self.stop_loss_rate >= 1.0
        {
            return Err(SignalError::config(format!(
                "stop_loss_rate must be in (0, 1), got {}",
                self.stop_loss_rate
            )));
        }
        if self.trend_history_len() == 0 {
            return Err(SignalError::config(format!(
                "refresh_rate_secs must be between 1 and {}, got {}",
                TREND_HISTORY_MINUTES * 60,
                self.refresh_rate_secs
            )));
        }
        Ok(())
    }

    /// Trend levels kept for the reversal average
    pub fn trend_history_len(&self) -> usize {
        if self.refresh_rate_secs == 0 {
            return 0;
        }
        (TREND_HISTORY_MINUTES * 60 / self.refresh_rate_secs) as usize
    }
}

/// Mutable exit state for one position
#[derive(Debug, Clone)]
pub struct SellDecisionState {
    pub stop_loss_rate: f64,
    pub stop_loss_price: f64,
    pub stop_loss_rate_adjusted: bool,
    pub base_profit_price: f64,
    pub adjusted_profit_price: f64,
    pub adjusted_down_profit_price: f64,
    pub base_profit_reached: bool,
    pub trend_history: SlidingWindow<i8>,
}

/// Branch codes recorded in a decision trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    NoTradeSameDay,
    StopLossReached,
    StopLossSharpDownConfirmed,
    StopLossGraceGranted,
    StopLossNoSharpDown,
    AboveBaseProfit,
    BaseProfitFirstReached,
    NewHighRatchetUp,
    WithinProfitBand,
    PullbackBelowFloor,
    PullbackSharpDown,
    PullbackTrendAverageDown,
    PullbackTrendAverageHolding,
    AtOrBelowBaseProfit,
    HuggingBaseProfit,
    HuggingSharpDown,
    HuggingHold,
    FellBelowBaseProfit,
    BaseProfitNotReached,
}

impl Step {
    pub fn code(self) -> &'static str {
        match self {
            Step::NoTradeSameDay => "no-trade-same-day",
            Step::StopLossReached => "stop-loss-reached",
            Step::StopLossSharpDownConfirmed => "stop-loss-sharp-down-confirmed",
            Step::StopLossGraceGranted => "stop-loss-grace-granted",
            Step::StopLossNoSharpDown => "stop-loss-no-sharp-down",
            Step::AboveBaseProfit => "above-base-profit",
            Step::BaseProfitFirstReached => "base-profit-first-reached",
            Step::NewHighRatchetUp => "new-high-ratchet-up",
            Step::WithinProfitBand => "within-profit-band",
            Step::PullbackBelowFloor => "pullback-below-floor",
            Step::PullbackSharpDown => "pullback-sharp-down",
            Step::PullbackTrendAverageDown => "pullback-trend-average-down",
            Step::PullbackTrendAverageHolding => "pullback-trend-average-holding",
            Step::AtOrBelowBaseProfit => "at-or-below-base-profit",
            Step::HuggingBaseProfit => "hugging-base-profit",
            Step::HuggingSharpDown => "hugging-sharp-down",
            Step::HuggingHold => "hugging-hold",
            Step::FellBelowBaseProfit => "fell-below-base-profit",
            Step::BaseProfitNotReached => "base-profit-not-reached",
        }
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of one `suggest` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellSuggestion {
    pub trace: Vec<Step>,
    pub signal: Signal,
    /// The engine had already recommended a sale before this tick
    pub after_terminal: bool,
}

impl SellSuggestion {
    pub fn decision(&self) -> bool {
        self.signal.is_sell()
    }

    pub fn trace_codes(&self) -> Vec<&'static str> {
        self.trace.iter().map(|s| s.code()).collect()
    }

    /// Trace rendered as `a > b > c`
    pub fn trace_string(&self) -> String {
        self.trace_codes().join(" > ")
    }
}

/// Trailing stop / trailing take-profit with trend confirmation
///
/// Bound to one long position for its whole life. The first sell marks the
/// engine spent; it keeps answering, and callers are expected to close the
/// position and drop it.
#[derive(Debug, Clone)]
pub struct SellDecisionEngine {
    position: Position,
    state: SellDecisionState,
    spent: bool,
}

impl SellDecisionEngine {
    pub fn new(position: Position, config: &SellConfig) -> SignalResult<Self> {
        position.validate()?;
        config.validate()?;

        if position.side != Side::Buy {
            return Err(SignalError::config(format!(
                "{}: exit signals need a long (buy) position",
                position.symbol
            )));
        }

        let base_profit_price = position.entry_price * (1.0 + config.base_profitable_rate);
        let state = SellDecisionState {
            stop_loss_rate: config.stop_loss_rate,
            stop_loss_price: position.entry_price * (1.0 - config.stop_loss_rate),
            stop_loss_rate_adjusted: false,
            base_profit_price,
            adjusted_profit_price: base_profit_price,
            adjusted_down_profit_price: base_profit_price * RATCHET_FLOOR,
            base_profit_reached: false,
            trend_history: SlidingWindow::new(config.trend_history_len())?,
        };

        tracing::debug!(
            "{}: exit engine armed (entry ${:.2}, stop ${:.2}, target ${:.2})",
            position.symbol,
            position.entry_price,
            state.stop_loss_price,
            state.base_profit_price
        );

        Ok(Self {
            position,
            state,
            spent: false,
        })
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn state(&self) -> &SellDecisionState {
        &self.state
    }

    /// Whether a sale has already been recommended
    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Evaluate one tick
    ///
    /// Rejected ticks (`Err`) leave the state untouched.
    pub fn suggest(&mut self, quote: &Quote, trend_level: i8) -> SignalResult<SellSuggestion> {
        quote.validate()?;

        if quote.symbol != self.position.symbol {
            return Err(SignalError::input(format!(
                "quote for {} fed to the {} engine",
                quote.symbol, self.position.symbol
            )));
        }
        if trend_level.abs() > MAX_TREND_LEVEL {
            return Err(SignalError::input(format!(
                "trend level {} outside -{}..={}",
                trend_level, MAX_TREND_LEVEL, MAX_TREND_LEVEL
            )));
        }

        let after_terminal = self.spent;

        // Never close a position on the trading day it was opened
        if quote.date_in(self.position.timezone) == self.position.entry_date {
            return Ok(SellSuggestion {
                trace: vec![Step::NoTradeSameDay],
                signal: Signal::Hold,
                after_terminal,
            });
        }

        self.state.trend_history.push(trend_level);

        let price = quote.last_trade_price;
        let (trace, signal) = if price <= self.state.stop_loss_price {
            self.stop_loss(price, trend_level)
        } else if price > self.state.base_profit_price {
            self.above_base_profit(price, trend_level)
        } else {
            self.at_or_below_base_profit(price, trend_level)
        };

        tracing::debug!(
            "{} @ ${:.2} (trend {:+}): {}",
            self.position.symbol,
            price,
            trend_level,
            trace.iter().map(|s| s.code()).collect::<Vec<_>>().join(" > ")
        );

        if signal.is_sell() {
            if !self.spent {
                tracing::info!(
                    "🔻 {} sell signal @ ${:.2} ({})",
                    self.position.symbol,
                    price,
                    trace.last().map(|s| s.code()).unwrap_or_default()
                );
            }
            self.spent = true;
        }

        Ok(SellSuggestion {
            trace,
            signal,
            after_terminal,
        })
    }

    fn stop_loss(&mut self, price: f64, trend_level: i8) -> (Vec<Step>, Signal) {
        let mut trace = vec![Step::StopLossReached];

        let signal = if trend_level < SHARP_DOWN_LEVEL {
            if self.state.stop_loss_rate_adjusted {
                trace.push(Step::StopLossSharpDownConfirmed);
                Signal::Sell
            } else {
                self.state.stop_loss_rate *= STOP_LOSS_GRACE;
                self.state.stop_loss_price =
                    self.position.entry_price * (1.0 - self.state.stop_loss_rate);
                tracing::info!(
                    "{} @ ${:.2}: stop-loss grace, stop moved to ${:.2}",
                    self.position.symbol,
                    price,
                    self.state.stop_loss_price
                );
                trace.push(Step::StopLossGraceGranted);
                Signal::Hold
            }
        } else {
            trace.push(Step::StopLossNoSharpDown);
            Signal::Sell
        };

        // Grace is granted at most once per position
        self.state.stop_loss_rate_adjusted = true;

        (trace, signal)
    }

    fn above_base_profit(&mut self, price: f64, trend_level: i8) -> (Vec<Step>, Signal) {
        let mut trace = vec![Step::AboveBaseProfit];

        if !self.state.base_profit_reached {
            self.state.base_profit_reached = true;
            self.ratchet_up();
            trace.push(Step::BaseProfitFirstReached);
            return (trace, Signal::Hold);
        }

        if price > self.state.adjusted_profit_price {
            self.ratchet_up();
            trace.push(Step::NewHighRatchetUp);
            return (trace, Signal::Hold);
        }

        if price >= self.state.adjusted_down_profit_price {
            trace.push(Step::WithinProfitBand);
            return (trace, Signal::Hold);
        }

        trace.push(Step::PullbackBelowFloor);
        if trend_level < SHARP_DOWN_LEVEL {
            trace.push(Step::PullbackSharpDown);
            return (trace, Signal::Sell);
        }

        let trend_avg = mean(self.state.trend_history.iter().map(|l| *l as f64)).unwrap_or(0.0);
        if trend_avg < REVERSAL_TREND_AVG {
            trace.push(Step::PullbackTrendAverageDown);
            (trace, Signal::Sell)
        } else {
            trace.push(Step::PullbackTrendAverageHolding);
            (trace, Signal::Hold)
        }
    }

    fn at_or_below_base_profit(&mut self, price: f64, trend_level: i8) -> (Vec<Step>, Signal) {
        let mut trace = vec![Step::AtOrBelowBaseProfit];

        if !self.state.base_profit_reached {
            trace.push(Step::BaseProfitNotReached);
            return (trace, Signal::Hold);
        }

        if price > self.state.base_profit_price * RATCHET_FLOOR {
            trace.push(Step::HuggingBaseProfit);
            if trend_level < SHARP_DOWN_LEVEL {
                trace.push(Step::HuggingSharpDown);
                (trace, Signal::Sell)
            } else {
                trace.push(Step::HuggingHold);
                (trace, Signal::Hold)
            }
        } else {
            trace.push(Step::FellBelowBaseProfit);
            (trace, Signal::Sell)
        }
    }

    /// Floor becomes the previous ceiling less 1%, ceiling rises 1%
    fn ratchet_up(&mut self) {
        self.state.adjusted_down_profit_price = self.state.adjusted_profit_price * RATCHET_FLOOR;
        self.state.adjusted_profit_price *= RATCHET_UP;

        tracing::info!(
            "{}: profit band ratcheted to ${:.2} .. ${:.2}",
            self.position.symbol,
            self.state.adjusted_down_profit_price,
            self.state.adjusted_profit_price
        );
    }
}
