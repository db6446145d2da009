use serde::{Deserialize, Serialize};
use std::fmt;

use super::regression::ols_slope;
use crate::error::{SignalError, SignalResult};
use crate::execution::SlidingWindow;
use crate::models::{PriceField, Quote};

/// Magnitude thresholds separating trend levels 1 | 2 | 3 | 4
const LEVEL_THRESHOLDS: [f64; 3] = [0.2, 0.5, 1.0];

/// Strongest trend level in either direction
pub const MAX_TREND_LEVEL: i8 = 4;

/// Settings for trend estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Lookback period in minutes
    pub period_minutes: u64,
    /// Seconds between ticks
    pub interval_secs: u64,
    /// Scale applied to [spread_rate, slope]
    pub multiplier: [f64; 2],
    /// Blend weights for [spread_rate, slope]
    pub factor: [f64; 2],
    /// Price the slope and spread are measured on
    pub field: PriceField,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            period_minutes: 3,
            interval_secs: 5,
            multiplier: [50.0, 71.0],
            factor: [0.4, 0.6],
            field: PriceField::LastTrade,
        }
    }
}

impl TrendConfig {
    pub fn validate(&self) -> SignalResult<()> {
        if self.interval_secs == 0 {
            return Err(SignalError::config("trend interval must be positive"));
        }
        if self.period_minutes == 0 {
            return Err(SignalError::config("trend period must be positive"));
        }
        if self
            .multiplier
            .iter()
            .chain(self.factor.iter())
            .any(|w| !w.is_finite())
        {
            return Err(SignalError::config(format!(
                "trend weights must be finite: multiplier {:?}, factor {:?}",
                self.multiplier, self.factor
            )));
        }
        Ok(())
    }

    /// Number of ticks covering the lookback period
    ///
    /// # Example
    /// ```
    /// use sellbot::indicators::TrendConfig;
    ///
    /// let config = TrendConfig::default();
    /// // 3 minute lookback, one tick every 5 seconds = 36 samples
    /// assert_eq!(config.samples_needed(), 36);
    /// ```
    pub fn samples_needed(&self) -> usize {
        samples_for(self.period_minutes, self.interval_secs)
    }
}

/// Ticks in `period_minutes` at one tick per `interval_secs`
pub fn samples_for(period_minutes: u64, interval_secs: u64) -> usize {
    if interval_secs == 0 {
        return 0;
    }
    ((60.0 / interval_secs as f64) * period_minutes as f64).floor() as usize
}

/// Trend estimate for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendSample {
    pub spread_rate: f64,
    pub slope: f64,
    pub trend_factor: f64,
    pub trend_level: i8,
}

/// Combines the bid/trade spread with the recent price slope
#[derive(Debug, Clone)]
pub struct TrendEstimator {
    config: TrendConfig,
}

impl TrendEstimator {
    pub fn new(config: TrendConfig) -> SignalResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Estimate the trend for `quote` over the buffered history
    pub fn compute(&self, quote: &Quote, window: &SlidingWindow<Quote>) -> SignalResult<TrendSample> {
        compute_trend(quote, window, &self.config)
    }
}

/// Normalized gap between the tracked price and the bid
pub fn spread_rate(quote: &Quote, field: PriceField) -> SignalResult<f64> {
    let tracked = quote.price(field)?;
    if tracked == 0.0 {
        return Err(SignalError::DivideByZero("spread rate"));
    }
    Ok((tracked - quote.bid_price) / tracked)
}

/// Stateless trend estimation
pub fn compute_trend(
    quote: &Quote,
    window: &SlidingWindow<Quote>,
    config: &TrendConfig,
) -> SignalResult<TrendSample> {
    let spread_rate = spread_rate(quote, config.field)?;
    let slope = field_slope(window, config.samples_needed(), config.field)?;

    let trend_factor = spread_rate * config.multiplier[0] * config.factor[0]
        + slope * config.multiplier[1] * config.factor[1];

    if !trend_factor.is_finite() {
        return Err(SignalError::input(format!(
            "{}: trend factor is not finite (spread {}, slope {})",
            quote.symbol, spread_rate, slope
        )));
    }

    Ok(TrendSample {
        spread_rate,
        slope,
        trend_factor,
        trend_level: classify_trend_level(trend_factor),
    })
}

/// Bucket a trend factor into a signed level in -4..=4
///
/// Level 0 only for an exactly zero factor.
pub fn classify_trend_level(trend_factor: f64) -> i8 {
    let magnitude = trend_factor.abs();
    let level = if magnitude == 0.0 {
        0
    } else {
        1 + LEVEL_THRESHOLDS.iter().filter(|t| magnitude >= **t).count() as i8
    };

    if trend_factor < 0.0 {
        -level
    } else {
        level
    }
}

/// OLS slope of `field` over the last `samples` quotes
fn field_slope(window: &SlidingWindow<Quote>, samples: usize, field: PriceField) -> SignalResult<f64> {
    let skip = window.len().saturating_sub(samples);
    let prices = window
        .iter()
        .skip(skip)
        .map(|q| q.price(field))
        .collect::<SignalResult<Vec<f64>>>()?;

    Ok(ols_slope(&prices))
}

/// Direction of a price slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlopeDirection {
    Up,
    Flat,
    Down,
}

impl SlopeDirection {
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            SlopeDirection::Up
        } else if slope < 0.0 {
            SlopeDirection::Down
        } else {
            SlopeDirection::Flat
        }
    }

    pub fn glyph(self) -> char {
        match self {
            SlopeDirection::Up => '/',
            SlopeDirection::Flat => '-',
            SlopeDirection::Down => '\\',
        }
    }
}

impl fmt::Display for SlopeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Slopes of ask, bid and tracked price over one lookback period
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSlopes {
    pub period_minutes: u64,
    pub ask: f64,
    pub bid: f64,
    pub tracked: f64,
}

impl PriceSlopes {
    pub fn directions(&self) -> [SlopeDirection; 3] {
        [
            SlopeDirection::from_slope(self.ask),
            SlopeDirection::from_slope(self.bid),
            SlopeDirection::from_slope(self.tracked),
        ]
    }
}

/// Ask, bid and tracked-price slopes over `period_minutes`
pub fn price_slopes(
    window: &SlidingWindow<Quote>,
    period_minutes: u64,
    interval_secs: u64,
    field: PriceField,
) -> SignalResult<PriceSlopes> {
    let samples = samples_for(period_minutes, interval_secs);

    Ok(PriceSlopes {
        period_minutes,
        ask: field_slope(window, samples, PriceField::Ask)?,
        bid: field_slope(window, samples, PriceField::Bid)?,
        tracked: field_slope(window, samples, field)?,
    })
}
