// Trend indicators
// OLS slope over a sliding window, blended with the bid/trade spread

pub mod regression;
pub mod trend;

pub use regression::{mean, ols_slope};
pub use trend::{
    classify_trend_level, compute_trend, price_slopes, samples_for, spread_rate, PriceSlopes,
    SlopeDirection, TrendConfig, TrendEstimator, TrendSample, MAX_TREND_LEVEL,
};
