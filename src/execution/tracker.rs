use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::SlidingWindow;
use crate::error::{SignalError, SignalResult};
use crate::indicators::{
    price_slopes, samples_for, spread_rate, PriceSlopes, SlopeDirection, TrendConfig,
    TrendEstimator, TrendSample,
};
use crate::models::{Position, Quote, Side};
use crate::strategy::{
    CheckpointLadder, LadderView, SellConfig, SellDecisionEngine, SellSuggestion, DEFAULT_RADIUS,
};

/// Everything a tracker needs besides the position
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub sell: SellConfig,
    pub trend: TrendConfig,
    /// Lookbacks (minutes) for the ask/bid/price slope arrows
    pub slope_periods: Vec<u64>,
    pub ladder_radius: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            sell: SellConfig::default(),
            trend: TrendConfig::default(),
            slope_periods: vec![5, 10],
            ladder_radius: DEFAULT_RADIUS,
        }
    }
}

/// What happened on one tick
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Exchange zone the console time is shown in
    pub timezone: Tz,
    pub ask_price: f64,
    pub bid_price: f64,
    pub last_trade_price: f64,
    pub trend: TrendSample,
    pub slopes: Vec<PriceSlopes>,
    pub ladder: LadderView,
    /// Per-share gain over entry
    pub pnl_per_share: f64,
    pub pnl_rate: f64,
    /// Gain over the whole quantity (buy positions only)
    pub total_pnl: f64,
    /// Volume traded since the previous tick, when the feed reports volume
    ///
    /// A missing previous volume (first tick included) counts as zero.
    pub volume_delta: Option<f64>,
    pub suggestion: SellSuggestion,
}

impl TickReport {
    pub fn decision(&self) -> bool {
        self.suggestion.decision()
    }

    /// One console line: prices with slope arrows, P&L, ladder and decision
    pub fn summary(&self) -> String {
        let arrows = |pick: fn(&PriceSlopes) -> f64| -> String {
            self.slopes
                .iter()
                .map(|s| SlopeDirection::from_slope(pick(s)).glyph())
                .collect()
        };

        format!(
            "{:<5} {} {:>9.3} ({}) {:>9.3} ({}) {:>9.3} ({}) [{:+.2}%] --> [{:+.2}$] [{:+.2}%] [{:+.2}$] {} | {:.3}, {:.2}, {:+} | {}{}",
            self.symbol,
            self.timestamp.with_timezone(&self.timezone).format("%H:%M:%S"),
            self.ask_price,
            arrows(|s| s.ask),
            self.bid_price,
            arrows(|s| s.bid),
            self.last_trade_price,
            arrows(|s| s.tracked),
            self.trend.spread_rate * 100.0,
            self.pnl_per_share,
            self.pnl_rate * 100.0,
            self.total_pnl,
            self.ladder,
            self.trend.slope,
            self.trend.trend_factor,
            self.trend.trend_level,
            if self.decision() { "SELL: " } else { "hold: " },
            self.suggestion.trace_string()
        )
    }
}

/// Runs the per-tick pipeline for one open position
///
/// Owns the quote history, ladder and exit engine of that position.
pub struct PositionTracker {
    window: SlidingWindow<Quote>,
    estimator: TrendEstimator,
    ladder: CheckpointLadder,
    engine: SellDecisionEngine,
    slope_periods: Vec<u64>,
    ladder_radius: usize,
}

impl PositionTracker {
    pub fn new(position: Position, settings: TrackerSettings) -> SignalResult<Self> {
        let estimator = TrendEstimator::new(settings.trend)?;
        let trend = estimator.config();

        if settings.slope_periods.iter().any(|p| *p == 0) {
            return Err(SignalError::config("slope periods must be positive"));
        }

        // Keep enough history for the longest lookback in use
        let capacity = settings
            .slope_periods
            .iter()
            .map(|p| samples_for(*p, trend.interval_secs))
            .chain(std::iter::once(trend.samples_needed()))
            .max()
            .unwrap_or(1)
            .max(1);

        let ladder = CheckpointLadder::build(position.entry_price);
        let engine = SellDecisionEngine::new(position, &settings.sell)?;

        tracing::info!(
            "Tracking {} @ ${:.2} (history {} quotes, trend window {} quotes)",
            engine.position().symbol,
            engine.position().entry_price,
            capacity,
            trend.samples_needed()
        );

        Ok(Self {
            window: SlidingWindow::new(capacity)?,
            estimator,
            ladder,
            engine,
            slope_periods: settings.slope_periods,
            ladder_radius: settings.ladder_radius,
        })
    }

    pub fn position(&self) -> &Position {
        self.engine.position()
    }

    pub fn engine(&self) -> &SellDecisionEngine {
        &self.engine
    }

    pub fn window(&self) -> &SlidingWindow<Quote> {
        &self.window
    }

    pub fn ladder(&self) -> &CheckpointLadder {
        &self.ladder
    }

    /// Whether a sale has been recommended
    pub fn is_spent(&self) -> bool {
        self.engine.is_spent()
    }

    /// Process one quote
    ///
    /// A rejected quote is neither buffered nor seen by the engine.
    pub fn on_quote(&mut self, quote: Quote) -> SignalResult<TickReport> {
        if let Err(e) = self.check(&quote) {
            tracing::warn!("Rejected tick for {}: {}", self.position().symbol, e);
            return Err(e);
        }

        let volume_delta = quote.volume.map(|now| {
            now - self
                .window
                .peek_last()
                .and_then(|q| q.volume)
                .unwrap_or(0.0)
        });

        let evicted = self.window.push(quote.clone());
        let (trend, slopes, suggestion) = match self.evaluate(&quote) {
            Ok(evaluated) => evaluated,
            Err(e) => {
                self.window.undo_push(evicted);
                tracing::warn!("Rejected tick for {}: {}", quote.symbol, e);
                return Err(e);
            }
        };

        let position = self.engine.position();
        let last = quote.last_trade_price;
        let pnl_per_share = last - position.entry_price;
        let total_pnl = match position.side {
            Side::Buy => pnl_per_share * position.quantity,
            Side::Sell => 0.0,
        };
        let ladder = self
            .ladder
            .window_around(self.ladder.locate(last), self.ladder_radius);

        Ok(TickReport {
            symbol: quote.symbol,
            timestamp: quote.timestamp,
            timezone: position.timezone,
            ask_price: quote.ask_price,
            bid_price: quote.bid_price,
            last_trade_price: last,
            trend,
            slopes,
            ladder,
            pnl_per_share,
            pnl_rate: pnl_per_share / position.entry_price,
            total_pnl,
            volume_delta,
            suggestion,
        })
    }

    /// Trend, slopes and engine verdict for a quote already in the window
    ///
    /// The engine is last so an earlier failure never reaches its state.
    fn evaluate(
        &mut self,
        quote: &Quote,
    ) -> SignalResult<(TrendSample, Vec<PriceSlopes>, SellSuggestion)> {
        let trend = self.estimator.compute(quote, &self.window)?;
        let field = self.estimator.config().field;
        let interval = self.estimator.config().interval_secs;
        let slopes = self
            .slope_periods
            .iter()
            .map(|p| price_slopes(&self.window, *p, interval, field))
            .collect::<SignalResult<Vec<_>>>()?;

        tracing::debug!(
            "{}: spread {:.4}, slope {:.5}, factor {:.3}, level {:+}",
            quote.symbol,
            trend.spread_rate,
            trend.slope,
            trend.trend_factor,
            trend.trend_level
        );

        let suggestion = self.engine.suggest(quote, trend.trend_level)?;
        Ok((trend, slopes, suggestion))
    }

    /// Cheap checks run before the quote is buffered
    fn check(&self, quote: &Quote) -> SignalResult<()> {
        quote.validate()?;

        if quote.symbol != self.position().symbol {
            return Err(SignalError::input(format!(
                "quote for {} fed to the {} tracker",
                quote.symbol,
                self.position().symbol
            )));
        }

        spread_rate(quote, self.estimator.config().field)?;
        Ok(())
    }
}
