use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::Quote;

/// Price path shapes for synthetic quotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum QuoteScenario {
    /// Steady climb with noise (+0.01% per tick)
    Uptrend,
    /// Steady slide with noise (-0.01% per tick)
    Downtrend,
    /// Mean-reverting chop around the start price
    Sideways,
    /// Run-up over the first half, sharper reversal over the second
    Spike,
}

/// Generates seeded quote streams for demos and tests
pub struct SyntheticQuoteFeed {
    rng: StdRng,
    symbol: String,
    start_price: f64,
    start_time: DateTime<Utc>,
    interval_secs: i64,
    /// Maximum bid offset below the last trade, as a fraction of price
    spread: f64,
}

impl SyntheticQuoteFeed {
    /// Create a new generator with a seed for reproducibility
    pub fn new(
        seed: u64,
        symbol: impl Into<String>,
        start_price: f64,
        start_time: DateTime<Utc>,
        interval_secs: u64,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            symbol: symbol.into(),
            start_price,
            start_time,
            interval_secs: interval_secs.max(1) as i64,
            spread: 0.002,
        }
    }

    pub fn with_spread(mut self, spread: f64) -> Self {
        self.spread = spread.abs();
        self
    }

    /// Generate `num_ticks` quotes, one per interval
    pub fn generate(&mut self, scenario: QuoteScenario, num_ticks: usize) -> Vec<Quote> {
        let mut quotes = Vec::with_capacity(num_ticks);
        let mut price = self.start_price;
        let mut volume = 0.0;

        for i in 0..num_ticks {
            let drift = match scenario {
                QuoteScenario::Uptrend => 0.0001,
                QuoteScenario::Downtrend => -0.0001,
                QuoteScenario::Sideways => (self.start_price - price) / price * 0.1,
                QuoteScenario::Spike => {
                    if i < num_ticks / 2 {
                        0.0002
                    } else {
                        -0.0003
                    }
                }
            };
            let noise = self.rng.gen_range(-0.0005..0.0005); // ±0.05% noise
            price = (price * (1.0 + drift + noise)).max(0.01);

            volume += self.rng.gen_range(100.0..5_000.0_f64).round();
            let timestamp = self.start_time + Duration::seconds(i as i64 * self.interval_secs);
            quotes.push(self.create_quote(price, volume, timestamp));
        }

        quotes
    }

    /// Build a quote with bid/ask scattered around the last trade
    fn create_quote(&mut self, last: f64, volume: f64, timestamp: DateTime<Utc>) -> Quote {
        // Bid usually sits under the last trade; occasionally above it on selling
        let bid_offset = self.rng.gen_range(-0.5..1.0) * self.spread;
        let ask_offset = self.rng.gen_range(0.0..1.0) * self.spread;

        let bid = (last * (1.0 - bid_offset)).max(0.01);
        let ask = (last * (1.0 + ask_offset)).max(bid);

        Quote {
            symbol: self.symbol.clone(),
            timestamp,
            ask_price: round_cents(ask),
            ask_size: self.rng.gen_range(1..500),
            bid_price: round_cents(bid),
            bid_size: self.rng.gen_range(1..500),
            last_trade_price: round_cents(last),
            mark_price: Some(round_cents((bid + ask) / 2.0)),
            volume: Some(volume),
        }
    }
}

fn round_cents(price: f64) -> f64 {
    ((price * 100.0).round() / 100.0).max(0.01)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn feed(seed: u64) -> SyntheticQuoteFeed {
        let start = Utc.with_ymd_and_hms(2019, 5, 23, 13, 30, 0).unwrap();
        SyntheticQuoteFeed::new(seed, "ZM", 84.88, start, 5)
    }

    #[test]
    fn test_generate_uptrend() {
        let quotes = feed(42).generate(QuoteScenario::Uptrend, 1000);
        assert_eq!(quotes.len(), 1000);

        let first = quotes.first().unwrap().last_trade_price;
        let last = quotes.last().unwrap().last_trade_price;
        assert!(last > first, "Uptrend should end higher: {} -> {}", first, last);
    }

    #[test]
    fn test_generate_downtrend() {
        let quotes = feed(42).generate(QuoteScenario::Downtrend, 1000);
        let first = quotes.first().unwrap().last_trade_price;
        let last = quotes.last().unwrap().last_trade_price;
        assert!(last < first, "Downtrend should end lower: {} -> {}", first, last);
    }

    #[test]
    fn test_generate_sideways() {
        let quotes = feed(7).generate(QuoteScenario::Sideways, 500);
        for q in &quotes {
            assert!(
                q.last_trade_price > 84.88 * 0.95 && q.last_trade_price < 84.88 * 1.05,
                "Sideways should stay near start: {}",
                q.last_trade_price
            );
        }
    }

    #[test]
    fn test_quotes_are_valid() {
        for scenario in [
            QuoteScenario::Uptrend,
            QuoteScenario::Downtrend,
            QuoteScenario::Sideways,
            QuoteScenario::Spike,
        ] {
            for q in feed(3).generate(scenario, 200) {
                assert!(q.validate().is_ok(), "{:?} produced {:?}", scenario, q);
                assert!(q.ask_price >= q.bid_price);
            }
        }
    }

    #[test]
    fn test_timestamps_are_sequential() {
        let quotes = feed(42).generate(QuoteScenario::Spike, 100);
        for pair in quotes.windows(2) {
            assert_eq!((pair[1].timestamp - pair[0].timestamp).num_seconds(), 5);
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a = feed(9).generate(QuoteScenario::Spike, 50);
        let b = feed(9).generate(QuoteScenario::Spike, 50);
        assert_eq!(a, b);
    }
}
