use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sellbot::feed::{QuoteScenario, SyntheticQuoteFeed};
use sellbot::*;

fn entry_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 5, 22).unwrap()
}

fn position(entry_price: f64) -> Position {
    Position::new("ZM", entry_price, entry_date()).with_quantity(11.0)
}

fn tick(i: i64, last: f64) -> Quote {
    Quote {
        symbol: "ZM".to_string(),
        timestamp: Utc.with_ymd_and_hms(2019, 5, 23, 13, 30, 0).unwrap() + Duration::seconds(i * 5),
        ask_price: last + 0.02,
        ask_size: 120,
        bid_price: last - 0.01,
        bid_size: 80,
        last_trade_price: last,
        mark_price: None,
        volume: None,
    }
}

fn engine(entry_price: f64) -> SellDecisionEngine {
    SellDecisionEngine::new(position(entry_price), &SellConfig::default()).unwrap()
}

fn synthetic(seed: u64, scenario: QuoteScenario, ticks: usize) -> Vec<Quote> {
    let start = Utc.with_ymd_and_hms(2019, 5, 23, 13, 30, 0).unwrap();
    SyntheticQuoteFeed::new(seed, "ZM", 100.0, start, 5).generate(scenario, ticks)
}

#[test]
fn test_single_stop_loss_grace() {
    let mut e = engine(100.0);

    let first = e.suggest(&tick(0, 96.0), -3).unwrap();
    let second = e.suggest(&tick(1, 96.0), -3).unwrap();

    assert!(!first.decision(), "first sharp breach gets a grace tick");
    assert!(second.decision(), "grace is only granted once");
    assert_eq!(
        second.trace_string(),
        "stop-loss-reached > stop-loss-sharp-down-confirmed"
    );
}

#[test]
fn test_entry_day_after_hours_quote_is_held() {
    let mut tracker = PositionTracker::new(position(100.0), TrackerSettings::default()).unwrap();
    let mut evening = tick(0, 90.0);
    // 20:30 in New York on the entry day
    evening.timestamp = Utc.with_ymd_and_hms(2019, 5, 23, 0, 30, 0).unwrap();

    let report = tracker.on_quote(evening).unwrap();
    assert!(!report.decision());
    assert_eq!(report.suggestion.trace, vec![Step::NoTradeSameDay]);
    assert!(report.summary().contains(" 20:30:00 "));
    assert!(!tracker.is_spent());
}

#[test]
fn test_ratchet_scenario_trace() {
    let mut e = engine(100.0);
    let ticks = [(103.5, 0), (104.0, 1), (103.9, -3)];

    let traces: Vec<(bool, Vec<&str>)> = ticks
        .iter()
        .enumerate()
        .map(|(i, (price, level))| {
            let s = e.suggest(&tick(i as i64, *price), *level).unwrap();
            (s.decision(), s.trace_codes())
        })
        .collect();

    assert_eq!(
        traces,
        vec![
            (false, vec!["above-base-profit", "base-profit-first-reached"]),
            (false, vec!["above-base-profit", "within-profit-band"]),
            (false, vec!["above-base-profit", "within-profit-band"]),
        ]
    );
    assert!(e.state().base_profit_reached);
    assert!((e.state().adjusted_profit_price - 104.03).abs() < 1e-9);
    assert!((e.state().adjusted_down_profit_price - 101.97).abs() < 1e-9);
}

#[test]
fn test_ratchet_scenario_starting_below_target() {
    // 101 sits under the 103 target, so the band is only armed on the second tick
    let mut e = engine(100.0);

    let first = e.suggest(&tick(0, 101.0), 0).unwrap();
    assert_eq!(
        first.trace_codes(),
        vec!["at-or-below-base-profit", "base-profit-not-reached"]
    );
    assert!(!e.state().base_profit_reached);

    let second = e.suggest(&tick(1, 104.0), 1).unwrap();
    assert_eq!(second.trace.last(), Some(&Step::BaseProfitFirstReached));

    let third = e.suggest(&tick(2, 103.9), -3).unwrap();
    assert!(!third.decision());
    assert_eq!(third.trace.last(), Some(&Step::WithinProfitBand));
}

#[test]
fn test_replay_is_deterministic() {
    let quotes = synthetic(42, QuoteScenario::Spike, 720);

    let run = |quotes: &[Quote]| -> Vec<(bool, String)> {
        let mut tracker = PositionTracker::new(position(100.0), TrackerSettings::default()).unwrap();
        quotes
            .iter()
            .map(|q| {
                let report = tracker.on_quote(q.clone()).unwrap();
                (report.decision(), report.suggestion.trace_string())
            })
            .collect()
    };

    let first = run(&quotes);
    let second = run(&quotes);
    assert_eq!(first, second);
    assert_eq!(first.len(), 720);
}

#[test]
fn test_ratchet_is_monotonic_on_random_walks() {
    for seed in 0..8 {
        for scenario in [QuoteScenario::Uptrend, QuoteScenario::Spike] {
            let mut tracker =
                PositionTracker::new(position(100.0), TrackerSettings::default()).unwrap();
            let mut last_ceiling: Option<f64> = None;

            for q in synthetic(seed, scenario, 1500) {
                tracker.on_quote(q).unwrap();
                let state = tracker.engine().state();
                if !state.base_profit_reached {
                    continue;
                }
                if let Some(prev) = last_ceiling {
                    assert!(
                        state.adjusted_profit_price >= prev,
                        "ceiling fell from {} to {} (seed {}, {:?})",
                        prev,
                        state.adjusted_profit_price,
                        seed,
                        scenario
                    );
                }
                last_ceiling = Some(state.adjusted_profit_price);
            }
        }
    }
}

#[test]
fn test_downtrend_ends_in_stop_loss() {
    let mut tracker = PositionTracker::new(position(100.0), TrackerSettings::default()).unwrap();

    let sell = synthetic(5, QuoteScenario::Downtrend, 1500)
        .into_iter()
        .map(|q| tracker.on_quote(q).unwrap())
        .find(|report| report.decision())
        .expect("a 1500 tick slide must breach a 3% stop");

    assert_eq!(sell.suggestion.trace.first(), Some(&Step::StopLossReached));
    assert!(sell.last_trade_price <= 97.0);
    assert!(tracker.is_spent());
}

#[test]
fn test_mark_price_tracking() {
    let settings = TrackerSettings {
        trend: TrendConfig {
            multiplier: [50.0, 1.0],
            factor: [0.0, 1.0],
            field: PriceField::Mark,
            ..TrendConfig::default()
        },
        ..TrackerSettings::default()
    };
    let mut tracker = PositionTracker::new(position(100.0), settings).unwrap();

    for q in synthetic(11, QuoteScenario::Sideways, 100) {
        let report = tracker.on_quote(q).unwrap();
        // spread weight is zero: the level comes from the slope alone
        assert_eq!(
            report.trend.trend_factor,
            report.trend.slope * 1.0 * 1.0
        );
    }
}

#[test]
fn test_sliding_window_fifo_bound() {
    let mut rng = StdRng::seed_from_u64(1);

    for _ in 0..50 {
        let capacity = rng.gen_range(1..40);
        let pushes = rng.gen_range(0..200);
        let mut window = SlidingWindow::new(capacity).unwrap();
        let mut pushed = Vec::new();

        for _ in 0..pushes {
            let v: u32 = rng.gen();
            window.push(v);
            pushed.push(v);
            assert!(window.len() <= capacity);
        }

        let expected = &pushed[pushed.len().saturating_sub(capacity)..];
        assert_eq!(window.snapshot(), expected);
        assert_eq!(window.peek_first(), expected.first());
        assert_eq!(window.peek_last(), expected.last());
    }
}

#[test]
fn test_checkpoint_bracket() {
    let ladder = CheckpointLadder::build(100.0);
    let index = ladder.locate(101.0);

    assert_eq!(ladder.levels()[index - 1], 101.0);
    assert_eq!(ladder.levels()[index], 102.0);
}
