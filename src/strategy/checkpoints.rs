use serde::Serialize;
use std::fmt;

/// Lowest and highest percentage offset on the ladder
const MIN_OFFSET_PCT: i32 = -20;
const MAX_OFFSET_PCT: i32 = 20;

/// Default number of levels shown on each side of the marker
pub const DEFAULT_RADIUS: usize = 2;

/// Percentage price grid around an entry price
///
/// One level per whole percent from -20% to +20%, rounded to cents.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointLadder {
    entry_price: f64,
    levels: Vec<f64>,
}

impl CheckpointLadder {
    pub fn build(entry_price: f64) -> Self {
        let levels = (MIN_OFFSET_PCT..=MAX_OFFSET_PCT)
            .map(|r| round_cents(entry_price * (1.0 + r as f64 / 100.0)))
            .collect();

        Self {
            entry_price,
            levels,
        }
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Percentage offset of the level at `index`
    pub fn offset_pct(index: usize) -> i32 {
        MIN_OFFSET_PCT + index as i32
    }

    /// Index of the first level strictly above `price`
    ///
    /// Prices at or above the top level map to the last index.
    pub fn locate(&self, price: f64) -> usize {
        self.levels
            .iter()
            .position(|level| price < *level)
            .unwrap_or(self.levels.len().saturating_sub(1))
    }

    /// Levels around `index`, split at the current bracket
    pub fn window_around(&self, index: usize, radius: usize) -> LadderView {
        let index = index.min(self.levels.len().saturating_sub(1));
        let start = index.saturating_sub(radius);
        let end = (index + radius + 1).min(self.levels.len());

        LadderView {
            index,
            below: self.levels[start..index].to_vec(),
            above: self.levels[index..end].to_vec(),
            lower_pct: Self::offset_pct(start),
            upper_pct: Self::offset_pct(end.saturating_sub(1)),
        }
    }
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// A slice of the ladder with the marker between `below` and `above`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LadderView {
    pub index: usize,
    pub below: Vec<f64>,
    pub above: Vec<f64>,
    pub lower_pct: i32,
    pub upper_pct: i32,
}

impl fmt::Display for LadderView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cells: Vec<String> = self.below.iter().map(|p| format!("{:.2}", p)).collect();
        cells.push("*".to_string());
        cells.extend(self.above.iter().map(|p| format!("{:.2}", p)));

        write!(
            f,
            "{:+}% >[ {} ]> {:+}%",
            self.lower_pct,
            cells.join(" > "),
            self.upper_pct
        )
    }
}
