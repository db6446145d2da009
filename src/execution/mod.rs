// Per-position sample history and tick pipeline
pub mod sliding_window;
pub mod tracker;

pub use sliding_window::SlidingWindow;
pub use tracker::{PositionTracker, TickReport, TrackerSettings};
