// Core modules
pub mod config;
pub mod error;
pub mod execution;
pub mod feed;
pub mod indicators;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use error::{SignalError, SignalResult};
pub use execution::{PositionTracker, SlidingWindow, TickReport, TrackerSettings};
pub use indicators::{TrendConfig, TrendEstimator, TrendSample};
pub use models::*;
pub use strategy::{CheckpointLadder, SellConfig, SellDecisionEngine, SellSuggestion, Step};
