// Exit decision module
pub mod checkpoints;
pub mod sell;

pub use checkpoints::{CheckpointLadder, LadderView, DEFAULT_RADIUS};
pub use sell::{SellConfig, SellDecisionEngine, SellDecisionState, SellSuggestion, Step};
