//! Trade lifecycle: domain types, decisions, safety bounds and the controller

pub mod controller;
pub mod evaluator;
pub mod safety;
pub mod types;


pub use controller::{RunMode, SweepSummary, TradeController};
pub use types::{Direction, ExitReason, Signal, TimeframeClass, Trade, TradeStatus};
