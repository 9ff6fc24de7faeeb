//! Cooperative cancellation and stage task tracking.
//!
//! This module provides:
//! - CancellationToken, the one-shot broadcast stop signal
//! - StageTracker for counting and joining live stage tasks

mod token;
mod tracker;

pub use token::{CancelCallback, CancellationToken};
pub use tracker::{StageSlot, StageTracker};
