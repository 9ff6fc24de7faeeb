//! Testing utilities for pipelines.
//!
//! This module provides:
//! - Assertions over sequences and signals
//! - A fixture that owns a run and records its stage events

mod assertions;
mod fixtures;

pub use assertions::{assert_drains_to, assert_fires_within, assert_stays_pending};
pub use fixtures::TestRun;
