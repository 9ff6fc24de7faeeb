//! Error types for pipeflow.
//!
//! Only composition-time failures are errors. Upstream exhaustion and
//! cancellation are normal terminal signals and never surface as
//! [`PipelineError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while composing a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No tokio runtime is available to spawn stage tasks on.
    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    /// Spawning another stage would exceed the configured limit.
    #[error("Stage limit exceeded: {active} stages live, limit is {limit}")]
    StageLimitExceeded {
        /// Stages live when the spawn was attempted.
        active: usize,
        /// The configured limit.
        limit: usize,
    },

    /// The pipeline configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A stage task panicked or could not be joined.
    #[error("Stage join error: {0}")]
    Join(String),
}

/// Why a stage stopped at a suspension point.
///
/// Neither variant is a failure. Stage bodies propagate it with `?` to
/// unwind to their exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Halt {
    /// The cancellation token fired.
    #[error("cancelled")]
    Cancelled,
    /// The downstream consumer dropped its end of the sequence.
    #[error("downstream disconnected")]
    Disconnected,
}

/// A per-item failure forwarded downstream as data.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("item {index} failed: {message}")]
pub struct ItemError {
    /// Position of the failing item in its input sequence.
    pub index: usize,
    /// The failure message.
    pub message: String,
}

impl ItemError {
    /// Creates a new item error.
    #[must_use]
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

/// Result type for pipeline composition.
pub type Result<T> = std::result::Result<T, PipelineError>;
