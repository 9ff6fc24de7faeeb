//! Pipeline configuration.

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by every stage spawned from a [`StageContext`].
///
/// [`StageContext`]: crate::stages::StageContext
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of each sequence a stage produces.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Maximum number of concurrently live stages, if limited.
    #[serde(default)]
    pub max_stages: Option<usize>,
    /// How long `shutdown` waits for stages to exit, in milliseconds.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
    /// Whether stage lifecycle events are sent to the event sink.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

fn default_buffer_size() -> usize {
    1
}

fn default_join_timeout_ms() -> u64 {
    5_000
}

fn default_emit_events() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            max_stages: None,
            join_timeout_ms: default_join_timeout_ms(),
            emit_events: default_emit_events(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sequence buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Limits the number of live stages.
    #[must_use]
    pub fn with_max_stages(mut self, limit: usize) -> Self {
        self.max_stages = Some(limit);
        self
    }

    /// Sets the shutdown join timeout.
    #[must_use]
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enables or disables lifecycle events.
    #[must_use]
    pub fn with_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }

    /// Returns the join timeout as a `Duration`.
    #[must_use]
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// Checks the configuration for values tokio cannot honor.
    pub fn validate(&self) -> Result<()> {
        // tokio's bounded mpsc panics on a zero capacity
        if self.buffer_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "buffer_size must be at least 1".to_string(),
            ));
        }
        if self.max_stages == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "max_stages must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}
