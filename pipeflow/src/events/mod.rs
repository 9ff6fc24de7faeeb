//! Stage lifecycle events.
//!
//! Every stage reports its transitions (`stage.started`, `stage.draining`,
//! `stage.cancelled`, `stage.closed`) to the [`EventSink`] held by its
//! [`StageContext`](crate::stages::StageContext).

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::stages::StageState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event kind emitted when a stage task starts.
pub const STAGE_STARTED: &str = "stage.started";
/// Event kind emitted when a stage's upstream closes.
pub const STAGE_DRAINING: &str = "stage.draining";
/// Event kind emitted when a stage observes cancellation.
pub const STAGE_CANCELLED: &str = "stage.cancelled";
/// Event kind emitted when a stage task exits.
pub const STAGE_CLOSED: &str = "stage.closed";

/// A stage lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEvent {
    /// Event kind, one of the `STAGE_*` constants.
    pub kind: String,
    /// Name of the stage.
    pub stage: String,
    /// Run the stage belongs to.
    pub run_id: Uuid,
    /// Stage state after the transition.
    pub state: StageState,
    /// Values emitted so far.
    pub emitted: u64,
    /// Cancellation reason, for `stage.cancelled`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StageEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        stage: impl Into<String>,
        run_id: Uuid,
        state: StageState,
    ) -> Self {
        Self {
            kind: kind.into(),
            stage: stage.into(),
            run_id,
            state,
            emitted: 0,
            reason: None,
        }
    }

    /// Sets the emitted count.
    #[must_use]
    pub fn with_emitted(mut self, emitted: u64) -> Self {
        self.emitted = emitted;
        self
    }

    /// Sets the cancellation reason.
    #[must_use]
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Converts the event to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
