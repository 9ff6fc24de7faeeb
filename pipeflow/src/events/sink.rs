//! Event sink trait and implementations.

use super::StageEvent;
use async_trait::async_trait;
use tracing::{debug, info, Level};

/// Trait for sinks that receive stage lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: StageEvent);

    /// Emits an event without blocking.
    ///
    /// Must never panic; failures are logged and suppressed.
    fn try_emit(&self, event: StageEvent);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: StageEvent) {}

    fn try_emit(&self, _event: StageEvent) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level to use.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::DEBUG }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &StageEvent) {
        if self.level == Level::INFO {
            info!(
                event_type = %event.kind,
                stage = %event.stage,
                run_id = %event.run_id,
                emitted = event.emitted,
                "Event: {}", event.kind
            );
        } else {
            debug!(
                event_type = %event.kind,
                stage = %event.stage,
                run_id = %event.run_id,
                emitted = event.emitted,
                "Event: {}", event.kind
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: StageEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: StageEvent) {
        self.log_event(&event);
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<StageEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns the event kinds recorded for one stage, in order.
    #[must_use]
    pub fn kinds_for(&self, stage: &str) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter(|e| e.stage == stage)
            .map(|e| e.kind.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: StageEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: StageEvent) {
        self.events.write().push(event);
    }
}
