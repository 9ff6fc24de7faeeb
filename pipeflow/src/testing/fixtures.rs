//! Test fixtures for pipeline runs.

use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::events::CollectingEventSink;
use crate::stages::StageContext;
use std::sync::Arc;
use std::time::Duration;

/// A run wired to a collecting event sink.
///
/// Call [`TestRun::finish`] at the end of a test to shut the run down and
/// check that no stage task outlived it.
#[derive(Debug)]
pub struct TestRun {
    /// The context stages are spawned on.
    pub ctx: StageContext,
    /// Every event the run emitted.
    pub events: Arc<CollectingEventSink>,
}

impl TestRun {
    /// Creates a run with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(PipelineConfig::default())
    }

    /// Creates a run with `config`.
    pub fn with_config(config: PipelineConfig) -> Result<Self> {
        let events = Arc::new(CollectingEventSink::new());
        let ctx = StageContext::with_config(Arc::new(CancellationToken::new()), config)?
            .with_event_sink(events.clone());
        Ok(Self { ctx, events })
    }

    /// Cancels the run and asserts every stage task exits within `limit`.
    pub async fn finish(self, limit: Duration) {
        self.ctx.cancel("test finished");
        let Ok(failures) = tokio::time::timeout(limit, self.ctx.join()).await else {
            panic!("Stage tasks still running after {limit:?}");
        };
        assert!(failures.is_empty(), "Stage tasks failed: {failures:?}");
        assert_eq!(self.ctx.active_stages(), 0, "Stage tasks leaked");
    }
}
