//! Stage context and the output handle given to every stage body.

use super::state::{StageMonitor, StageState};
use crate::cancellation::{CancellationToken, StageSlot, StageTracker};
use crate::config::PipelineConfig;
use crate::errors::{Halt, PipelineError, Result};
use crate::events::{
    EventSink, NoOpEventSink, StageEvent, STAGE_CANCELLED, STAGE_CLOSED, STAGE_DRAINING,
    STAGE_STARTED,
};
use crate::observability::stage_span;
use crate::sequence::{channel, Sequence, SequenceSender};
use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

/// Everything a stage needs to run: the shared cancellation token,
/// configuration, event sink and the tracker of live stage tasks.
///
/// Cloning is cheap; every clone refers to the same run.
#[derive(Clone)]
pub struct StageContext {
    token: Arc<CancellationToken>,
    config: Arc<PipelineConfig>,
    tracker: Arc<StageTracker>,
    sink: Arc<dyn EventSink>,
    runtime: Handle,
    run_id: Uuid,
}

impl StageContext {
    /// Creates a context with the default configuration.
    ///
    /// Fails if called outside a tokio runtime.
    pub fn new(token: Arc<CancellationToken>) -> Result<Self> {
        Self::with_config(token, PipelineConfig::default())
    }

    /// Creates a context with the given configuration.
    pub fn with_config(token: Arc<CancellationToken>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| PipelineError::NoRuntime(e.to_string()))?;

        Ok(Self {
            token,
            config: Arc::new(config),
            tracker: Arc::new(StageTracker::new()),
            sink: Arc::new(NoOpEventSink),
            runtime,
            run_id: Uuid::new_v4(),
        })
    }

    /// Sets the event sink for lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the id of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the number of stage tasks still alive.
    #[must_use]
    pub fn active_stages(&self) -> usize {
        self.tracker.active()
    }

    /// Cancels every stage spawned from this context.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.token.cancel(reason);
    }

    /// Waits for every stage task to exit, returning any panics.
    pub async fn join(&self) -> Vec<(String, String)> {
        self.tracker.join_all().await
    }

    /// Cancels the run and waits for all stages to exit.
    ///
    /// Stages still alive after the configured join timeout are aborted,
    /// awaited, and reported as a join error. Either way no stage task is
    /// left running when this returns.
    pub async fn shutdown(&self, reason: impl Into<String>) -> Result<()> {
        self.cancel(reason);
        let timeout = self.config.join_timeout();
        let Ok(failures) = tokio::time::timeout(timeout, self.tracker.join_all()).await else {
            let stuck = self.tracker.abort_all();
            warn!(
                stuck,
                timeout_ms = self.config.join_timeout_ms,
                "Aborting stages that ignored cancellation"
            );
            self.tracker.join_all().await;
            return Err(PipelineError::Join(format!(
                "{stuck} stages still running after {}ms, aborted",
                self.config.join_timeout_ms
            )));
        };

        if failures.is_empty() {
            return Ok(());
        }
        Err(PipelineError::Join(
            failures
                .into_iter()
                .map(|(stage, msg)| format!("{stage}: {msg}"))
                .collect::<Vec<_>>()
                .join("; "),
        ))
    }

    /// Reserves a live-stage slot, enforcing the stage limit.
    fn reserve(&self) -> Result<StageSlot> {
        self.tracker
            .try_reserve(self.config.max_stages)
            .map_err(|active| PipelineError::StageLimitExceeded {
                active,
                limit: self.config.max_stages.unwrap_or(active),
            })
    }

    /// Runs `task` in a reserved slot, inside the stage span.
    fn launch<F>(&self, slot: StageSlot, name: &str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(
            &self.runtime,
            slot,
            name,
            task.instrument(stage_span(name, self.run_id)),
        );
    }

    /// Spawns a tracked task, enforcing the stage limit.
    pub(crate) fn spawn_task<F>(&self, name: &str, task: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = self.reserve()?;
        self.launch(slot, name, task);
        Ok(())
    }

    /// Spawns a stage task producing one output sequence.
    ///
    /// The body receives the [`Outlet`] for its output and runs until it
    /// returns; `Err(Halt)` is the normal way to unwind on cancellation or
    /// when the consumer goes away. A stage rejected by the stage limit
    /// never runs `body` and reports no events.
    pub fn spawn_stage<T, F, Fut>(&self, name: &str, body: F) -> Result<Sequence<T>>
    where
        T: Send + 'static,
        F: FnOnce(Outlet<T>) -> Fut,
        Fut: Future<Output = std::result::Result<(), Halt>> + Send + 'static,
    {
        let slot = self.reserve()?;

        let (tx, seq) = channel(self.config.buffer_size);
        let monitor = StageMonitor::new(name);
        let sink = self.config.emit_events.then(|| self.sink.clone());
        let outlet = Outlet {
            tx,
            token: self.token.clone(),
            monitor: monitor.clone(),
            sink: sink.clone(),
            run_id: self.run_id,
            emitted: 0,
        };

        let stage = name.to_string();
        let run_id = self.run_id;
        let work = body(outlet);
        self.launch(slot, name, async move {
            debug!("Stage started");
            if let Some(sink) = &sink {
                sink.emit(StageEvent::new(STAGE_STARTED, &stage, run_id, StageState::Running))
                    .await;
            }

            match work.await {
                Ok(()) => debug!("Stage finished"),
                Err(Halt::Cancelled) => debug!("Stage stopped by cancellation"),
                Err(Halt::Disconnected) => debug!("Stage stopped, consumer went away"),
            }
        });

        Ok(seq.with_monitor(monitor))
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("run_id", &self.run_id)
            .field("cancelled", &self.token.is_cancelled())
            .field("active_stages", &self.active_stages())
            .finish()
    }
}

/// The output side of a running stage.
///
/// Every read and write goes through the outlet so that each suspension
/// point races against cancellation and the stage state stays accurate.
/// Dropping the outlet marks the stage closed and then closes the output
/// sequence, so a consumer that sees the end always sees `Closed`.
pub struct Outlet<T> {
    tx: SequenceSender<T>,
    token: Arc<CancellationToken>,
    monitor: StageMonitor,
    sink: Option<Arc<dyn EventSink>>,
    run_id: Uuid,
    emitted: u64,
}

impl<T> Outlet<T> {
    /// Sends a value downstream, or halts on cancellation or disconnect.
    pub async fn emit(&mut self, value: T) -> std::result::Result<(), Halt> {
        match self.tx.send(&self.token, value).await {
            Ok(()) => {
                self.emitted += 1;
                Ok(())
            }
            Err(halt) => Err(self.halted(halt)),
        }
    }

    /// Reads the next upstream value, racing the read against cancellation.
    ///
    /// `Ok(None)` means upstream closed; the stage moves to `Draining`.
    pub async fn next<S>(&mut self, input: &mut S) -> std::result::Result<Option<S::Item>, Halt>
    where
        S: Stream + Unpin,
    {
        let token = self.token.clone();
        let value = tokio::select! {
            () = token.wait() => return Err(self.halted(Halt::Cancelled)),
            value = input.next() => value,
        };

        if value.is_none() && self.monitor.transition(StageState::Draining) {
            debug!("Upstream closed, draining");
            self.report(STAGE_DRAINING, None);
        }
        Ok(value)
    }

    /// Returns the cancellation token this stage observes.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Returns the number of values emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Returns the current stage state.
    #[must_use]
    pub fn state(&self) -> StageState {
        self.monitor.state()
    }

    fn halted(&self, halt: Halt) -> Halt {
        if halt == Halt::Cancelled && self.monitor.transition(StageState::Cancelled) {
            self.report(STAGE_CANCELLED, self.token.reason());
        }
        halt
    }

    fn report(&self, kind: &str, reason: Option<String>) {
        if let Some(sink) = &self.sink {
            sink.try_emit(
                StageEvent::new(kind, self.monitor.name(), self.run_id, self.monitor.state())
                    .with_emitted(self.emitted)
                    .with_reason(reason),
            );
        }
    }
}

impl<T> Drop for Outlet<T> {
    fn drop(&mut self) {
        self.monitor.transition(StageState::Closed);
        debug!(stage = %self.monitor.name(), emitted = self.emitted, "Stage closed");
        self.report(STAGE_CLOSED, None);
    }
}

impl<T> std::fmt::Debug for Outlet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outlet")
            .field("stage", &self.monitor.name())
            .field("state", &self.monitor.state())
            .field("emitted", &self.emitted)
            .finish()
    }
}
