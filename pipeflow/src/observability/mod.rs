//! Tracing setup and stage spans.

use tracing::Span;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Installs a global fmt subscriber filtered by `filter`, or by `RUST_LOG`
/// when `filter` is `None`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing(filter: Option<&str>) -> bool {
    let filter = filter
        .map(EnvFilter::new)
        .unwrap_or_else(|| {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Creates the span a stage task runs inside.
#[must_use]
pub fn stage_span(stage: &str, run_id: Uuid) -> Span {
    tracing::debug_span!("stage", stage = %stage, run_id = %run_id)
}
