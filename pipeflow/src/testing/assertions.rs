//! Test assertions for sequences and signals.

use crate::sequence::{Sequence, Signal};
use std::fmt::Debug;
use std::time::Duration;

/// Asserts that `seq` yields exactly `expected`, in order, and then closes.
pub async fn assert_drains_to<T>(seq: Sequence<T>, expected: Vec<T>)
where
    T: Debug + PartialEq,
{
    let stage = seq.stage_name().map(str::to_owned);
    let actual = seq.collect_all().await;
    assert_eq!(
        actual, expected,
        "Sequence from stage {stage:?} drained to unexpected values"
    );
}

/// Asserts that `signal` fires before `limit` elapses.
pub async fn assert_fires_within(signal: Signal, limit: Duration) {
    assert!(
        tokio::time::timeout(limit, signal.wait()).await.is_ok(),
        "Expected signal to fire within {limit:?}"
    );
}

/// Asserts that `signal` has not fired after `window` elapses.
///
/// Returns the signal so the caller can keep waiting on it.
pub async fn assert_stays_pending(mut signal: Signal, window: Duration) -> Signal {
    tokio::time::sleep(window).await;
    assert!(!signal.is_fired(), "Expected signal to stay pending for {window:?}");
    signal
}
