//! Cancellation token for cooperative cancellation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// A callback type for cancellation notifications.
pub type CancelCallback = Box<dyn Fn() + Send + Sync>;

/// A one-shot broadcast signal for cooperative cancellation.
///
/// Cancellation is idempotent - only the first cancellation reason is kept,
/// and a cancelled token never reverts. Share it with `Arc`.
#[derive(Default)]
pub struct CancellationToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Callbacks to invoke on cancellation.
    callbacks: RwLock<Vec<CancelCallback>>,
    /// Wakes tasks parked in `wait`.
    notify: Notify,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason.
    ///
    /// Only the first call has an effect. Every task blocked in [`wait`]
    /// is woken and callbacks run immediately; panics in callbacks are
    /// logged and suppressed.
    ///
    /// [`wait`]: Self::wait
    pub fn cancel(&self, reason: impl Into<String>) {
        {
            // The reason is stored before the flag flips so any observer of
            // the flag can read it.
            let mut slot = self.reason.write();
            if self.is_cancelled() {
                return;
            }
            let reason = reason.into();
            debug!(reason = %reason, "Cancellation requested");
            *slot = Some(reason);
            self.cancelled.store(true, Ordering::SeqCst);
        }
        self.notify.notify_waiters();

        let callbacks = std::mem::take(&mut *self.callbacks.write());
        for callback in &callbacks {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback();
            })) {
                warn!("Cancellation callback panicked: {:?}", e);
            }
        }
    }

    /// Registers a callback to be invoked on cancellation.
    ///
    /// If already cancelled, the callback is invoked immediately.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        {
            let mut callbacks = self.callbacks.write();
            if !self.is_cancelled() {
                callbacks.push(Box::new(callback));
                return;
            }
        }

        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            callback();
        })) {
            warn!("Cancellation callback panicked: {:?}", e);
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Waits until the token is cancelled.
    ///
    /// Returns immediately if cancellation already happened.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel
            // between the check and the await is not lost.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
