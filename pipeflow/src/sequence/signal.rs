//! Zero-payload readiness signals used for fan-in.

use super::channel::{channel, Sequence};
use crate::cancellation::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::Instant;

/// A readiness signal that fires at most once.
///
/// A signal backed by a sequence fires when the sequence yields its first
/// value or closes, whichever comes first. The value itself is discarded.
#[derive(Debug)]
pub struct Signal {
    source: Source,
}

#[derive(Debug)]
enum Source {
    Fired,
    Never,
    Sequence(Sequence<()>),
    Token(Arc<CancellationToken>),
    Deadline(Instant),
}

/// The firing end of a [`Signal::pair`].
///
/// Dropping the trigger fires the signal too, so a task holding it fires
/// on every exit path.
#[derive(Debug)]
pub struct Trigger {
    tx: super::SequenceSender<()>,
}

impl Trigger {
    /// Fires the paired signal.
    pub fn fire(self) {
        drop(self);
    }

    /// Waits until the paired signal has been dropped by its holder.
    pub(crate) async fn abandoned(&self) {
        self.tx.closed().await;
    }
}

impl Signal {
    /// Returns a signal that has already fired.
    #[must_use]
    pub fn fired() -> Self {
        Self { source: Source::Fired }
    }

    /// Returns a signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        Self { source: Source::Never }
    }

    /// Creates a trigger and the signal it fires.
    #[must_use]
    pub fn pair() -> (Trigger, Self) {
        let (tx, seq) = channel(1);
        (Trigger { tx }, Self::from_sequence(seq))
    }

    /// Wraps a unit sequence; fires on its first value or on close.
    #[must_use]
    pub fn from_sequence(sequence: Sequence<()>) -> Self {
        Self {
            source: Source::Sequence(sequence),
        }
    }

    /// Fires when the token is cancelled.
    #[must_use]
    pub fn from_token(token: Arc<CancellationToken>) -> Self {
        Self {
            source: Source::Token(token),
        }
    }

    /// Fires once `duration` has elapsed from now.
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self {
            source: Source::Deadline(Instant::now() + duration),
        }
    }

    /// Checks without blocking whether the signal has fired.
    pub fn is_fired(&mut self) -> bool {
        let fired = match &mut self.source {
            Source::Fired => true,
            Source::Never => false,
            Source::Sequence(seq) => !matches!(seq.try_recv(), Err(TryRecvError::Empty)),
            Source::Token(token) => token.is_cancelled(),
            Source::Deadline(deadline) => Instant::now() >= *deadline,
        };
        if fired {
            self.source = Source::Fired;
        }
        fired
    }

    /// Waits until the signal fires.
    pub async fn wait(self) {
        match self.source {
            Source::Fired => {}
            Source::Never => std::future::pending::<()>().await,
            Source::Sequence(mut seq) => {
                let _ = seq.recv().await;
            }
            Source::Token(token) => token.wait().await,
            Source::Deadline(deadline) => tokio::time::sleep_until(deadline).await,
        }
    }
}

impl From<Sequence<()>> for Signal {
    fn from(sequence: Sequence<()>) -> Self {
        Self::from_sequence(sequence)
    }
}

impl From<Arc<CancellationToken>> for Signal {
    fn from(token: Arc<CancellationToken>) -> Self {
        Self::from_token(token)
    }
}
