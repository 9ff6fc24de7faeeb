//! Single-producer, single-consumer sequences.

use crate::cancellation::CancellationToken;
use crate::errors::Halt;
use crate::stages::{StageMonitor, StageState};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Creates a connected sender/sequence pair with the given capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn channel<T>(capacity: usize) -> (SequenceSender<T>, Sequence<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (SequenceSender { tx }, Sequence { rx, monitor: None })
}

/// The producing end of a [`Sequence`].
///
/// Owned by exactly one stage task. Dropping it closes the sequence.
#[derive(Debug)]
pub struct SequenceSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> SequenceSender<T> {
    /// Emits a value, racing the write against cancellation.
    ///
    /// If the consumer is ready and the token fires at the same time, either
    /// outcome may be chosen.
    pub async fn send(&self, token: &CancellationToken, value: T) -> Result<(), Halt> {
        tokio::select! {
            () = token.wait() => Err(Halt::Cancelled),
            sent = self.tx.send(value) => sent.map_err(|_| Halt::Disconnected),
        }
    }

    /// Returns true if the consumer dropped or closed its end.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Waits until the consumer drops or closes its end.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

/// An ordered, closable, single-consumer stream of values.
///
/// Once [`recv`](Self::recv) has returned `None` it never yields again.
#[derive(Debug)]
pub struct Sequence<T> {
    rx: mpsc::Receiver<T>,
    monitor: Option<StageMonitor>,
}

impl<T> Sequence<T> {
    pub(crate) fn with_monitor(mut self, monitor: StageMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Receives the next value, or `None` once the producer has closed.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub(crate) fn try_recv(&mut self) -> Result<T, TryRecvError> {
        self.rx.try_recv()
    }

    /// Receives the next value, racing the read against cancellation.
    ///
    /// `Ok(None)` means upstream closed normally.
    pub async fn recv_until(&mut self, token: &CancellationToken) -> Result<Option<T>, Halt> {
        tokio::select! {
            () = token.wait() => Err(Halt::Cancelled),
            value = self.rx.recv() => Ok(value),
        }
    }

    /// Closes the sequence from the consumer side.
    ///
    /// Values already buffered can still be received. The producer sees
    /// `Halt::Disconnected` on its next send.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Returns the name of the stage producing this sequence, if any.
    #[must_use]
    pub fn stage_name(&self) -> Option<&str> {
        self.monitor.as_ref().map(StageMonitor::name)
    }

    /// Returns the state of the producing stage, if the sequence came from one.
    #[must_use]
    pub fn stage_state(&self) -> Option<StageState> {
        self.monitor.as_ref().map(StageMonitor::state)
    }

    /// Drains the sequence to completion.
    pub async fn collect_all(mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(value) = self.rx.recv().await {
            values.push(value);
        }
        values
    }
}

impl<T, E> Sequence<Result<T, E>> {
    /// Drains a sequence of fallible items, splitting successes from failures.
    pub async fn partition_results(mut self) -> (Vec<T>, Vec<E>) {
        let mut oks = Vec::new();
        let mut errs = Vec::new();
        while let Some(item) = self.rx.recv().await {
            match item {
                Ok(value) => oks.push(value),
                Err(e) => errs.push(e),
            }
        }
        (oks, errs)
    }
}

impl<T> Stream for Sequence<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}
