//! Sequences and signals: the hand-off primitives between stages.
//!
//! A [`Sequence`] is an ordered stream with exactly one producer and one
//! consumer. A [`Signal`] is a zero-payload sequence that fires once.

mod channel;
mod signal;

pub use channel::{channel, Sequence, SequenceSender};
pub use signal::{Signal, Trigger};
