//! Fan-in: many inputs, one output.
//!
//! [`merge`] interleaves value sequences. [`or_combine`] reduces done
//! signals to one that fires with the first of them, which is how a caller
//! waits on "whichever of these finishes first" without polling.

mod merge;
mod or;

pub use merge::merge;
pub use or::{or_combine, or_combine_recursive};
