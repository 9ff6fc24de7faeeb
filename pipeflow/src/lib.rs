//! # Pipeflow
//!
//! Cancellable streaming pipelines on tokio.
//!
//! Pipeflow builds pipelines out of small concurrent stages connected by
//! ordered sequences, with support for:
//!
//! - **Cooperative cancellation**: one broadcast token stops every stage at
//!   its next suspension point
//! - **Composable stages**: sources, transforms and `compose!` chains
//! - **Fan-in**: merging value sequences and first-responder `or` signals
//! - **Lifecycle events**: every stage reports its transitions to an event sink
//! - **Task tracking**: live stage counts, joins and bounded shutdown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipeflow::prelude::*;
//! use std::sync::Arc;
//!
//! let ctx = StageContext::new(Arc::new(CancellationToken::new()))?;
//! let doubled = map(&ctx, generate(&ctx, vec![1, 2, 3, 4])?, |v| v * 2)?;
//! let plus_one = map(&ctx, doubled, |v| v + 1)?;
//! assert_eq!(plus_one.collect_all().await, vec![3, 5, 7, 9]);
//!
//! ctx.shutdown("done").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod fan_in;
pub mod observability;
pub mod sequence;
pub mod stages;
pub mod testing;

#[cfg(test)]
mod integration_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::compose;
    pub use crate::config::PipelineConfig;
    pub use crate::errors::{Halt, ItemError, PipelineError};
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, StageEvent,
    };
    pub use crate::fan_in::{merge, or_combine, or_combine_recursive};
    pub use crate::sequence::{Sequence, Signal, Trigger};
    pub use crate::stages::{
        filter, generate, map, repeat, repeat_with, take, try_map, FilterStage, MapStage,
        Outlet, Stage, StageContext, StageState, TakeStage, TryMapStage,
    };
}
