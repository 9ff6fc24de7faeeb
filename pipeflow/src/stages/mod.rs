//! Pipeline stages.
//!
//! A stage is a spawned task that reads zero or more upstream sequences and
//! produces exactly one output sequence. Every read and every write is a
//! suspension point raced against the run's cancellation token, so no stage
//! outlives cancellation.
//!
//! Stages come in two forms: free functions such as [`generate`] and [`map`]
//! that spawn immediately, and [`Stage`] values that are chained with
//! [`Stage::then`] or [`compose!`](crate::compose) and attached later.
//!
//! Every sequence must either be drained or have its run cancelled. A
//! consumer that simply drops a sequence also releases its producer, which
//! observes the disconnect on its next send.

mod compose;
mod context;
mod sources;
mod state;
mod transforms;

pub use compose::{Chain, FilterStage, MapStage, Stage, TakeStage, TryMapStage};
pub use context::{Outlet, StageContext};
pub use sources::{generate, repeat, repeat_with};
pub use state::{StageMonitor, StageState};
pub use transforms::{filter, map, take, try_map};
