//! Source stages: produce a sequence without an upstream.

use super::{Outlet, StageContext};
use crate::errors::{Halt, Result};
use crate::sequence::Sequence;

/// Emits each item in order, then closes.
///
/// Stops early, without emitting the rest, if the token is cancelled or the
/// consumer drops the sequence.
pub fn generate<I>(ctx: &StageContext, items: I) -> Result<Sequence<I::Item>>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    let items = items.into_iter();
    ctx.spawn_stage("generate", move |out| emit_all(out, items))
}

/// Cycles through `values` forever, until cancelled or disconnected.
///
/// An empty `values` closes immediately.
pub fn repeat<T>(ctx: &StageContext, values: Vec<T>) -> Result<Sequence<T>>
where
    T: Clone + Send + Sync + 'static,
{
    ctx.spawn_stage("repeat", move |out| emit_cycle(out, values))
}

/// Calls `produce` for every value, forever, until cancelled or
/// disconnected.
pub fn repeat_with<T, F>(ctx: &StageContext, produce: F) -> Result<Sequence<T>>
where
    T: Send + 'static,
    F: FnMut() -> T + Send + 'static,
{
    ctx.spawn_stage("repeat_with", move |out| emit_forever(out, produce))
}

async fn emit_all<I>(mut out: Outlet<I::Item>, items: I) -> std::result::Result<(), Halt>
where
    I: Iterator,
{
    for item in items {
        out.emit(item).await?;
    }
    Ok(())
}

async fn emit_cycle<T: Clone>(mut out: Outlet<T>, values: Vec<T>) -> std::result::Result<(), Halt> {
    if values.is_empty() {
        return Ok(());
    }
    loop {
        for value in &values {
            out.emit(value.clone()).await?;
        }
    }
}

async fn emit_forever<T, F>(mut out: Outlet<T>, mut produce: F) -> std::result::Result<(), Halt>
where
    F: FnMut() -> T,
{
    loop {
        out.emit(produce()).await?;
    }
}
