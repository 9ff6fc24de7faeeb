//! Transform stages: one upstream sequence in, one sequence out.

use super::{Outlet, StageContext};
use crate::errors::{Halt, Result};
use crate::sequence::Sequence;
use tracing::debug;

/// Applies `f` to every value, preserving order.
pub fn map<T, U, F>(ctx: &StageContext, input: Sequence<T>, f: F) -> Result<Sequence<U>>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    ctx.spawn_stage("map", move |out| run_map(out, input, f))
}

/// Applies a fallible `f` to every value.
///
/// Failures are forwarded downstream as `Err` items; the stage keeps going
/// until upstream closes or the token fires.
pub fn try_map<T, U, E, F>(
    ctx: &StageContext,
    input: Sequence<T>,
    f: F,
) -> Result<Sequence<std::result::Result<U, E>>>
where
    T: Send + 'static,
    U: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: FnMut(T) -> std::result::Result<U, E> + Send + 'static,
{
    ctx.spawn_stage("try_map", move |out| run_try_map(out, input, f))
}

/// Forwards only the values for which `predicate` holds.
pub fn filter<T, F>(ctx: &StageContext, input: Sequence<T>, predicate: F) -> Result<Sequence<T>>
where
    T: Send + 'static,
    F: FnMut(&T) -> bool + Send + 'static,
{
    ctx.spawn_stage("filter", move |out| run_filter(out, input, predicate))
}

/// Forwards the first `count` values, then closes and releases `input`.
pub fn take<T>(ctx: &StageContext, input: Sequence<T>, count: usize) -> Result<Sequence<T>>
where
    T: Send + 'static,
{
    ctx.spawn_stage("take", move |out| run_take(out, input, count))
}

async fn run_map<T, U, F>(
    mut out: Outlet<U>,
    mut input: Sequence<T>,
    mut f: F,
) -> std::result::Result<(), Halt>
where
    F: FnMut(T) -> U,
{
    while let Some(value) = out.next(&mut input).await? {
        out.emit(f(value)).await?;
    }
    Ok(())
}

async fn run_try_map<T, U, E, F>(
    mut out: Outlet<std::result::Result<U, E>>,
    mut input: Sequence<T>,
    mut f: F,
) -> std::result::Result<(), Halt>
where
    E: std::fmt::Display,
    F: FnMut(T) -> std::result::Result<U, E>,
{
    let mut index = 0_usize;
    while let Some(value) = out.next(&mut input).await? {
        let result = f(value);
        if let Err(e) = &result {
            debug!(index, error = %e, "Item failed, forwarding error");
        }
        out.emit(result).await?;
        index += 1;
    }
    Ok(())
}

async fn run_filter<T, F>(
    mut out: Outlet<T>,
    mut input: Sequence<T>,
    mut predicate: F,
) -> std::result::Result<(), Halt>
where
    F: FnMut(&T) -> bool,
{
    while let Some(value) = out.next(&mut input).await? {
        if predicate(&value) {
            out.emit(value).await?;
        }
    }
    Ok(())
}

async fn run_take<T>(
    mut out: Outlet<T>,
    mut input: Sequence<T>,
    count: usize,
) -> std::result::Result<(), Halt> {
    for _ in 0..count {
        match out.next(&mut input).await? {
            Some(value) => out.emit(value).await?,
            None => break,
        }
    }
    Ok(())
}
