//! Fan-in of value sequences.

use crate::errors::{Halt, Result};
use crate::sequence::Sequence;
use crate::stages::{Outlet, StageContext};

/// Interleaves several sequences into one.
///
/// Values from each input keep their relative order; there is no ordering
/// across inputs. Closes once every input has closed.
pub fn merge<T>(ctx: &StageContext, inputs: Vec<Sequence<T>>) -> Result<Sequence<T>>
where
    T: Send + 'static,
{
    ctx.spawn_stage("merge", move |out| run_merge(out, inputs))
}

async fn run_merge<T>(
    mut out: Outlet<T>,
    inputs: Vec<Sequence<T>>,
) -> std::result::Result<(), Halt> {
    let mut merged = futures::stream::select_all(inputs);
    while let Some(value) = out.next(&mut merged).await? {
        out.emit(value).await?;
    }
    Ok(())
}
