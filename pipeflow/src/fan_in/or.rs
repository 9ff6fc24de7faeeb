//! First-responder combination of done signals.

use crate::cancellation::CancellationToken;
use crate::errors::Result;
use crate::sequence::Signal;
use crate::stages::StageContext;
use futures::future::select_all;
use std::sync::Arc;
use tracing::debug;

/// Combines `signals` into one signal that fires as soon as any of them does.
///
/// - no signals: the result has already fired;
/// - one signal: it is returned unchanged;
/// - otherwise a single task waits on all of them at once.
///
/// After firing, every constituent is dropped, so producers behind
/// sequence-backed signals see a disconnect. With no constituent ever
/// firing the result never fires; merge a [`Signal::after`] to bound the
/// wait.
///
/// Cancelling the run also releases the combinator, and the result fires
/// even though no constituent did. The result alone does not say which
/// happened; check [`StageContext::token`] after it fires when the
/// difference matters.
pub fn or_combine(ctx: &StageContext, mut signals: Vec<Signal>) -> Result<Signal> {
    if signals.len() < 2 {
        return Ok(signals.pop().unwrap_or_else(Signal::fired));
    }

    let (trigger, merged) = Signal::pair();
    let token = ctx.token().clone();
    let count = signals.len();
    let waits: Vec<_> = signals.into_iter().map(|s| Box::pin(s.wait())).collect();

    ctx.spawn_task("or", async move {
        tokio::select! {
            ((), index, _) = select_all(waits) => debug!(index, count, "Signal fired"),
            () = trigger.abandoned() => debug!("Combined signal dropped before firing"),
            () = token.wait() => debug!("Run cancelled, releasing combinator"),
        }
        trigger.fire();
    })?;

    Ok(merged)
}

/// Recursive form of [`or_combine`].
///
/// Each level races its first three signals against a combinator over the
/// remainder. The remainder also includes a signal tied to this level, so
/// when this level fires first the deeper levels are released instead of
/// waiting forever. Deep chains cost one task per level; prefer
/// [`or_combine`] unless the level structure itself is wanted.
///
/// Run cancellation fires the result the same way as for [`or_combine`].
pub fn or_combine_recursive(ctx: &StageContext, mut signals: Vec<Signal>) -> Result<Signal> {
    if signals.len() < 2 {
        return Ok(signals.pop().unwrap_or_else(Signal::fired));
    }

    let (trigger, merged) = Signal::pair();
    let level_done = Arc::new(CancellationToken::new());

    let remainder = if signals.len() > 2 {
        let mut rest = signals.split_off(3);
        rest.push(Signal::from_token(level_done.clone()));
        or_combine_recursive(ctx, rest)?
    } else {
        Signal::never()
    };

    let token = ctx.token().clone();
    let heads: Vec<_> = signals.into_iter().map(|s| Box::pin(s.wait())).collect();

    ctx.spawn_task("or", async move {
        tokio::select! {
            ((), index, _) = select_all(heads) => debug!(index, "Signal fired"),
            () = remainder.wait() => debug!("Remainder fired"),
            () = trigger.abandoned() => debug!("Combined signal dropped before firing"),
            () = token.wait() => debug!("Run cancelled, releasing combinator"),
        }
        level_done.cancel("or level fired");
        trigger.fire();
    })?;

    Ok(merged)
}
