//! End of cycle, end of run and cleanup

use log::{error, info};

use super::context::RunContext;
use super::summary::RunSummary;
use crate::error::{Entity, JobError};
use crate::traits::{EventSink, Head, JobEvent, JobListener, Machine};

/// Drop anything still held after a cycle
pub(crate) fn finish_cycle<M, S, L>(ctx: &mut RunContext<'_, M, S, L>) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    ctx.machine
        .discard_all()
        .map_err(|fault| JobError::motion(Entity::Head, fault).into_fatal())
}

/// Wrap up a completed run and report its summary
pub(crate) fn finish<M, S, L>(ctx: &mut RunContext<'_, M, S, L>) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    cleanup(&mut *ctx.machine, &mut *ctx.listener);

    let elapsed = ctx.machine.now_ms().saturating_sub(ctx.stats.started_ms);
    let summary = RunSummary::new(ctx.stats.parts_placed, elapsed, ctx.placements.as_slice());
    info!(
        "Job finished: {} parts in {:.1} sec, {:.1} CPH",
        summary.parts_placed,
        summary.elapsed_secs(),
        summary.cph
    );
    for errored in &summary.errored {
        match &errored.error {
            Some(error) => info!("Errored {}/{}: {}", errored.board, errored.placement, error),
            None => info!("Errored {}/{}", errored.board, errored.placement),
        }
    }

    ctx.fire(JobEvent::JobFinished {
        parts_placed: summary.parts_placed,
        errored: summary.errored.len(),
    })?;
    ctx.status_text(&summary.status_text());
    ctx.stats.summary = Some(summary);
    Ok(())
}

/// Best-effort return to a safe machine state
///
/// Failures are logged and never raised. Parking is skipped when the head
/// could not be cleared first.
pub(crate) fn cleanup<M: Head, L: JobListener>(machine: &mut M, listener: &mut L) {
    listener.text_status("Cleaning up.");
    let cleared = machine
        .move_to_safe_z()
        .and_then(|()| machine.discard_all())
        .and_then(|()| machine.move_to_safe_z());
    if let Err(fault) = cleared {
        error!("Cleanup failed, not parking: {}", fault);
        return;
    }

    listener.text_status("Park head.");
    if let Err(fault) = machine.park() {
        error!("Park failed: {}", fault);
    }
}
