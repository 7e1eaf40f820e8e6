//! Pick stage
//!
//! Three nested retry loops: part attempts around feed attempts and pick
//! attempts. An exhausted feeder is disabled so the next part attempt can
//! fall back to another feeder stocking the same part.

use log::{debug, warn};

use super::context::{nozzle_fault, RunContext};
use super::phase::Phase;
use crate::cycle::{Cycle, CycleOperation};
use crate::error::{Entity, JobError};
use crate::model::{Location, PlannedPlacement};
use crate::traits::{EventSink, FeedContext, FeederInfo, JobEvent, JobListener, Machine, SensingCheckpoint};

pub(crate) struct Pick;

impl<'a, M, S, L> CycleOperation<RunContext<'a, M, S, L>> for Pick
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    type Next = Phase;

    fn process(&mut self, ctx: &mut RunContext<'a, M, S, L>, planned: &mut PlannedPlacement) -> Result<(), JobError> {
        let part = ctx.placement(planned.job_placement).part.clone();
        let part_retries = ctx.job.part(&part).map_or(0, |p| p.pick_retry_count);

        let mut attempt = 0;
        loop {
            match pick_part(ctx, planned, &part) {
                Ok(()) => return Ok(()),
                Err(Failure::Raise(error)) => return Err(error),
                Err(Failure::Retry(error)) if error.escalates() || attempt >= part_retries => return Err(error),
                Err(Failure::Retry(error)) => {
                    warn!("Pick of {} failed, attempt {}: {}", part, attempt + 1, error);
                    attempt += 1;
                }
            }
        }
    }

    fn finish(&mut self, _ctx: &mut RunContext<'a, M, S, L>, cycle: Cycle) -> Result<Phase, JobError> {
        Ok(Phase::OptimizeForAlign(cycle))
    }
}

/// How a part attempt failed
enum Failure {
    /// Try the part again, possibly from another feeder
    Retry(JobError),
    /// Give up on the placement
    Raise(JobError),
}

impl From<JobError> for Failure {
    fn from(error: JobError) -> Self {
        Failure::Raise(error)
    }
}

/// One part attempt: find a feeder, feed, then pick with retries
fn pick_part<M, S, L>(ctx: &mut RunContext<'_, M, S, L>, planned: &PlannedPlacement, part: &str) -> Result<(), Failure>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    let feeder = ctx.find_feeder(part)?;

    let placement = ctx.placement_context(planned);
    ctx.fire(JobEvent::PlacementStarting {
        placement,
        feeder: feeder.id.clone(),
    })?;

    feed(ctx, &feeder, &planned.nozzle, part).map_err(Failure::Retry)?;

    check_part_off(ctx, &planned.nozzle)?;

    let destination = ctx.placement_location(planned.job_placement)?;
    let mut attempt = 0;
    loop {
        match pick_once(ctx, planned, &feeder, part, &destination) {
            Ok(()) => return Ok(()),
            Err(error) if error.escalates() => return Err(Failure::Raise(error)),
            Err(error) if attempt >= feeder.pick_retry_count => {
                ctx.discard(&planned.nozzle)?;
                return Err(Failure::Retry(error));
            }
            Err(error) => {
                debug!("Pick from {} failed: {}", feeder.id, error);
                attempt += 1;
            }
        }
    }
}

/// Feed with retries; an exhausted feeder is disabled
fn feed<M, S, L>(ctx: &mut RunContext<'_, M, S, L>, feeder: &FeederInfo, nozzle: &str, part: &str) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    let context = FeedContext {
        feeder: feeder.id.clone(),
        nozzle: nozzle.to_owned(),
        part: part.to_owned(),
    };

    let mut attempt = 0;
    loop {
        ctx.status_text(&format!("Feed {} on {}.", feeder.id, part));
        ctx.fire(JobEvent::FeederBeforeFeed(context.clone()))?;
        match ctx.machine.feed(&feeder.id, nozzle) {
            Ok(()) => return ctx.fire(JobEvent::FeederAfterFeed(context)),
            Err(fault) => {
                let error = JobError::motion(Entity::Feeder(feeder.id.clone()), fault);
                if error.escalates() {
                    return Err(error);
                }
                if attempt >= feeder.feed_retry_count {
                    warn!("Feeder {} failed {} times, disabling it", feeder.id, attempt + 1);
                    ctx.machine.set_enabled(&feeder.id, false);
                    return Err(error);
                }
                debug!("Feed from {} failed: {}", feeder.id, error);
                attempt += 1;
            }
        }
    }
}

/// The nozzle must be empty before picking
fn check_part_off<M, S, L>(ctx: &mut RunContext<'_, M, S, L>, nozzle: &str) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    if !ctx.machine.sensing_enabled(nozzle, SensingCheckpoint::BeforePick) {
        return Ok(());
    }
    // Some feeders leave the nozzle low after feeding
    ctx.machine
        .move_nozzle_to_safe_z(nozzle)
        .map_err(|fault| nozzle_fault(nozzle, fault))?;
    let off = ctx.machine.is_part_off(nozzle).map_err(|fault| nozzle_fault(nozzle, fault))?;
    if !off {
        return Err(JobError::part_sensing(
            Entity::Nozzle(nozzle.to_owned()),
            "Part vacuum-detected on nozzle before pick.",
        ));
    }
    Ok(())
}

fn pick_once<M, S, L>(
    ctx: &mut RunContext<'_, M, S, L>,
    planned: &PlannedPlacement,
    feeder: &FeederInfo,
    part: &str,
    destination: &Location,
) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    let nozzle = planned.nozzle.as_str();
    let status = format!(
        "Pick {} from {} for {} using nozzle {}.",
        part,
        feeder.id,
        ctx.placement(planned.job_placement).placement,
        nozzle
    );
    ctx.status_text(&status);

    let to_error = |fault| nozzle_fault(nozzle, fault);
    ctx.machine
        .prepare_for_articulation(nozzle, &feeder.pick_location, destination)
        .map_err(to_error)?;
    ctx.machine
        .move_to_pick_location(nozzle, &feeder.pick_location)
        .map_err(to_error)?;
    ctx.machine.pick(nozzle, part).map_err(to_error)?;
    ctx.machine.move_nozzle_to_safe_z(nozzle).map_err(to_error)?;
    ctx.machine
        .post_pick(&feeder.id, nozzle)
        .map_err(|fault| JobError::motion(Entity::Feeder(feeder.id.clone()), fault))?;

    if ctx.machine.sensing_enabled(nozzle, SensingCheckpoint::AfterPick)
        && !ctx.machine.is_part_on(nozzle).map_err(to_error)?
    {
        return Err(JobError::part_sensing(
            Entity::Nozzle(nozzle.to_owned()),
            "No part vacuum-detected after pick.",
        ));
    }
    Ok(())
}
