//! Run preparation
//!
//! Validates the job against the machine before anything moves, then
//! brings head and feeders into a known state.

use std::collections::BTreeSet;

use log::debug;

use super::context::{RunContext, RunStats};
use crate::error::{Entity, JobError};
use crate::model::{JobPlacement, PlacementType, Status};
use crate::optimize::PathOptimizer;
use crate::planner::MAX_NOZZLES;
use crate::traits::{EventSink, FeederInfo, JobEvent, JobListener, Machine};

pub(crate) fn run<M, S, L>(ctx: &mut RunContext<'_, M, S, L>) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    *ctx.stats = RunStats::started(ctx.machine.now_ms());
    ctx.placements.clear();

    check_setup(ctx)?;
    prepare_machine(ctx)?;
    prepare_feeders(ctx)?;

    let placements = ctx.placements.len();
    ctx.fire(JobEvent::JobStarting { placements })?;
    ctx.planner.restart();
    Ok(())
}

/// Build the run's placements, rejecting anything the machine cannot do
fn check_setup<M, S, L>(ctx: &mut RunContext<'_, M, S, L>) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    ctx.status_text("Checking job for setup errors.");

    let nozzles = ctx.machine.nozzles();
    if nozzles.len() > MAX_NOZZLES {
        return Err(JobError::configuration(
            Entity::Head,
            format!(
                "Head has {} nozzles, at most {} are supported.",
                nozzles.len(),
                MAX_NOZZLES
            ),
        ));
    }
    let tips = ctx.machine.nozzle_tips();
    let feeders = ctx.machine.feeders();
    let job = &*ctx.job;

    for board in job.enabled_board_locations() {
        if let Some(duplicate) = board.board.duplicate_placement_id() {
            return Err(JobError::configuration(
                Entity::Board(board.id.clone()),
                format!(
                    "Board {} has more than one placement with id {}.",
                    board.id, duplicate
                ),
            ));
        }

        for placement in &board.board.placements {
            if placement.kind != PlacementType::Placement || !placement.enabled {
                continue;
            }
            if job.is_placed(&board.id, &placement.id) {
                continue;
            }
            if placement.side != board.side {
                continue;
            }

            let part = placement
                .part
                .as_deref()
                .and_then(|id| job.part(id))
                .ok_or_else(|| {
                    JobError::configuration(
                        Entity::Placement {
                            board: board.id.clone(),
                            placement: placement.id.clone(),
                        },
                        format!(
                            "Part not found for board {}, placement {}.",
                            board.id, placement.id
                        ),
                    )
                })?;

            let package = part
                .package
                .as_deref()
                .and_then(|id| job.package(id))
                .ok_or_else(|| {
                    JobError::configuration(
                        Entity::Part(part.id.clone()),
                        format!("No package set for part {}.", part.id),
                    )
                })?;

            let tip_available = nozzles.iter().any(|n| {
                n.compatible_tips
                    .iter()
                    .any(|t| package.accepts(t) && tips.contains(t))
            });
            if !tip_available {
                let message = match part.height {
                    Some(_) => format!("No compatible nozzle tip on any nozzle found for part {}.", part.id),
                    None => format!(
                        "No compatible nozzle tip on any nozzle found for part {}; its part height is unknown.",
                        part.id
                    ),
                };
                return Err(JobError::configuration(Entity::Part(part.id.clone()), message));
            }

            if !feeders.iter().any(|f| f.supplies(&part.id)) {
                return Err(JobError::configuration(
                    Entity::Part(part.id.clone()),
                    format!("No compatible, enabled feeder found for part {}.", part.id),
                ));
            }

            ctx.placements.push(JobPlacement::new(
                board.id.clone(),
                placement.id.clone(),
                part.id.clone(),
                part.height,
                package.compatible_tips.clone(),
                job.effective_error_handling(placement),
            ));
        }
    }
    debug!("Job has {} placements to process", ctx.placements.len());
    Ok(())
}

fn prepare_machine<M, S, L>(ctx: &mut RunContext<'_, M, S, L>) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    ctx.status_text("Preparing machine.");
    let head_fault = |fault| JobError::motion(Entity::Head, fault).into_fatal();
    ctx.machine.move_to_safe_z().map_err(head_fault)?;
    ctx.machine.discard_all().map_err(head_fault)?;
    Ok(())
}

/// Prepare every feeder a pending placement needs
///
/// Feeders with a preparation location are visited first, in travel
/// order from the current head location.
fn prepare_feeders<M, S, L>(ctx: &mut RunContext<'_, M, S, L>) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    ctx.status_text("Preparing feeders.");

    let needed: Vec<FeederInfo> = {
        let parts: BTreeSet<&str> = ctx
            .placements
            .iter()
            .filter(|p| p.status() == Status::Pending)
            .map(|p| p.part.as_str())
            .collect();
        ctx.machine
            .feeders()
            .into_iter()
            .filter(|f| f.enabled && f.part.as_deref().is_some_and(|p| parts.contains(p)))
            .collect()
    };

    let visits: Vec<&FeederInfo> = needed
        .iter()
        .filter(|f| f.preparation_location.is_some())
        .collect();
    let start = ctx.machine.location();
    let visits = PathOptimizer::new(true).optimize(
        "Feeder preparation",
        visits,
        |f| f.preparation_location,
        start.as_ref(),
        None,
    );

    let feeder_fault =
        |feeder: &FeederInfo, fault| JobError::motion(Entity::Feeder(feeder.id.clone()), fault).into_fatal();
    for feeder in visits {
        ctx.machine
            .prepare_for_job(&feeder.id, true)
            .map_err(|fault| feeder_fault(feeder, fault))?;
    }
    for feeder in &needed {
        ctx.machine
            .prepare_for_job(&feeder.id, false)
            .map_err(|fault| feeder_fault(feeder, fault))?;
    }
    Ok(())
}
