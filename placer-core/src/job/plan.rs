//! Cycle planning stage

use core::cmp::Ordering;

use log::debug;

use super::context::RunContext;
use crate::config::JobOrder;
use crate::cycle::Cycle;
use crate::error::JobError;
use crate::model::{JobPlacement, JobPlacementId, Status};
use crate::planner::PlanCandidate;
use crate::traits::{EventSink, JobListener, Machine};

/// Plan the next cycle
///
/// Returns `Ok(None)` when no placement is pending.
pub(crate) fn plan<M, S, L>(ctx: &mut RunContext<'_, M, S, L>) -> Result<Option<Cycle>, JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    ctx.status_text("Planning placements.");

    let mut pending: Vec<JobPlacementId> = ctx
        .placements
        .iter()
        .enumerate()
        .filter(|(_, p)| p.status() == Status::Pending)
        .map(|(i, _)| JobPlacementId(i))
        .collect();
    if pending.is_empty() {
        return Ok(None);
    }

    let placements = &*ctx.placements;
    let order = ctx.config.job_order;
    pending.sort_by(|a, b| compare(order, &placements[a.0], &placements[b.0]));

    let candidates: Vec<PlanCandidate<'_>> = pending
        .iter()
        .map(|&id| PlanCandidate {
            id,
            package_tips: &placements[id.0].package_tips,
        })
        .collect();
    let nozzles = ctx.machine.nozzles();
    let tips = ctx.machine.nozzle_tips();
    let plan = ctx.planner.plan(&nozzles, &tips, &candidates);

    if plan.is_empty() {
        return Err(JobError::planning(format!(
            "No compatible nozzle and nozzle tip found for any of {} pending placements.",
            pending.len()
        )));
    }

    for planned in &plan {
        debug!(
            "Planned {} on {} with {}",
            ctx.placements[planned.job_placement.0], planned.nozzle, planned.nozzle_tip
        );
        ctx.placements[planned.job_placement.0].set_status(Status::Processing);
    }
    Ok(Some(Cycle::new(plan)))
}

/// Pending order: part height with unknown heights last, then part id
fn compare(order: JobOrder, a: &JobPlacement, b: &JobPlacement) -> Ordering {
    match order {
        JobOrder::Part => a.part.cmp(&b.part),
        JobOrder::PartHeight => {
            let by_height = match (a.part_height, b.part_height) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_height.then_with(|| a.part.cmp(&b.part))
        }
    }
}
