//! Head-frame locations of planned placements and cycle reordering

use super::context::RunContext;
use crate::cycle::Cycle;
use crate::model::{Location, PlannedPlacement};
use crate::optimize::{centroid, PathOptimizer};
use crate::planner::CyclePlan;
use crate::traits::Machine;

/// Where a phase takes the nozzle of a planned placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Locator {
    /// Pick location of the part's feeder
    Pick,
    /// Bottom camera
    Align,
    /// Global placement location
    Place,
}

impl Locator {
    pub fn name(&self) -> &'static str {
        match self {
            Locator::Pick => "Pick",
            Locator::Align => "Align",
            Locator::Place => "Place",
        }
    }

    /// Head location for `planned`, if it can be resolved
    pub(crate) fn locate<M: Machine, S, L>(
        &self,
        ctx: &RunContext<'_, M, S, L>,
        planned: &PlannedPlacement,
    ) -> Option<Location> {
        let nozzle_location = match self {
            Locator::Pick => {
                let part = &ctx.placement(planned.job_placement).part;
                ctx.machine.find_feeder(part)?.pick_location
            }
            Locator::Align => ctx.machine.alignment_location()?,
            Locator::Place => ctx.placement_location(planned.job_placement).ok()?,
        };
        ctx.machine.to_head_location(&planned.nozzle, &nozzle_location)
    }
}

/// Reorder `cycle` for the travel of `locator`, heading towards the
/// centroid of `next` when given
pub(crate) fn optimize_cycle<M: Machine, S, L>(
    ctx: &RunContext<'_, M, S, L>,
    cycle: Cycle,
    locator: Locator,
    next: Option<Locator>,
) -> Cycle {
    let optimizer = PathOptimizer::new(ctx.config.optimize_multiple_nozzles);
    let start = ctx.machine.location();
    let planned: Vec<PlannedPlacement> = cycle.into_planned().into_iter().collect();
    let end = next.and_then(|n| centroid(&planned, |p| n.locate(ctx, p)));

    let ordered = optimizer.optimize(
        locator.name(),
        planned,
        |p| locator.locate(ctx, p),
        start.as_ref(),
        end.as_ref(),
    );
    Cycle::new(ordered.into_iter().collect::<CyclePlan>())
}
