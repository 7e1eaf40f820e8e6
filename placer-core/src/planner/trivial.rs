//! Loaded-tip planner
//!
//! Uses whatever tip each nozzle holds and never asks for a tip change.

use super::{CyclePlan, JobPlanner, PlanCandidate, MAX_NOZZLES};
use crate::model::PlannedPlacement;
use crate::traits::NozzleInfo;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrivialPlanner;

impl JobPlanner for TrivialPlanner {
    fn plan(
        &mut self,
        nozzles: &[NozzleInfo],
        _machine_tips: &[String],
        candidates: &[PlanCandidate<'_>],
    ) -> CyclePlan {
        let mut plan = CyclePlan::new();
        let mut open: Vec<&PlanCandidate<'_>> = candidates.iter().collect();

        for nozzle in nozzles.iter().take(MAX_NOZZLES) {
            if open.is_empty() {
                break;
            }
            let Some(tip) = nozzle.loaded_tip.as_deref() else {
                continue;
            };
            if let Some(pos) = open.iter().position(|c| c.accepts(tip)) {
                let candidate = open.remove(pos);
                let _ = plan.push(PlannedPlacement::new(nozzle.id.as_str(), tip, candidate.id));
            }
        }
        plan
    }
}
