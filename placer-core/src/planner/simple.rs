//! Tip-change minimizing planner
//!
//! Pass 1 keeps every nozzle on the tip it already holds when some pending
//! placement can use it. Pass 2 gives the remaining nozzles a free machine
//! tip that fits both nozzle and package, which costs a tip change.

use super::{CyclePlan, JobPlanner, PlanCandidate, MAX_NOZZLES};
use crate::model::PlannedPlacement;
use crate::traits::NozzleInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Strategy {
    /// Always prefer loaded tips
    Minimize,
    /// Ignore loaded tips on the first cycle after a restart
    StartAsPlanned,
}

#[derive(Debug, Clone)]
pub struct SimplePlanner {
    strategy: Strategy,
    restart: bool,
}

impl SimplePlanner {
    pub const fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            restart: false,
        }
    }
}

impl JobPlanner for SimplePlanner {
    fn restart(&mut self) {
        self.restart = true;
    }

    fn plan(
        &mut self,
        nozzles: &[NozzleInfo],
        machine_tips: &[String],
        candidates: &[PlanCandidate<'_>],
    ) -> CyclePlan {
        let mut plan = CyclePlan::new();
        let nozzles = &nozzles[..nozzles.len().min(MAX_NOZZLES)];
        let mut open: Vec<&PlanCandidate<'_>> = candidates.iter().collect();
        let mut free_tips: Vec<&str> = machine_tips.iter().map(String::as_str).collect();
        let mut assigned = [false; MAX_NOZZLES];

        let skip_loaded = self.strategy == Strategy::StartAsPlanned && self.restart;
        self.restart = false;

        if !skip_loaded {
            for (n, nozzle) in nozzles.iter().enumerate() {
                let Some(tip) = nozzle.loaded_tip.as_deref() else {
                    continue;
                };
                let Some(pos) = open.iter().position(|c| c.accepts(tip)) else {
                    continue;
                };
                let candidate = open.remove(pos);
                free_tips.retain(|t| *t != tip);
                assigned[n] = true;
                let _ = plan.push(PlannedPlacement::new(nozzle.id.as_str(), tip, candidate.id));
            }
        }

        for (n, nozzle) in nozzles.iter().enumerate() {
            if assigned[n] {
                continue;
            }
            let found = open.iter().enumerate().find_map(|(pos, candidate)| {
                free_tips
                    .iter()
                    .position(|t| candidate.accepts(t) && nozzle.accepts(t))
                    .map(|tip| (pos, tip))
            });
            let Some((pos, tip)) = found else {
                continue;
            };
            let candidate = open.remove(pos);
            let tip = free_tips.remove(tip);
            assigned[n] = true;
            let _ = plan.push(PlannedPlacement::new(nozzle.id.as_str(), tip, candidate.id));
        }

        plan.sort_unstable_by(|a, b| a.nozzle.cmp(&b.nozzle));
        plan
    }
}
