//! Cycle planning
//!
//! A planner assigns pending placements to nozzles and nozzle tips for one
//! pick-and-place cycle.

pub mod simple;
pub mod trivial;

use heapless::Vec as HVec;

use crate::config::PlannerStrategy;
use crate::model::{JobPlacementId, PlannedPlacement};
use crate::traits::NozzleInfo;

pub use simple::{SimplePlanner, Strategy};
pub use trivial::TrivialPlanner;

/// Maximum nozzles planned per cycle
pub const MAX_NOZZLES: usize = 16;

/// Assignments for one cycle
pub type CyclePlan = HVec<PlannedPlacement, MAX_NOZZLES>;

/// A pending placement offered to the planner
#[derive(Debug, Clone, Copy)]
pub struct PlanCandidate<'a> {
    pub id: JobPlacementId,
    /// Compatible nozzle tips of the placement's package
    pub package_tips: &'a [String],
}

impl PlanCandidate<'_> {
    pub fn accepts(&self, tip: &str) -> bool {
        self.package_tips.iter().any(|t| t == tip)
    }
}

/// Trait for cycle planners
///
/// A plan never uses a nozzle, tip or candidate twice. Candidates that
/// cannot be assigned are left for later cycles.
pub trait JobPlanner {
    /// Called when a new run starts
    fn restart(&mut self) {}

    fn plan(
        &mut self,
        nozzles: &[NozzleInfo],
        machine_tips: &[String],
        candidates: &[PlanCandidate<'_>],
    ) -> CyclePlan;
}

/// Build the planner selected by the configuration
pub fn planner_for(strategy: PlannerStrategy) -> Box<dyn JobPlanner + Send> {
    match strategy {
        PlannerStrategy::Trivial => Box::new(TrivialPlanner),
        PlannerStrategy::Minimize => Box::new(SimplePlanner::new(Strategy::Minimize)),
        PlannerStrategy::StartAsPlanned => Box::new(SimplePlanner::new(Strategy::StartAsPlanned)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn nozzle(id: &str, loaded: Option<&str>, compatible: &[&str]) -> NozzleInfo {
        NozzleInfo {
            id: id.into(),
            loaded_tip: loaded.map(Into::into),
            compatible_tips: compatible.iter().map(|t| t.to_string()).collect(),
            calibrated: false,
        }
    }

    pub fn tips(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|t| t.to_string()).collect()
    }

    pub fn candidates(tips: &[Vec<String>]) -> Vec<PlanCandidate<'_>> {
        tips.iter()
            .enumerate()
            .map(|(i, t)| PlanCandidate {
                id: JobPlacementId(i),
                package_tips: t,
            })
            .collect()
    }
}
