//! Borrowed view of a run handed to each phase call

use log::debug;

use crate::config::ProcessorConfig;
use crate::cycle::PlacementStore;
use crate::error::{Entity, JobError, MachineFault};
use crate::model::{ErrorHandling, Job, JobPlacement, JobPlacementId, Location, PlannedPlacement, Status};
use crate::planner::JobPlanner;
use crate::traits::{EventSink, FeederInfo, JobEvent, JobListener, Machine, NozzleInfo, PlacementContext};

use super::summary::RunSummary;

/// Counters of the current run
#[derive(Debug, Clone, Default)]
pub(crate) struct RunStats {
    pub started_ms: u64,
    pub parts_placed: usize,
    pub summary: Option<RunSummary>,
}

impl RunStats {
    pub fn started(now_ms: u64) -> Self {
        Self {
            started_ms: now_ms,
            ..Self::default()
        }
    }
}

pub(crate) struct RunContext<'a, M, S, L> {
    pub machine: &'a mut M,
    pub sink: &'a mut S,
    pub listener: &'a mut L,
    pub job: &'a mut Job,
    pub config: &'a ProcessorConfig,
    pub placements: &'a mut Vec<JobPlacement>,
    pub planner: &'a mut (dyn JobPlanner + Send),
    pub stats: &'a mut RunStats,
}

impl<M, S, L> RunContext<'_, M, S, L> {
    pub fn placement(&self, id: JobPlacementId) -> &JobPlacement {
        &self.placements[id.0]
    }

    pub fn placement_mut(&mut self, id: JobPlacementId) -> &mut JobPlacement {
        &mut self.placements[id.0]
    }

    pub fn placement_entity(&self, id: JobPlacementId) -> Entity {
        let placement = self.placement(id);
        Entity::Placement {
            board: placement.board.clone(),
            placement: placement.placement.clone(),
        }
    }

    /// Nominal global location of a placement
    pub fn placement_location(&self, id: JobPlacementId) -> Result<Location, JobError> {
        let placement = self.placement(id);
        self.job
            .placement_location(&placement.board, &placement.placement)
            .ok_or_else(|| {
                JobError::configuration(self.placement_entity(id), "Placement location not found.")
                    .into_recoverable()
            })
    }

    pub fn placement_context(&self, planned: &PlannedPlacement) -> PlacementContext {
        let placement = self.placement(planned.job_placement);
        PlacementContext {
            board: placement.board.clone(),
            placement: placement.placement.clone(),
            part: placement.part.clone(),
            nozzle: planned.nozzle.clone(),
        }
    }
}

impl<M: Machine, S: EventSink, L: JobListener> RunContext<'_, M, S, L> {
    pub fn status_text(&mut self, text: &str) {
        self.listener.text_status(text);
    }

    /// Deliver an event; a hook failure is fatal
    pub fn fire(&mut self, event: JobEvent) -> Result<(), JobError> {
        self.sink
            .on_event(&event)
            .map_err(|fault| JobError::hook(event.name(), fault))
    }

    pub fn nozzle(&self, id: &str) -> Option<NozzleInfo> {
        self.machine.nozzles().into_iter().find(|n| n.id == id)
    }

    /// Enabled feeder for `part`; a missing feeder only fails this placement
    pub fn find_feeder(&self, part: &str) -> Result<FeederInfo, JobError> {
        self.machine.find_feeder(part).ok_or_else(|| {
            JobError::configuration(
                Entity::Part(part.to_owned()),
                format!("No compatible, enabled feeder found for part {}.", part),
            )
            .into_recoverable()
        })
    }

    pub fn discard(&mut self, nozzle: &str) -> Result<(), JobError> {
        self.machine
            .discard(nozzle)
            .map_err(|fault| nozzle_fault(nozzle, fault))
    }
}

/// Wrap a fault raised while driving `nozzle`
pub(crate) fn nozzle_fault(nozzle: &str, fault: MachineFault) -> JobError {
    JobError::motion(Entity::Nozzle(nozzle.to_owned()), fault)
}

impl<M, S, L> PlacementStore for RunContext<'_, M, S, L> {
    fn status(&self, id: JobPlacementId) -> Status {
        self.placement(id).status()
    }

    fn error_handling(&self, id: JobPlacementId) -> ErrorHandling {
        self.placement(id).error_handling
    }

    fn defer(&mut self, id: JobPlacementId, error: JobError) {
        let placement = self.placement_mut(id);
        debug!("Placement {} errored: {}", placement, error);
        placement.set_error(error);
    }
}
