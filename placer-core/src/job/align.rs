//! Bottom vision alignment stage

use log::debug;

use super::context::{nozzle_fault, RunContext};
use super::phase::Phase;
use crate::cycle::{Cycle, CycleOperation};
use crate::error::{Entity, JobError};
use crate::model::PlannedPlacement;
use crate::traits::{AlignmentRequest, EventSink, JobListener, Machine, SensingCheckpoint};

pub(crate) struct Align;

impl<'a, M, S, L> CycleOperation<RunContext<'a, M, S, L>> for Align
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    type Next = Phase;

    fn process(&mut self, ctx: &mut RunContext<'a, M, S, L>, planned: &mut PlannedPlacement) -> Result<(), JobError> {
        let id = planned.job_placement;
        let (board, placement, part) = {
            let p = ctx.placement(id);
            (p.board.clone(), p.placement.clone(), p.part.clone())
        };

        let Some(aligner) = ctx.machine.aligner_for(&part) else {
            debug!("Not aligning {}, no enabled aligner", part);
            planned.alignment = None;
            return Ok(());
        };

        let request = AlignmentRequest {
            part: &part,
            board: &board,
            placement: &placement,
            nozzle: &planned.nozzle,
            placement_location: ctx.placement_location(id)?,
        };

        let attempts = ctx.config.max_alignment_retries.max(1);
        let mut attempt = 0;
        let offsets = loop {
            ctx.status_text(&format!(
                "Aligning {} for {} using nozzle {}.",
                part, placement, planned.nozzle
            ));
            match ctx.machine.find_alignment_offsets(&aligner, &request) {
                Ok(offsets) => break offsets,
                Err(fault) => {
                    attempt += 1;
                    let error = JobError::motion(Entity::Part(part.clone()), fault);
                    if error.escalates() || attempt >= attempts {
                        return Err(error);
                    }
                    debug!("Alignment of {} failed, attempt {}: {}", part, attempt, error);
                }
            }
        };
        debug!("Align {} with {}, offsets {:?}", part, planned.nozzle, offsets);
        planned.alignment = Some(offsets);

        let nozzle = planned.nozzle.as_str();
        if ctx.machine.sensing_enabled(nozzle, SensingCheckpoint::Align)
            && !ctx.machine.is_part_on(nozzle).map_err(|fault| nozzle_fault(nozzle, fault))?
        {
            return Err(JobError::part_sensing(
                Entity::Nozzle(nozzle.to_owned()),
                "No part vacuum-detected after alignment. Part may have been lost in transit.",
            ));
        }
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut RunContext<'a, M, S, L>, cycle: Cycle) -> Result<Phase, JobError> {
        Ok(Phase::OptimizeForPlace(cycle))
    }
}
