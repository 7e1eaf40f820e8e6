//! Place stage

use super::context::{nozzle_fault, RunContext};
use super::phase::Phase;
use crate::cycle::{Cycle, CycleOperation};
use crate::error::{Entity, JobError};
use crate::model::{PlannedPlacement, Status};
use crate::traits::{AssemblyContext, EventSink, JobEvent, JobListener, Machine, SensingCheckpoint};

pub(crate) struct Place;

impl<'a, M, S, L> CycleOperation<RunContext<'a, M, S, L>> for Place
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    type Next = Phase;

    fn process(&mut self, ctx: &mut RunContext<'a, M, S, L>, planned: &mut PlannedPlacement) -> Result<(), JobError> {
        let id = planned.job_placement;
        let nozzle = planned.nozzle.as_str();
        let (part, height) = {
            let p = ctx.placement(id);
            (p.part.clone(), p.part_height.unwrap_or(0.0))
        };

        let nominal = ctx.placement_location(id)?;
        let location_base = match &planned.alignment {
            Some(offsets) => offsets.apply(&nominal),
            None => nominal,
        };
        let assembly = AssemblyContext {
            placement: ctx.placement_context(planned),
            location_base,
            location: location_base.with_z(location_base.z + height),
            alignment: planned.alignment,
        };
        ctx.fire(JobEvent::BeforeAssembly(assembly.clone()))?;

        check_part_on(ctx, nozzle, &part)?;

        let status = format!(
            "Placing {} for {} using nozzle {}.",
            part,
            ctx.placement(id).placement,
            nozzle
        );
        ctx.status_text(&status);
        let to_error = |fault| nozzle_fault(nozzle, fault);
        ctx.machine
            .move_to_placement_location(nozzle, &location_base, &part)
            .map_err(to_error)?;
        ctx.machine.place(nozzle).map_err(to_error)?;
        ctx.machine.move_nozzle_to_safe_z(nozzle).map_err(to_error)?;

        if ctx.machine.sensing_enabled(nozzle, SensingCheckpoint::AfterPlace)
            && !ctx.machine.is_part_off(nozzle).map_err(to_error)?
        {
            return Err(JobError::part_sensing(
                Entity::Nozzle(nozzle.to_owned()),
                "Part vacuum-detected on nozzle after place.",
            ));
        }

        let placement = ctx.placement_mut(id);
        placement.set_status(Status::Complete);
        let (board, placement) = (placement.board.clone(), placement.placement.clone());
        ctx.job.placed.set_placed(&board, &placement, true);
        ctx.stats.parts_placed += 1;

        ctx.fire(JobEvent::PlacementComplete(assembly))
    }

    fn finish(&mut self, _ctx: &mut RunContext<'a, M, S, L>, cycle: Cycle) -> Result<Phase, JobError> {
        Ok(Phase::FinishCycle(cycle))
    }
}

/// The nozzle must hold the expected part before placing
fn check_part_on<M, S, L>(ctx: &mut RunContext<'_, M, S, L>, nozzle: &str, part: &str) -> Result<(), JobError>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    let entity = || Entity::Nozzle(nozzle.to_owned());
    match ctx.machine.part_on_nozzle(nozzle) {
        None => return Err(JobError::part_sensing(entity(), "No part on nozzle before place.")),
        Some(held) if held != part => {
            return Err(JobError::part_sensing(
                entity(),
                "Part mismatch with part on nozzle before place.",
            ))
        }
        Some(_) => {}
    }

    if ctx.machine.sensing_enabled(nozzle, SensingCheckpoint::BeforePlace)
        && !ctx.machine.is_part_on(nozzle).map_err(|fault| nozzle_fault(nozzle, fault))?
    {
        return Err(JobError::part_sensing(
            entity(),
            "No part vacuum-detected on nozzle before place.",
        ));
    }
    Ok(())
}
