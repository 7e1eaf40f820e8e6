//! Nozzle tip changes and calibration

use log::debug;

use super::context::RunContext;
use super::phase::Phase;
use crate::cycle::{Cycle, CycleOperation};
use crate::error::{Entity, JobError};
use crate::model::PlannedPlacement;
use crate::traits::{EventSink, JobListener, Machine};

/// Load the planned tip on each nozzle
pub(crate) struct ChangeNozzleTips;

impl<'a, M, S, L> CycleOperation<RunContext<'a, M, S, L>> for ChangeNozzleTips
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    type Next = Phase;

    fn process(&mut self, ctx: &mut RunContext<'a, M, S, L>, planned: &mut PlannedPlacement) -> Result<(), JobError> {
        let loaded = ctx.nozzle(&planned.nozzle).and_then(|n| n.loaded_tip);
        if loaded.as_deref() == Some(planned.nozzle_tip.as_str()) {
            debug!("Nozzle {} already has tip {}", planned.nozzle, planned.nozzle_tip);
            return Ok(());
        }

        ctx.status_text(&format!(
            "Change nozzle tip on nozzle {} to {}.",
            planned.nozzle, planned.nozzle_tip
        ));
        let allow_calibration = ctx.config.allow_immediate_tip_calibration;
        ctx.machine
            .load_nozzle_tip(&planned.nozzle, &planned.nozzle_tip, allow_calibration)
            .map_err(|fault| JobError::motion(Entity::NozzleTip(planned.nozzle_tip.clone()), fault))
    }

    fn finish(&mut self, _ctx: &mut RunContext<'a, M, S, L>, cycle: Cycle) -> Result<Phase, JobError> {
        Ok(Phase::CalibrateNozzleTips(cycle))
    }
}

/// Calibrate loaded tips that are not calibrated yet
pub(crate) struct CalibrateNozzleTips;

impl<'a, M, S, L> CycleOperation<RunContext<'a, M, S, L>> for CalibrateNozzleTips
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    type Next = Phase;

    fn process(&mut self, ctx: &mut RunContext<'a, M, S, L>, planned: &mut PlannedPlacement) -> Result<(), JobError> {
        let Some(nozzle) = ctx.nozzle(&planned.nozzle) else {
            return Ok(());
        };
        let Some(tip) = nozzle.loaded_tip else {
            return Ok(());
        };
        if nozzle.calibrated {
            return Ok(());
        }

        ctx.status_text(&format!("Calibrate nozzle tip {}.", tip));
        ctx.machine
            .calibrate_nozzle_tip(&planned.nozzle)
            .map_err(|fault| JobError::motion(Entity::NozzleTip(tip), fault))
    }

    fn finish(&mut self, _ctx: &mut RunContext<'a, M, S, L>, cycle: Cycle) -> Result<Phase, JobError> {
        Ok(Phase::OptimizeForPick(cycle))
    }
}
