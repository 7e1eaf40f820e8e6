//! Execution phases
//!
//! Each call to [`Phase::step`] does one bounded unit of work and returns
//! the phase to run next. Cycle phases carry their [`Cycle`] along.

use super::align::Align;
use super::context::RunContext;
use super::fiducial::FiducialProgress;
use super::finish;
use super::pick::Pick;
use super::place::Place;
use super::plan;
use super::preflight;
use super::summary::Outcome;
use super::tips::{CalibrateNozzleTips, ChangeNozzleTips};
use super::travel::{optimize_cycle, Locator};
use crate::cycle::{self, Cycle, CycleOperation, PlacementStore, StepOutcome};
use crate::error::JobError;
use crate::traits::{EventSink, JobListener, Machine};

#[derive(Debug, Clone)]
pub enum Phase {
    Preflight,
    FiducialCheck(FiducialProgress),
    Plan,
    ChangeNozzleTips(Cycle),
    CalibrateNozzleTips(Cycle),
    OptimizeForPick(Cycle),
    Pick(Cycle),
    OptimizeForAlign(Cycle),
    Align(Cycle),
    OptimizeForPlace(Cycle),
    Place(Cycle),
    FinishCycle(Cycle),
    Finish,
    /// Return the machine to a safe state, then end with the outcome
    Cleanup(Outcome),
    Done(Outcome),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Preflight => "Preflight",
            Phase::FiducialCheck(_) => "FiducialCheck",
            Phase::Plan => "Plan",
            Phase::ChangeNozzleTips(_) => "ChangeNozzleTips",
            Phase::CalibrateNozzleTips(_) => "CalibrateNozzleTips",
            Phase::OptimizeForPick(_) => "OptimizeForPick",
            Phase::Pick(_) => "Pick",
            Phase::OptimizeForAlign(_) => "OptimizeForAlign",
            Phase::Align(_) => "Align",
            Phase::OptimizeForPlace(_) => "OptimizeForPlace",
            Phase::Place(_) => "Place",
            Phase::FinishCycle(_) => "FinishCycle",
            Phase::Finish => "Finish",
            Phase::Cleanup(_) => "Cleanup",
            Phase::Done(_) => "Done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done(_))
    }

    /// Cycle carried by a cycle phase
    pub fn cycle(&self) -> Option<&Cycle> {
        match self {
            Phase::ChangeNozzleTips(c)
            | Phase::CalibrateNozzleTips(c)
            | Phase::OptimizeForPick(c)
            | Phase::Pick(c)
            | Phase::OptimizeForAlign(c)
            | Phase::Align(c)
            | Phase::OptimizeForPlace(c)
            | Phase::Place(c)
            | Phase::FinishCycle(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn step<M, S, L>(self, ctx: &mut RunContext<'_, M, S, L>) -> Result<Phase, JobError>
    where
        M: Machine,
        S: EventSink,
        L: JobListener,
    {
        match self {
            Phase::Preflight => {
                preflight::run(ctx)?;
                Ok(Phase::FiducialCheck(FiducialProgress::default()))
            }
            Phase::FiducialCheck(mut progress) => {
                if progress.check(ctx)? {
                    Ok(Phase::Plan)
                } else {
                    Ok(Phase::FiducialCheck(progress))
                }
            }
            Phase::Plan => Ok(match plan::plan(ctx)? {
                Some(cycle) => Phase::ChangeNozzleTips(cycle),
                None => Phase::Finish,
            }),
            Phase::ChangeNozzleTips(cycle) => advance(cycle, ctx, &mut ChangeNozzleTips, Phase::ChangeNozzleTips),
            Phase::CalibrateNozzleTips(cycle) => {
                advance(cycle, ctx, &mut CalibrateNozzleTips, Phase::CalibrateNozzleTips)
            }
            Phase::OptimizeForPick(cycle) => Ok(Phase::Pick(optimize_cycle(
                ctx,
                cycle,
                Locator::Pick,
                Some(Locator::Align),
            ))),
            Phase::Pick(cycle) => advance(cycle, ctx, &mut Pick, Phase::Pick),
            Phase::OptimizeForAlign(cycle) => Ok(Phase::Align(optimize_cycle(
                ctx,
                cycle,
                Locator::Align,
                Some(Locator::Place),
            ))),
            Phase::Align(cycle) => advance(cycle, ctx, &mut Align, Phase::Align),
            Phase::OptimizeForPlace(cycle) => Ok(Phase::Place(optimize_cycle(ctx, cycle, Locator::Place, None))),
            Phase::Place(cycle) => advance(cycle, ctx, &mut Place, Phase::Place),
            Phase::FinishCycle(_) => {
                finish::finish_cycle(ctx)?;
                Ok(Phase::Plan)
            }
            Phase::Finish => {
                finish::finish(ctx)?;
                Ok(Phase::Done(Outcome::Finished))
            }
            Phase::Cleanup(outcome) => {
                finish::cleanup(&mut *ctx.machine, &mut *ctx.listener);
                Ok(Phase::Done(outcome))
            }
            Phase::Done(outcome) => Ok(Phase::Done(outcome)),
        }
    }
}

/// One executor step, staying in the phase built by `resume` until the
/// operation hands over
fn advance<C, O>(cycle: Cycle, ctx: &mut C, op: &mut O, resume: fn(Cycle) -> Phase) -> Result<Phase, JobError>
where
    C: PlacementStore,
    O: CycleOperation<C, Next = Phase>,
{
    Ok(match cycle::step(cycle, ctx, op)? {
        StepOutcome::Continue(cycle) => resume(cycle),
        StepOutcome::Next(phase) => phase,
    })
}
