//! Per-item cycle executor
//!
//! Each cycle phase walks the planned placements one per call. Failures are
//! routed by the placement's error handling: Alert stops the run, Defer
//! marks the placement errored and moves on.

use log::debug;

use crate::error::JobError;
use crate::model::{ErrorHandling, JobPlacementId, PlannedPlacement, Status};
use crate::planner::CyclePlan;

/// Planned placements of one cycle with the per-phase done set
#[derive(Debug, Clone)]
pub struct Cycle {
    planned: CyclePlan,
    /// Bit `i` set once `planned[i]` was handled in the current phase
    done: u32,
}

impl Cycle {
    pub fn new(planned: CyclePlan) -> Self {
        Self { planned, done: 0 }
    }

    pub fn planned(&self) -> &[PlannedPlacement] {
        &self.planned
    }

    pub fn len(&self) -> usize {
        self.planned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planned.is_empty()
    }

    pub fn into_planned(self) -> CyclePlan {
        self.planned
    }

    pub fn is_done(&self, index: usize) -> bool {
        self.done & (1 << index) != 0
    }

    fn mark_done(&mut self, index: usize) {
        self.done |= 1 << index;
    }

    fn reset_done(&mut self) {
        self.done = 0;
    }
}

/// Placement state the executor reads and writes
pub trait PlacementStore {
    fn status(&self, id: JobPlacementId) -> Status;

    /// Effective error handling, Alert or Defer
    fn error_handling(&self, id: JobPlacementId) -> ErrorHandling;

    /// Capture `error` and mark the placement errored
    fn defer(&mut self, id: JobPlacementId, error: JobError);
}

/// One cycle phase applied item by item
pub trait CycleOperation<C: ?Sized> {
    /// What the phase hands over to when every item is done
    type Next;

    fn process(&mut self, ctx: &mut C, planned: &mut PlannedPlacement) -> Result<(), JobError>;

    /// Called once no item is left, with the done set already reset
    fn finish(&mut self, ctx: &mut C, cycle: Cycle) -> Result<Self::Next, JobError>;
}

/// Result of one executor step
#[derive(Debug)]
pub enum StepOutcome<N> {
    /// An item was handled; call again with the returned cycle
    Continue(Cycle),
    /// The phase is complete
    Next(N),
}

/// Run `op` on the next unhandled item of `cycle`
pub fn step<C, O>(mut cycle: Cycle, ctx: &mut C, op: &mut O) -> Result<StepOutcome<O::Next>, JobError>
where
    C: PlacementStore + ?Sized,
    O: CycleOperation<C>,
{
    let next = (0..cycle.planned.len()).find(|&i| {
        !cycle.is_done(i) && ctx.status(cycle.planned[i].job_placement) == Status::Processing
    });

    let Some(index) = next else {
        cycle.reset_done();
        return op.finish(ctx, cycle).map(StepOutcome::Next);
    };

    let id = cycle.planned[index].job_placement;
    match op.process(ctx, &mut cycle.planned[index]) {
        Ok(()) => {
            cycle.mark_done(index);
            Ok(StepOutcome::Continue(cycle))
        }
        Err(error) if error.escalates() => Err(error),
        Err(error) => match ctx.error_handling(id) {
            ErrorHandling::Defer => {
                debug!("Deferring placement {:?}: {}", id, error);
                ctx.defer(id, error);
                cycle.mark_done(index);
                Ok(StepOutcome::Continue(cycle))
            }
            _ => Err(error),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Entity, MachineFault};

    struct Store {
        statuses: Vec<Status>,
        handling: Vec<ErrorHandling>,
        deferred: Vec<(JobPlacementId, JobError)>,
    }

    impl Store {
        fn new(handling: &[ErrorHandling]) -> Self {
            Self {
                statuses: vec![Status::Processing; handling.len()],
                handling: handling.to_vec(),
                deferred: Vec::new(),
            }
        }
    }

    impl PlacementStore for Store {
        fn status(&self, id: JobPlacementId) -> Status {
            self.statuses[id.0]
        }

        fn error_handling(&self, id: JobPlacementId) -> ErrorHandling {
            self.handling[id.0]
        }

        fn defer(&mut self, id: JobPlacementId, error: JobError) {
            self.statuses[id.0] = Status::Errored;
            self.deferred.push((id, error));
        }
    }

    /// Fails the listed placements with the given error
    struct Op {
        failing: Vec<(usize, JobError)>,
        processed: Vec<usize>,
        finished: usize,
    }

    impl Op {
        fn new(failing: Vec<(usize, JobError)>) -> Self {
            Self {
                failing,
                processed: Vec::new(),
                finished: 0,
            }
        }
    }

    impl CycleOperation<Store> for Op {
        type Next = Cycle;

        fn process(&mut self, _ctx: &mut Store, planned: &mut PlannedPlacement) -> Result<(), JobError> {
            let id = planned.job_placement.0;
            self.processed.push(id);
            match self.failing.iter().find(|(i, _)| *i == id) {
                Some((_, err)) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn finish(&mut self, _ctx: &mut Store, cycle: Cycle) -> Result<Cycle, JobError> {
            self.finished += 1;
            Ok(cycle)
        }
    }

    fn cycle(n: usize) -> Cycle {
        let mut plan = CyclePlan::new();
        for i in 0..n {
            let _ = plan.push(PlannedPlacement::new(format!("N{}", i), "T1", JobPlacementId(i)));
        }
        Cycle::new(plan)
    }

    fn recoverable() -> JobError {
        JobError::motion(Entity::Head, MachineFault::new("pick failed"))
    }

    fn run(mut cycle: Cycle, store: &mut Store, op: &mut Op) -> Result<Cycle, JobError> {
        loop {
            match step(cycle, store, op)? {
                StepOutcome::Continue(c) => cycle = c,
                StepOutcome::Next(c) => return Ok(c),
            }
        }
    }

    #[test]
    fn test_processes_each_item_once_then_finishes() {
        let mut store = Store::new(&[ErrorHandling::Alert; 3]);
        let mut op = Op::new(Vec::new());
        let cycle = run(cycle(3), &mut store, &mut op).unwrap();
        assert_eq!(op.processed, vec![0, 1, 2]);
        assert_eq!(op.finished, 1);
        // Done set is reset for the next phase
        assert!((0..3).all(|i| !cycle.is_done(i)));
    }

    #[test]
    fn test_skips_non_processing_items() {
        let mut store = Store::new(&[ErrorHandling::Alert; 3]);
        store.statuses[1] = Status::Errored;
        let mut op = Op::new(Vec::new());
        run(cycle(3), &mut store, &mut op).unwrap();
        assert_eq!(op.processed, vec![0, 2]);
    }

    #[test]
    fn test_defer_captures_and_continues() {
        let mut store = Store::new(&[ErrorHandling::Alert, ErrorHandling::Defer, ErrorHandling::Alert]);
        let mut op = Op::new(vec![(1, recoverable())]);
        run(cycle(3), &mut store, &mut op).unwrap();
        assert_eq!(op.processed, vec![0, 1, 2]);
        assert_eq!(store.statuses[1], Status::Errored);
        assert_eq!(store.deferred.len(), 1);
        assert_eq!(store.deferred[0].0, JobPlacementId(1));
    }

    #[test]
    fn test_alert_escalates() {
        let mut store = Store::new(&[ErrorHandling::Alert; 2]);
        let mut op = Op::new(vec![(0, recoverable())]);
        let err = run(cycle(2), &mut store, &mut op).unwrap_err();
        assert_eq!(err, recoverable());
        assert_eq!(op.processed, vec![0]);
        assert!(store.deferred.is_empty());
    }

    #[test]
    fn test_fatal_and_interrupting_bypass_defer() {
        for err in [
            recoverable().into_fatal(),
            JobError::motion(Entity::Head, MachineFault::interrupting("stop")),
        ] {
            let mut store = Store::new(&[ErrorHandling::Defer]);
            let mut op = Op::new(vec![(0, err.clone())]);
            assert_eq!(run(cycle(1), &mut store, &mut op).unwrap_err(), err);
            assert!(store.deferred.is_empty());
            assert_eq!(op.finished, 0);
        }
    }

    #[test]
    fn test_empty_cycle_finishes_immediately() {
        let mut store = Store::new(&[]);
        let mut op = Op::new(Vec::new());
        run(cycle(0), &mut store, &mut op).unwrap();
        assert!(op.processed.is_empty());
        assert_eq!(op.finished, 1);
    }
}
