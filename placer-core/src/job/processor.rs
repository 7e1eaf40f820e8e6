//! Job processor
//!
//! Owns the machine, the job and the run state, and drives the phases one
//! call at a time.

use log::{debug, error};

use super::context::{RunContext, RunStats};
use super::finish::cleanup;
use super::phase::Phase;
use super::summary::{Outcome, RunSummary};
use crate::config::ProcessorConfig;
use crate::error::JobError;
use crate::model::{Job, JobPlacement};
use crate::planner::{planner_for, JobPlanner};
use crate::state::{Event, JobState};
use crate::traits::{EventSink, JobListener, Machine};

/// Cooperative pick-and-place job runner
///
/// Call [`initialize`](Self::initialize) with a job, then
/// [`advance`](Self::advance) until it returns `Ok(false)`. Every call does
/// one bounded unit of work.
pub struct JobProcessor<M, S = (), L = ()> {
    machine: M,
    sink: S,
    listener: L,
    config: ProcessorConfig,
    /// Snapshot taken at initialize
    run_config: ProcessorConfig,
    job: Option<Job>,
    placements: Vec<JobPlacement>,
    planner: Box<dyn JobPlanner + Send>,
    phase: Option<Phase>,
    state: JobState,
    stats: RunStats,
}

impl<M, S, L> JobProcessor<M, S, L>
where
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    pub fn new(machine: M, sink: S, listener: L, config: ProcessorConfig) -> Self {
        Self {
            machine,
            sink,
            listener,
            planner: planner_for(config.planner),
            run_config: config.clone(),
            config,
            job: None,
            placements: Vec::new(),
            phase: None,
            state: JobState::Stopped,
            stats: RunStats::default(),
        }
    }

    /// Configuration used by the next run
    pub fn set_config(&mut self, config: ProcessorConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Reset all run state and prepare to run `job`
    pub fn initialize(&mut self, job: Job) {
        self.run_config = self.config.clone();
        self.planner = planner_for(self.run_config.planner);
        self.job = Some(job);
        self.placements.clear();
        self.stats = RunStats::default();
        self.phase = Some(Phase::Preflight);
        self.apply(Event::Initialized);
    }

    /// Run one phase call
    ///
    /// Returns `Ok(true)` while work remains. A run-stopping error is
    /// returned once; the following call cleans up and ends the run.
    pub fn advance(&mut self) -> Result<bool, JobError> {
        let Some(phase) = self.phase.take() else {
            return Ok(false);
        };
        if phase.is_terminal() {
            self.phase = Some(phase);
            return Ok(false);
        }

        self.apply(Event::Advanced);
        let Some(job) = self.job.as_mut() else {
            self.phase = Some(phase);
            return Ok(false);
        };
        let mut ctx = RunContext {
            machine: &mut self.machine,
            sink: &mut self.sink,
            listener: &mut self.listener,
            job,
            config: &self.run_config,
            placements: &mut self.placements,
            planner: &mut *self.planner,
            stats: &mut self.stats,
        };

        let name = phase.name();
        match phase.step(&mut ctx) {
            Ok(next) => {
                debug!("{} -> {}", name, next.name());
                let finished = matches!(next, Phase::Done(Outcome::Finished));
                let terminal = next.is_terminal();
                self.phase = Some(next);
                if finished {
                    self.apply(Event::Completed);
                }
                Ok(!terminal)
            }
            Err(err) => {
                error!("{} failed: {}", name, err);
                self.phase = Some(Phase::Cleanup(Outcome::Error));
                self.apply(Event::Failed);
                Err(err)
            }
        }
    }

    /// Stop the run from wherever it is
    ///
    /// Cleans up right away and ends the run as aborted, or as errored when
    /// a run-stopping error was already raised.
    pub fn abort(&mut self) {
        let outcome = match &self.phase {
            None | Some(Phase::Done(_)) => return,
            Some(Phase::Cleanup(Outcome::Error)) => Outcome::Error,
            Some(_) => Outcome::Aborted,
        };
        cleanup(&mut self.machine, &mut self.listener);
        self.listener.text_status("Aborted.");
        self.phase = Some(Phase::Done(outcome));
        self.apply(Event::Aborted);
    }

    /// How the run ended, once it has
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Some(Phase::Done(outcome)) => Some(outcome),
            _ => None,
        }
    }

    pub fn job_state(&self) -> JobState {
        self.state
    }

    pub fn phase(&self) -> Option<&Phase> {
        self.phase.as_ref()
    }

    pub fn phase_name(&self) -> Option<&'static str> {
        self.phase.as_ref().map(Phase::name)
    }

    pub fn job_placements(&self) -> &[JobPlacement] {
        &self.placements
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    /// Summary of the last finished run
    pub fn summary(&self) -> Option<&RunSummary> {
        self.stats.summary.as_ref()
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Update the lifecycle state and notify the listener
    ///
    /// Listeners hear every change, plus every initialize and abort.
    fn apply(&mut self, event: Event) {
        let next = self.state.transition(event);
        let always = matches!(event, Event::Initialized | Event::Aborted);
        if next != self.state || always {
            self.state = next;
            self.listener.job_state_changed(next);
        }
    }
}
