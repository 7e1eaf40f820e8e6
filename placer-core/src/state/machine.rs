//! Job state machine
//!
//! The externally visible state of a run is a function of the previous
//! state and a processor event.

use super::events::Event;

/// Job states reported to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum JobState {
    /// Loaded or aborted, not executing
    #[default]
    Stopped,
    /// Phases are being executed
    Running,
    /// All placements were processed
    Finished,
    /// A fatal error stopped the run
    Error,
}

impl JobState {
    /// Check if phases may be executed in this state
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Stopped | JobState::Running)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use JobState::*;

        match (self, event) {
            // A new job always starts stopped
            (_, Initialized) => Stopped,

            (Stopped, Advanced) => Running,
            (Running, Advanced) => Running,

            (Running, Completed) => Finished,

            (Stopped, Failed) => Error,
            (Running, Failed) => Error,

            // Abort stops the machine, even after an error
            (_, Aborted) => Stopped,

            // Default: stay in current state
            _ => self,
        }
    }
}
