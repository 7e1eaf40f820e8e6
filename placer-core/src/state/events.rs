//! Events that trigger job state transitions

/// Events raised by the job processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A job was loaded and the run reset
    Initialized,
    /// One phase call is about to run
    Advanced,
    /// The run reached Finish without a fatal error
    Completed,
    /// A fatal error stopped the run
    Failed,
    /// The operator aborted the run
    Aborted,
}

impl Event {
    /// Check if this event ends a run
    pub fn is_terminal_event(&self) -> bool {
        matches!(self, Event::Completed | Event::Failed | Event::Aborted)
    }
}
