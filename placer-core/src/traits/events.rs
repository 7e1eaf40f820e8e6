//! Job event hooks
//!
//! The engine reports progress to an [`EventSink`] at fixed points of the
//! run. A sink failure stops the run.

use crate::error::HookFault;
use crate::model::{AlignmentOffsets, Location};

/// Identifies the placement an event is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementContext {
    pub board: String,
    pub placement: String,
    pub part: String,
    pub nozzle: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedContext {
    pub feeder: String,
    pub nozzle: String,
    pub part: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyContext {
    pub placement: PlacementContext,
    /// Placement location without the part height
    pub location_base: Location,
    /// Placement location with the part height applied
    pub location: Location,
    pub alignment: Option<AlignmentOffsets>,
}

/// Events emitted during a run
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    JobStarting { placements: usize },
    PlacementStarting { placement: PlacementContext, feeder: String },
    BeforeAssembly(AssemblyContext),
    PlacementComplete(AssemblyContext),
    JobFinished { parts_placed: usize, errored: usize },
    FeederBeforeFeed(FeedContext),
    FeederAfterFeed(FeedContext),
}

impl JobEvent {
    /// Dotted hook name, as used by script-backed sinks
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::JobStarting { .. } => "Job.Starting",
            JobEvent::PlacementStarting { .. } => "Job.Placement.Starting",
            JobEvent::BeforeAssembly(_) => "Job.Placement.BeforeAssembly",
            JobEvent::PlacementComplete(_) => "Job.Placement.Complete",
            JobEvent::JobFinished { .. } => "Job.Finished",
            JobEvent::FeederBeforeFeed(_) => "Feeder.BeforeFeed",
            JobEvent::FeederAfterFeed(_) => "Feeder.AfterFeed",
        }
    }
}

/// Receiver for job events
pub trait EventSink {
    fn on_event(&mut self, event: &JobEvent) -> Result<(), HookFault>;
}

impl EventSink for () {
    fn on_event(&mut self, _event: &JobEvent) -> Result<(), HookFault> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let feed = FeedContext {
            feeder: "F1".into(),
            nozzle: "N1".into(),
            part: "R0603".into(),
        };
        assert_eq!(JobEvent::JobStarting { placements: 3 }.name(), "Job.Starting");
        assert_eq!(JobEvent::FeederBeforeFeed(feed.clone()).name(), "Feeder.BeforeFeed");
        assert_eq!(JobEvent::FeederAfterFeed(feed).name(), "Feeder.AfterFeed");
        assert_eq!(
            JobEvent::JobFinished { parts_placed: 0, errored: 0 }.name(),
            "Job.Finished"
        );
    }

    #[test]
    fn test_unit_sink_accepts_everything() {
        let mut sink = ();
        assert!(sink.on_event(&JobEvent::JobStarting { placements: 0 }).is_ok());
    }
}
