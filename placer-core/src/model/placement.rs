//! Run-scoped placement records
//!
//! A [`JobPlacement`] binds one board placement to a run and tracks its
//! status. A [`PlannedPlacement`] assigns it to a nozzle for one cycle.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::board::ErrorHandling;
use super::location::Location;
use crate::error::JobError;

/// Index of a job placement within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JobPlacementId(pub usize);

/// Placement status within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Pending,
    Processing,
    Complete,
    Errored,
}

impl Status {
    /// Check if `next` is a legal forward step
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Pending, Status::Processing)
                | (Status::Processing, Status::Complete)
                | (Status::Processing, Status::Errored)
        )
    }

    pub fn is_final(self) -> bool {
        matches!(self, Status::Complete | Status::Errored)
    }
}

/// One placement taking part in a run
#[derive(Debug, Clone, PartialEq)]
pub struct JobPlacement {
    pub board: String,
    pub placement: String,
    pub part: String,
    pub part_height: Option<f64>,
    /// Compatible nozzle tips of the part's package
    pub package_tips: Vec<String>,
    /// Effective error handling, never `Default`
    pub error_handling: ErrorHandling,
    status: Status,
    error: Option<JobError>,
}

impl JobPlacement {
    pub fn new(
        board: impl Into<String>,
        placement: impl Into<String>,
        part: impl Into<String>,
        part_height: Option<f64>,
        package_tips: Vec<String>,
        error_handling: ErrorHandling,
    ) -> Self {
        Self {
            board: board.into(),
            placement: placement.into(),
            part: part.into(),
            part_height,
            package_tips,
            error_handling,
            status: Status::Pending,
            error: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&JobError> {
        self.error.as_ref()
    }

    /// Move to `next`; backwards and skipping steps are rejected
    pub fn set_status(&mut self, next: Status) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    /// Capture `error` and mark the placement errored
    pub fn set_error(&mut self, error: JobError) -> bool {
        if !self.set_status(Status::Errored) {
            return false;
        }
        self.error = Some(error);
        true
    }
}

impl fmt::Display for JobPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.board, self.placement)
    }
}

/// Measured part offsets on the nozzle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlignmentOffsets {
    pub location: Location,
    /// The part was rotated to its placement angle before measuring
    pub pre_rotated: bool,
}

impl AlignmentOffsets {
    /// Adjust a nominal placement location by these offsets
    pub fn apply(&self, placement: &Location) -> Location {
        if self.pre_rotated {
            return placement.subtract_with_rotation(&self.location);
        }
        let angle = placement.rotation - self.location.rotation;
        let correction = Location::xy(self.location.x, self.location.y).rotate_xy(angle);
        Location::new(
            placement.x - correction.x,
            placement.y - correction.y,
            placement.z,
            angle,
        )
    }
}

/// A placement assigned to a nozzle and tip for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPlacement {
    pub nozzle: String,
    pub nozzle_tip: String,
    pub job_placement: JobPlacementId,
    pub alignment: Option<AlignmentOffsets>,
}

impl PlannedPlacement {
    pub fn new(nozzle: impl Into<String>, nozzle_tip: impl Into<String>, job_placement: JobPlacementId) -> Self {
        Self {
            nozzle: nozzle.into(),
            nozzle_tip: nozzle_tip.into(),
            job_placement,
            alignment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Entity;
    use proptest::prelude::*;

    fn placement() -> JobPlacement {
        JobPlacement::new("B1", "R1", "R0603", None, vec!["N502".into()], ErrorHandling::Alert)
    }

    #[test]
    fn test_forward_transitions() {
        let mut p = placement();
        assert!(p.set_status(Status::Processing));
        assert!(p.set_status(Status::Complete));
        assert!(!p.set_status(Status::Processing));
        assert!(!p.set_status(Status::Errored));
        assert_eq!(p.status(), Status::Complete);
    }

    #[test]
    fn test_error_requires_processing() {
        let mut p = placement();
        let err = JobError::part_sensing(Entity::Head, "lost");
        assert!(!p.set_error(err.clone()));
        assert!(p.error().is_none());

        p.set_status(Status::Processing);
        assert!(p.set_error(err.clone()));
        assert_eq!(p.status(), Status::Errored);
        assert_eq!(p.error(), Some(&err));
    }

    #[test]
    fn test_alignment_offsets_pre_rotated() {
        let offsets = AlignmentOffsets {
            location: Location::new(0.5, 0.0, 0.0, 1.0),
            pre_rotated: true,
        };
        let result = offsets.apply(&Location::new(10.0, 10.0, 0.0, 0.0));
        assert!(result.approx_eq(&Location::new(9.5, 10.0, 0.0, -1.0), 1e-9));
    }

    #[test]
    fn test_alignment_offsets_rotated_about_center() {
        let offsets = AlignmentOffsets {
            location: Location::new(1.0, 0.0, 0.0, 0.0),
            pre_rotated: false,
        };
        let result = offsets.apply(&Location::new(10.0, 10.0, 2.0, 90.0));
        assert!(result.approx_eq(&Location::new(10.0, 9.0, 2.0, 90.0), 1e-9));
    }

    fn status_strategy() -> impl Strategy<Value = Status> {
        prop_oneof![
            Just(Status::Pending),
            Just(Status::Processing),
            Just(Status::Complete),
            Just(Status::Errored),
        ]
    }

    proptest! {
        #[test]
        fn test_status_never_moves_backwards(requests in proptest::collection::vec(status_strategy(), 0..16)) {
            let mut p = placement();
            let mut history = vec![p.status()];
            for next in requests {
                let before = p.status();
                let accepted = p.set_status(next);
                prop_assert_eq!(accepted, before.can_transition_to(next));
                if accepted {
                    history.push(p.status());
                }
            }
            for pair in history.windows(2) {
                prop_assert!(pair[0].can_transition_to(pair[1]));
            }
        }
    }
}
