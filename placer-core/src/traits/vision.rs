//! Part alignment and fiducial traits
//!
//! Measurement algorithms live behind these traits; the engine only
//! consumes the offsets they produce.

use crate::error::MachineResult;
use crate::model::Location;

pub use crate::model::AlignmentOffsets;

/// What an aligner is asked to measure
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRequest<'a> {
    pub part: &'a str,
    pub board: &'a str,
    pub placement: &'a str,
    pub nozzle: &'a str,
    /// Nominal global placement location
    pub placement_location: Location,
}

/// Trait for bottom vision
pub trait PartAlignment {
    /// Enabled aligner able to handle `part`, if any
    fn aligner_for(&self, part: &str) -> Option<String>;

    /// Bottom camera location
    fn alignment_location(&self) -> Option<Location>;

    fn find_alignment_offsets(
        &mut self,
        aligner: &str,
        request: &AlignmentRequest<'_>,
    ) -> MachineResult<AlignmentOffsets>;
}

/// A board or panel whose fiducials should be measured
#[derive(Debug, Clone, PartialEq)]
pub struct FiducialTarget {
    pub id: String,
    /// Nesting depth below the job root
    pub depth: u32,
    pub origin: Location,
    /// Nominal global fiducial locations
    pub fiducials: Vec<Location>,
}

/// Trait for fiducial measurement
pub trait FiducialLocator {
    /// Measure every target and return the corrected origins in order
    fn locate_all(&mut self, targets: &[FiducialTarget]) -> MachineResult<Vec<Location>>;
}
