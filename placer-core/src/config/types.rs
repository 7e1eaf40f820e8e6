//! Processor configuration types
//!
//! These types configure how a job is executed. They are snapshotted when a
//! job is initialized.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of alignment attempts
pub const DEFAULT_MAX_ALIGNMENT_RETRIES: u32 = 3;

/// Default number of shallow fiducial passes
pub const DEFAULT_FIDUCIAL_LEVEL: u32 = 1;

/// Order in which pending placements are offered to the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JobOrder {
    /// Lowest parts first, then by part id; unknown heights last
    #[default]
    PartHeight,
    /// By part id
    Part,
}

/// Planner selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlannerStrategy {
    /// Loaded tips only, never changes tips
    Trivial,
    /// Keep loaded tips where possible, change the rest
    #[default]
    Minimize,
    /// Like Minimize, but the first cycle plans tips from scratch
    StartAsPlanned,
}

/// Job processor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProcessorConfig {
    pub job_order: JobOrder,
    /// Alignment attempts per placement
    pub max_alignment_retries: u32,
    /// Let tip loading calibrate the tip right away
    pub allow_immediate_tip_calibration: bool,
    /// Reorder each cycle to shorten head travel
    pub optimize_multiple_nozzles: bool,
    /// Passes that check only the shallowest unchecked fiducial level
    pub fiducial_level: u32,
    pub planner: PlannerStrategy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            job_order: JobOrder::PartHeight,
            max_alignment_retries: DEFAULT_MAX_ALIGNMENT_RETRIES,
            allow_immediate_tip_calibration: false,
            optimize_multiple_nozzles: true,
            fiducial_level: DEFAULT_FIDUCIAL_LEVEL,
            planner: PlannerStrategy::Minimize,
        }
    }
}

impl ProcessorConfig {
    pub fn with_planner(mut self, planner: PlannerStrategy) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_job_order(mut self, job_order: JobOrder) -> Self {
        self.job_order = job_order;
        self
    }

    pub fn with_fiducial_level(mut self, level: u32) -> Self {
        self.fiducial_level = level;
        self
    }

    pub fn with_path_optimization(mut self, enabled: bool) -> Self {
        self.optimize_multiple_nozzles = enabled;
        self
    }
}
