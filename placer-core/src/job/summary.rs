//! End-of-run results

use crate::error::JobError;
use crate::model::{JobPlacement, Status};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Every placement was processed
    Finished,
    /// The operator aborted the run
    Aborted,
    /// A fatal error stopped the run
    Error,
}

/// A placement that ended errored
#[derive(Debug, Clone, PartialEq)]
pub struct ErroredPlacement {
    pub board: String,
    pub placement: String,
    pub error: Option<JobError>,
}

/// Figures reported when a run finishes
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub parts_placed: usize,
    pub elapsed_ms: u64,
    /// Parts per hour
    pub cph: f64,
    pub errored: Vec<ErroredPlacement>,
}

impl RunSummary {
    pub fn new(parts_placed: usize, elapsed_ms: u64, placements: &[JobPlacement]) -> Self {
        let hours = elapsed_ms as f64 / 3_600_000.0;
        let cph = if hours > 0.0 {
            parts_placed as f64 / hours
        } else {
            0.0
        };
        let errored = placements
            .iter()
            .filter(|p| p.status() == Status::Errored)
            .map(|p| ErroredPlacement {
                board: p.board.clone(),
                placement: p.placement.clone(),
                error: p.error().cloned(),
            })
            .collect();
        Self {
            parts_placed,
            elapsed_ms,
            cph,
            errored,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.0
    }

    /// Operator-facing summary line
    pub fn status_text(&self) -> String {
        if self.errored.is_empty() {
            format!(
                "Job finished without error, placed {} parts in {:.1} sec. ({:.1} CPH)",
                self.parts_placed,
                self.elapsed_secs(),
                self.cph
            )
        } else {
            format!(
                "Job finished with {} errors, placed {} parts in {:.1} sec. ({:.1} CPH)",
                self.errored.len(),
                self.parts_placed,
                self.elapsed_secs(),
                self.cph
            )
        }
    }
}
