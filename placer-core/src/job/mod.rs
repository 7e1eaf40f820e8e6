//! Job execution
//!
//! [`JobProcessor`] runs a job as a sequence of [`Phase`]s: preflight,
//! fiducial checks, then plan / tip change / pick / align / place cycles
//! until no placement is pending.

mod align;
mod context;
mod fiducial;
mod finish;
mod phase;
mod pick;
mod place;
mod plan;
mod preflight;
mod processor;
mod shared;
mod summary;
mod tips;
mod travel;

pub use fiducial::FiducialProgress;
pub use phase::Phase;
pub use processor::JobProcessor;
pub use shared::SharedJobProcessor;
pub use summary::{ErroredPlacement, Outcome, RunSummary};
pub use travel::Locator;
