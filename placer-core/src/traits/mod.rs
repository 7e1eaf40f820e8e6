//! Machine abstraction traits
//!
//! These traits define the interface between the job engine and the
//! machine it drives.

pub mod events;
pub mod feeder;
pub mod head;
pub mod listener;
pub mod vision;

pub use events::{AssemblyContext, EventSink, FeedContext, JobEvent, PlacementContext};
pub use feeder::{FeederInfo, Feeders};
pub use head::{Head, NozzleInfo, SensingCheckpoint};
pub use listener::JobListener;
pub use vision::{AlignmentOffsets, AlignmentRequest, FiducialLocator, FiducialTarget, PartAlignment};

/// Everything the engine needs from a machine
pub trait Machine: Head + Feeders + PartAlignment + FiducialLocator {
    /// Monotonic clock in milliseconds
    fn now_ms(&self) -> u64;
}
