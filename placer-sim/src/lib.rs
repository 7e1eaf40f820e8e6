//! Simulated machine for the placer job engine
//!
//! In-memory implementations of the machine traits with fault injection,
//! plus recording hooks and job builders used by the scenario tests.

pub mod fixtures;
pub mod machine;
pub mod recorder;

pub use machine::{Action, Failures, SimMachine, SimNozzle};
pub use recorder::{RecordingListener, RecordingSink};
