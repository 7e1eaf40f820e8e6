//! Cycle execution
//!
//! Shared iteration, retry routing and error policy for the per-item
//! phases of a pick-and-place cycle.

pub mod executor;

pub use executor::{step, Cycle, CycleOperation, PlacementStore, StepOutcome};
