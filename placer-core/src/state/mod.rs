//! Job lifecycle state
//!
//! The coarse state reported to listeners. The fine-grained execution
//! phase lives in the job module.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::JobState;
