//! Board-agnostic job engine for pick-and-place machines
//!
//! This crate contains all job execution logic that does not depend on
//! specific machine implementations:
//!
//! - Collaborator traits (head, feeders, vision, event hooks)
//! - Job data model and the placed ledger
//! - Step state machine for job execution
//! - Nozzle and nozzle tip planning per cycle
//! - Per-item cycle executor with error policies
//! - Travel path optimization
//! - Lifecycle state and configuration types

#![deny(unsafe_code)]

pub mod config;
pub mod cycle;
pub mod error;
pub mod job;
pub mod model;
pub mod optimize;
pub mod planner;
pub mod state;
pub mod traits;

pub use error::{Entity, ErrorKind, HookFault, JobError, MachineFault, Severity};
pub use job::{JobProcessor, Outcome, RunSummary, SharedJobProcessor};
