//! Job error taxonomy
//!
//! Collaborators report [`MachineFault`] and [`HookFault`]; the engine wraps
//! them into [`JobError`] with the entity that was being worked on.

use core::fmt;

/// How far an error reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    /// Only the current placement is affected
    Recoverable,
    /// The run cannot continue
    Fatal,
}

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// Job or machine setup is inconsistent
    Configuration,
    /// A motion or hardware command failed
    Motion,
    /// Vacuum sensing disagreed with the expected part state
    PartSensing,
    /// The planner could not assign any placement
    Planning,
    /// An event hook failed
    Hook,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Motion => "motion",
            ErrorKind::PartSensing => "part sensing",
            ErrorKind::Planning => "planning",
            ErrorKind::Hook => "hook",
        };
        f.write_str(name)
    }
}

/// The object an error refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Job,
    Head,
    Planner,
    Board(String),
    Placement { board: String, placement: String },
    Part(String),
    Nozzle(String),
    NozzleTip(String),
    Feeder(String),
    Fiducials(Vec<String>),
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Job => f.write_str("job"),
            Entity::Head => f.write_str("head"),
            Entity::Planner => f.write_str("planner"),
            Entity::Board(id) => write!(f, "board {}", id),
            Entity::Placement { board, placement } => {
                write!(f, "placement {}/{}", board, placement)
            }
            Entity::Part(id) => write!(f, "part {}", id),
            Entity::Nozzle(id) => write!(f, "nozzle {}", id),
            Entity::NozzleTip(id) => write!(f, "nozzle tip {}", id),
            Entity::Feeder(id) => write!(f, "feeder {}", id),
            Entity::Fiducials(ids) => write!(f, "fiducials of {}", ids.join(", ")),
        }
    }
}

/// Error raised while running a job
#[derive(Debug, Clone, PartialEq)]
pub struct JobError {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub entity: Entity,
    pub message: String,
    /// The machine was interrupted and the run must stop whatever the policy
    pub interrupting: bool,
}

impl JobError {
    pub fn new(severity: Severity, kind: ErrorKind, entity: Entity, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            entity,
            message: message.into(),
            interrupting: false,
        }
    }

    /// Setup error detected before any motion
    pub fn configuration(entity: Entity, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, ErrorKind::Configuration, entity, message)
    }

    /// Wrap a machine fault for the given entity
    pub fn motion(entity: Entity, fault: MachineFault) -> Self {
        Self {
            severity: Severity::Recoverable,
            kind: ErrorKind::Motion,
            entity,
            message: fault.message,
            interrupting: fault.interrupting,
        }
    }

    pub fn part_sensing(entity: Entity, message: impl Into<String>) -> Self {
        Self::new(Severity::Recoverable, ErrorKind::PartSensing, entity, message)
    }

    pub fn planning(message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, ErrorKind::Planning, Entity::Planner, message)
    }

    /// A hook failure always stops the run
    pub fn hook(event: &str, fault: HookFault) -> Self {
        Self::new(
            Severity::Fatal,
            ErrorKind::Hook,
            Entity::Job,
            format!("{} hook failed: {}", event, fault.message),
        )
    }

    /// Same error, raised as fatal
    pub fn into_fatal(mut self) -> Self {
        self.severity = Severity::Fatal;
        self
    }

    /// Same error, recoverable
    pub fn into_recoverable(mut self) -> Self {
        self.severity = Severity::Recoverable;
        self
    }

    /// Check if the error bypasses per-placement error handling
    pub fn escalates(&self) -> bool {
        self.severity == Severity::Fatal || self.interrupting
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error on {}: {}", self.kind, self.entity, self.message)
    }
}

impl std::error::Error for JobError {}

/// Failure reported by a machine collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineFault {
    pub message: String,
    pub interrupting: bool,
}

impl MachineFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            interrupting: false,
        }
    }

    /// Fault that interrupts the machine (e.g. an operator stop)
    pub fn interrupting(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            interrupting: true,
        }
    }
}

impl fmt::Display for MachineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Failure reported by an event hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFault {
    pub message: String,
}

impl HookFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for HookFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of a machine collaborator call
pub type MachineResult<T> = Result<T, MachineFault>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation() {
        let fault = MachineFault::new("stall");
        let recoverable = JobError::motion(Entity::Nozzle("N1".into()), fault);
        assert!(!recoverable.escalates());
        assert!(recoverable.clone().into_fatal().escalates());

        let interrupted = JobError::motion(Entity::Head, MachineFault::interrupting("stop"));
        assert_eq!(interrupted.severity, Severity::Recoverable);
        assert!(interrupted.escalates());
    }

    #[test]
    fn test_constructors_severity() {
        assert!(JobError::configuration(Entity::Job, "x").is_fatal());
        assert!(JobError::planning("x").is_fatal());
        assert!(JobError::hook("Job.Starting", HookFault::new("x")).is_fatal());
        assert!(!JobError::part_sensing(Entity::Head, "x").is_fatal());
    }

    #[test]
    fn test_display() {
        let err = JobError::part_sensing(
            Entity::Placement {
                board: "B1".into(),
                placement: "R1".into(),
            },
            "No part vacuum-detected after pick.",
        );
        assert_eq!(
            err.to_string(),
            "part sensing error on placement B1/R1: No part vacuum-detected after pick."
        );

        let hook = JobError::hook("Job.Finished", HookFault::new("script error"));
        assert_eq!(hook.message, "Job.Finished hook failed: script error");
    }
}
