use std::fmt;

use serde::Serialize;

/// Authoritative lifecycle status of the local gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    /// No gateway desired or managed
    Stopped,
    /// Activation in progress
    Starting,
    /// A gateway we enabled answered its health probe
    Running { details: Option<String> },
    /// An already-running gateway was found and is used instead of spawning
    AttachedExisting { details: Option<String> },
    /// Activation failed for this cycle
    Failed { reason: String },
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Stopped => "stopped",
            Status::Starting => "starting",
            Status::Running { .. } => "running",
            Status::AttachedExisting { .. } => "attached",
            Status::Failed { .. } => "failed",
        }
    }

    /// A gateway is up and usable.
    pub fn is_active(&self) -> bool {
        matches!(self, Status::Running { .. } | Status::AttachedExisting { .. })
    }

    pub fn is_starting(&self) -> bool {
        matches!(self, Status::Starting)
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Status::Running { details } | Status::AttachedExisting { details } => {
                details.as_deref()
            }
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Status::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Running {
                details: Some(details),
            } => write!(f, "running ({details})"),
            Status::AttachedExisting {
                details: Some(details),
            } => write!(f, "attached to existing gateway ({details})"),
            Status::AttachedExisting { details: None } => {
                write!(f, "attached to existing gateway")
            }
            Status::Failed { reason } => write!(f, "failed: {reason}"),
            other => write!(f, "{}", other.label()),
        }
    }
}
