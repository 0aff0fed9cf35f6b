use crate::coordinator::{ATTACH_ONLY_REASON, ActivationSnapshot, START_TIMEOUT_REASON};
use crate::environment::EnvironmentKind;
use crate::status::Status;

use serde::Serialize;

/// UI-facing summary of an [`ActivationSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub state: String,
    pub details: Option<String>,
    pub error: Option<String>,
    pub recovery_hint: Option<String>,
    pub is_healthy: bool,
    pub desired_active: bool,
    pub environment: String,
    pub attached: bool,
}

impl StatusReport {
    pub fn from_snapshot(snapshot: &ActivationSnapshot) -> Self {
        let status = &snapshot.status;

        let (error, recovery_hint) = match status {
            Status::Failed { reason } => (Some(reason.clone()), Some(recovery_hint(snapshot, reason))),
            _ => (None, None),
        };

        Self {
            state: status.label().to_string(),
            details: status.details().map(str::to_string),
            error,
            recovery_hint,
            is_healthy: status.is_active(),
            desired_active: snapshot.desired_active,
            environment: snapshot.environment_status.message.clone(),
            attached: matches!(status, Status::AttachedExisting { .. }),
        }
    }
}

impl From<&ActivationSnapshot> for StatusReport {
    fn from(snapshot: &ActivationSnapshot) -> Self {
        Self::from_snapshot(snapshot)
    }
}

fn recovery_hint(snapshot: &ActivationSnapshot, reason: &str) -> String {
    if reason == ATTACH_ONLY_REASON {
        return "Start the gateway yourself or turn off attach-only mode.".into();
    }
    if reason == START_TIMEOUT_REASON {
        return "The gateway service was enabled but never answered. \
                Check the gateway log for startup errors."
            .into();
    }
    match snapshot.environment_status.kind {
        EnvironmentKind::Missing | EnvironmentKind::Error => {
            "Install the gateway command or set gateway.command to its full path.".into()
        }
        _ => "Please check the logs or restart the application.".into(),
    }
}
