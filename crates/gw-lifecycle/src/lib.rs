//! Lifecycle coordination for the local gateway.
//!
//! The [`LifecycleCoordinator`] decides whether a gateway should be running,
//! prefers attaching to an instance that is already reachable, and otherwise
//! enables the persistent-service descriptor and waits for the gateway to
//! answer its health endpoint.

mod coordinator;
mod environment;
mod error;
mod health;
mod log_buffer;
mod log_tail;
mod process;
mod status;
mod status_report;
pub mod supervisor;

pub use coordinator::{
    ATTACH_ONLY_REASON, ActivationSnapshot, CoordinatorDeps, LifecycleCoordinator,
    START_TIMEOUT_FAILURE, START_TIMEOUT_REASON,
};
pub use environment::{
    CommandEnvironmentChecker, EnvironmentChecker, EnvironmentKind, EnvironmentStatus,
};
pub use error::{LifecycleError, Result as LifecycleResult};
pub use health::{HealthProbe, HealthRequest, HealthSnapshot, HttpHealthProbe, WebHealth};
pub use log_buffer::LogBuffer;
pub use log_tail::{LogSource, LogTailer};
pub use process::{LsofProcessResolver, ProcessInfo, ProcessResolver};
pub use status::Status;
pub use status_report::StatusReport;
pub use supervisor::{ServiceSupervisor, SupervisorRequest, platform_supervisor};

#[cfg(test)]
mod tests;
