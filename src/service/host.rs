//! Boundary between the lifecycle engine and the OS service manager
//!
//! The engine implements [`ServiceCallbacks`]; a [`Dispatcher`] hands it to the
//! OS, and the [`ServiceHost`] it receives registers the control handler and
//! returns a [`StatusReporter`] for publishing status.

use crate::error::HostError;
use crate::service::state::StatusReport;
use std::sync::Arc;

/// Control request delivered by the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Stop,
    Interrogate,
    /// Any other control code
    Other,
}

/// Answer returned to the service manager for a control request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResponse {
    Handled,
    NotImplemented,
}

/// Capabilities the OS adapter calls into
pub trait ServiceCallbacks: Send + Sync {
    /// Service main: runs the whole lifecycle and returns once it is over
    fn on_start(self: Arc<Self>, host: &dyn ServiceHost);

    /// Control handler
    fn on_control(&self, request: ControlRequest) -> ControlResponse;
}

/// Publishes status to the service manager
pub trait StatusReporter: Send + Sync {
    fn publish(&self, status: &StatusReport) -> Result<(), HostError>;
}

/// Service-main side of the OS adapter
pub trait ServiceHost {
    /// Register `callbacks` as the control handler for service `name`
    fn register(
        &self,
        name: &str,
        callbacks: Arc<dyn ServiceCallbacks>,
    ) -> Result<Arc<dyn StatusReporter>, HostError>;
}

/// Process side of the OS adapter
pub trait Dispatcher {
    /// Attach to the service control dispatcher and run `callbacks` as service `name`
    ///
    /// Blocks until the service has stopped.
    fn dispatch(&self, name: &str, callbacks: Arc<dyn ServiceCallbacks>) -> Result<(), HostError>;
}

/// Dispatcher for platforms without a service manager
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDispatcher;

impl Dispatcher for UnsupportedDispatcher {
    fn dispatch(&self, _name: &str, _callbacks: Arc<dyn ServiceCallbacks>) -> Result<(), HostError> {
        Err(HostError::Unsupported)
    }
}

/// Dispatcher for the current platform
#[cfg(windows)]
pub fn platform_dispatcher() -> crate::service::windows::WindowsDispatcher {
    crate::service::windows::WindowsDispatcher
}

/// Dispatcher for the current platform
#[cfg(not(windows))]
pub fn platform_dispatcher() -> UnsupportedDispatcher {
    UnsupportedDispatcher
}
