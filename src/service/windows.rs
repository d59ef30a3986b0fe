//! Windows Service Control Manager adapter

use crate::error::HostError;
use crate::service::host::{
    ControlRequest, ControlResponse, Dispatcher, ServiceCallbacks, ServiceHost, StatusReporter,
};
use crate::service::state::{ServiceExit, ServicePhase, StatusReport};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::sync::Arc;
use tracing::{debug, error};
use windows_service::{
    define_windows_service,
    service::{
        ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState, ServiceStatus,
        ServiceType,
    },
    service_control_handler::{self, ServiceControlHandlerResult, ServiceStatusHandle},
    service_dispatcher,
};

const SERVICE_TYPE: ServiceType = ServiceType::OWN_PROCESS;

/// Callbacks waiting to be picked up by the service main trampoline
///
/// The dispatcher gives service main no user data, so the callbacks cross
/// over through this slot. It is filled right before the dispatcher starts
/// and emptied by the first service main invocation.
static PENDING_SERVICE: Mutex<Option<Arc<dyn ServiceCallbacks>>> = parking_lot::const_mutex(None);

// Generate the Windows service entry point
define_windows_service!(ffi_service_main, service_main);

/// Service main function called by the Windows Service Control Manager
fn service_main(_arguments: Vec<OsString>) {
    let Some(callbacks) = PENDING_SERVICE.lock().take() else {
        error!("Service main invoked without pending service callbacks");
        return;
    };
    callbacks.on_start(&WindowsHost);
}

/// Attaches the process to the Service Control Manager
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsDispatcher;

impl Dispatcher for WindowsDispatcher {
    fn dispatch(&self, name: &str, callbacks: Arc<dyn ServiceCallbacks>) -> Result<(), HostError> {
        *PENDING_SERVICE.lock() = Some(callbacks);
        let result = service_dispatcher::start(name, ffi_service_main);
        PENDING_SERVICE.lock().take();
        result.map_err(|e| HostError::Dispatcher(e.to_string()))
    }
}

/// Registers control handlers with the Service Control Manager
struct WindowsHost;

impl ServiceHost for WindowsHost {
    fn register(
        &self,
        name: &str,
        callbacks: Arc<dyn ServiceCallbacks>,
    ) -> Result<Arc<dyn StatusReporter>, HostError> {
        let handle = service_control_handler::register(
            name,
            move |control_event| -> ServiceControlHandlerResult {
                let request = match control_event {
                    ServiceControl::Stop => ControlRequest::Stop,
                    ServiceControl::Interrogate => ControlRequest::Interrogate,
                    other => {
                        debug!("Unhandled service control {:?}", other);
                        ControlRequest::Other
                    }
                };
                match callbacks.on_control(request) {
                    ControlResponse::Handled => ServiceControlHandlerResult::NoError,
                    ControlResponse::NotImplemented => ServiceControlHandlerResult::NotImplemented,
                }
            },
        )
        .map_err(|e| HostError::RegisterHandler(e.to_string()))?;

        Ok(Arc::new(WindowsReporter { handle }))
    }
}

struct WindowsReporter {
    handle: ServiceStatusHandle,
}

impl StatusReporter for WindowsReporter {
    fn publish(&self, status: &StatusReport) -> Result<(), HostError> {
        self.handle
            .set_service_status(to_service_status(status))
            .map_err(|e| HostError::SetStatus(e.to_string()))
    }
}

fn to_service_status(status: &StatusReport) -> ServiceStatus {
    let current_state = match status.phase {
        ServicePhase::StartPending => ServiceState::StartPending,
        ServicePhase::Running => ServiceState::Running,
        ServicePhase::StopPending => ServiceState::StopPending,
        ServicePhase::Stopped => ServiceState::Stopped,
    };
    let controls_accepted = if status.accepts_stop {
        ServiceControlAccept::STOP
    } else {
        ServiceControlAccept::empty()
    };
    let exit_code = match status.exit {
        ServiceExit::NoError => ServiceExitCode::Win32(0),
        ServiceExit::Win32(code) => ServiceExitCode::Win32(code),
        ServiceExit::ServiceSpecific(code) => ServiceExitCode::ServiceSpecific(code),
    };

    ServiceStatus {
        service_type: SERVICE_TYPE,
        current_state,
        controls_accepted,
        exit_code,
        checkpoint: status.checkpoint,
        wait_hint: status.wait_hint,
        process_id: None,
    }
}
