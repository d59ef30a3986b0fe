//! Service lifecycle engine and control handler
//!
//! Drives StartPending -> Running -> StopPending -> Stopped for one service
//! run. The control handler moves the service from Running to StopPending and
//! sets the stop signal; the engine then waits for the worker and publishes
//! the final status.

use crate::error::DescriptorError;
use crate::service::descriptor::{MainCallback, ServiceDescriptor, StopCallback};
use crate::service::host::{
    ControlRequest, ControlResponse, ServiceCallbacks, ServiceHost, StatusReporter,
};
use crate::service::signal::StopSignal;
use crate::service::state::{RuntimeState, ServiceExit, ServicePhase, StatusReport};
use crate::service::worker::{Worker, WorkerOutcome};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// ERROR_GEN_FAILURE, reported when the OS gave no error code
const FALLBACK_WIN32_ERROR: u32 = 31;

/// Starts the worker thread for the wrapped application
pub type Spawner = fn(&str, MainCallback, Vec<String>) -> io::Result<Worker>;

/// Owning context of one service run
pub struct LifecycleEngine {
    descriptor: Arc<ServiceDescriptor>,
    main: MainCallback,
    stop: StopCallback,
    args: Vec<String>,
    spawn: Spawner,
    state: Mutex<RuntimeState>,
    stop_signal: StopSignal,
    reporter: OnceLock<Arc<dyn StatusReporter>>,
    registration_failed: AtomicBool,
}

impl LifecycleEngine {
    /// Create the engine for a validated descriptor
    ///
    /// `args` are the original process arguments passed on to the wrapped
    /// application.
    pub fn new(
        descriptor: Arc<ServiceDescriptor>,
        args: Vec<String>,
    ) -> Result<Self, DescriptorError> {
        descriptor.validate()?;
        let main = descriptor
            .main
            .clone()
            .ok_or(DescriptorError::MissingCallback("main"))?;
        let stop = descriptor
            .stop
            .clone()
            .ok_or(DescriptorError::MissingCallback("stop"))?;

        Ok(Self {
            descriptor,
            main,
            stop,
            args,
            spawn: Worker::spawn,
            state: Mutex::new(RuntimeState::new()),
            stop_signal: StopSignal::new(),
            reporter: OnceLock::new(),
            registration_failed: AtomicBool::new(false),
        })
    }

    /// Replace how the worker thread is started
    pub fn with_spawner(mut self, spawn: Spawner) -> Self {
        self.spawn = spawn;
        self
    }

    pub fn phase(&self) -> ServicePhase {
        self.state.lock().phase()
    }

    /// Snapshot of the runtime state
    pub fn state(&self) -> RuntimeState {
        self.state.lock().clone()
    }

    /// Whether the control handler could not be registered
    pub fn registration_failed(&self) -> bool {
        self.registration_failed.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_signal.is_set()
    }

    fn run(self: Arc<Self>, host: &dyn ServiceHost) {
        let name = self.descriptor.name.as_str();

        let callbacks: Arc<dyn ServiceCallbacks> = self.clone();
        let reporter = match host.register(name, callbacks) {
            Ok(reporter) => reporter,
            Err(e) => {
                error!("{}", e);
                self.registration_failed.store(true, Ordering::SeqCst);
                return;
            }
        };
        let _ = self.reporter.set(reporter);

        info!("Starting {} service", self.descriptor.display_name);
        self.transition(
            ServicePhase::StartPending,
            ServiceExit::NoError,
            self.descriptor.check_stop_interval,
        );

        let worker = match (self.spawn)(name, self.main.clone(), self.args.clone()) {
            Ok(worker) => worker,
            Err(e) => {
                error!("Failed to start worker thread: {}", e);
                let code = e
                    .raw_os_error()
                    .map_or(FALLBACK_WIN32_ERROR, |code| code as u32);
                self.transition(ServicePhase::Stopped, ServiceExit::Win32(code), Duration::ZERO);
                return;
            }
        };

        self.transition(ServicePhase::Running, ServiceExit::NoError, Duration::ZERO);
        info!("Service running");

        self.stop_signal.wait();
        debug!("Stop signal received, waiting for wrapped application");

        let timeout = self.descriptor.shutdown_timeout;
        let outcome = worker.wait((!timeout.is_zero()).then_some(timeout));

        let mut state = self.state.lock();
        match outcome {
            WorkerOutcome::Finished(code) => state.record_exit_code(code),
            WorkerOutcome::TimedOut => warn!(
                "Wrapped application did not return within {:?}; reporting stopped anyway",
                timeout
            ),
            WorkerOutcome::Vanished => {
                error!("Wrapped application ended without an exit code")
            }
        }
        let exit = state.final_exit();
        let report = state.transition(ServicePhase::Stopped, exit, Duration::ZERO);
        self.publish(&report);
        drop(state);

        info!("Service stopped ({:?})", exit);
    }

    fn transition(&self, phase: ServicePhase, exit: ServiceExit, wait_hint: Duration) {
        let mut state = self.state.lock();
        let report = state.transition(phase, exit, wait_hint);
        // Publish under the lock so reports reach the OS in transition order
        self.publish(&report);
    }

    fn publish(&self, report: &StatusReport) {
        let Some(reporter) = self.reporter.get() else {
            warn!("No status handle, dropping {:?} report", report.phase);
            return;
        };
        if let Err(e) = reporter.publish(report) {
            warn!("{} ({:?}, checkpoint {})", e, report.phase, report.checkpoint);
        }
    }

    fn handle_stop(&self) {
        let phase = self.phase();
        if phase != ServicePhase::Running {
            info!("Ignoring stop request while {:?}", phase);
            return;
        }

        info!("Received stop request");
        // Not under the state lock: the callback may call back into the engine
        (self.stop)();

        let mut state = self.state.lock();
        if state.phase() != ServicePhase::Running {
            debug!("Stop already in progress");
            return;
        }
        let report = state.transition(
            ServicePhase::StopPending,
            ServiceExit::NoError,
            self.descriptor.stop_wait_hint(),
        );
        self.publish(&report);
        drop(state);

        if !self.stop_signal.set() {
            debug!("Stop signal was already set");
        }
    }
}

impl ServiceCallbacks for LifecycleEngine {
    fn on_start(self: Arc<Self>, host: &dyn ServiceHost) {
        self.run(host);
    }

    fn on_control(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::Stop => {
                self.handle_stop();
                ControlResponse::Handled
            }
            ControlRequest::Interrogate => ControlResponse::Handled,
            ControlRequest::Other => ControlResponse::NotImplemented,
        }
    }
}
