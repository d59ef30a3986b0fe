//! In-process stand-ins for the service manager

use crate::error::HostError;
use crate::service::host::{
    ControlRequest, Dispatcher, ServiceCallbacks, ServiceHost, StatusReporter,
};
use crate::service::state::{ServicePhase, StatusReport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Records every published status
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<StatusReport>>,
    reject: bool,
}

impl RecordingReporter {
    /// Reporter that records but answers every publish with an error
    pub fn rejecting() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().clone()
    }

    pub fn phases(&self) -> Vec<ServicePhase> {
        self.reports.lock().iter().map(|r| r.phase).collect()
    }

    pub fn last(&self) -> Option<StatusReport> {
        self.reports.lock().last().copied()
    }

    /// Block until a report with `phase` was published
    pub fn wait_for(&self, phase: ServicePhase) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.phases().contains(&phase) {
            assert!(Instant::now() < deadline, "timed out waiting for {:?}", phase);
            thread::sleep(Duration::from_millis(2));
        }
    }
}

impl StatusReporter for RecordingReporter {
    fn publish(&self, status: &StatusReport) -> Result<(), HostError> {
        self.reports.lock().push(*status);
        if self.reject {
            return Err(HostError::SetStatus("rejected by test host".into()));
        }
        Ok(())
    }
}

/// Service host handing out a shared [`RecordingReporter`]
pub struct RecordingHost {
    pub reporter: Arc<RecordingReporter>,
    refuse_registration: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            reporter: Arc::new(RecordingReporter::default()),
            refuse_registration: false,
        }
    }

    pub fn with_reporter(reporter: RecordingReporter) -> Self {
        Self {
            reporter: Arc::new(reporter),
            refuse_registration: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            reporter: Arc::new(RecordingReporter::default()),
            refuse_registration: true,
        }
    }
}

impl ServiceHost for RecordingHost {
    fn register(
        &self,
        _name: &str,
        _callbacks: Arc<dyn ServiceCallbacks>,
    ) -> Result<Arc<dyn StatusReporter>, HostError> {
        if self.refuse_registration {
            return Err(HostError::RegisterHandler("refused by test host".into()));
        }
        Ok(self.reporter.clone())
    }
}

/// Dispatcher that runs the service in-process and stops it once running
pub struct ScriptedDispatcher {
    pub host: RecordingHost,
    pub dispatched: Mutex<Option<String>>,
}

impl ScriptedDispatcher {
    pub fn new(host: RecordingHost) -> Self {
        Self {
            host,
            dispatched: Mutex::new(None),
        }
    }
}

impl Dispatcher for ScriptedDispatcher {
    fn dispatch(&self, name: &str, callbacks: Arc<dyn ServiceCallbacks>) -> Result<(), HostError> {
        *self.dispatched.lock() = Some(name.to_string());

        let reporter = self.host.reporter.clone();
        let controller = callbacks.clone();
        let finished = Arc::new(AtomicBool::new(false));
        let service_done = finished.clone();
        let control_thread = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(5);
            while Instant::now() < deadline && !service_done.load(Ordering::SeqCst) {
                match reporter.last().map(|r| r.phase) {
                    Some(ServicePhase::Running) => {
                        controller.on_control(ControlRequest::Stop);
                        return;
                    }
                    Some(ServicePhase::Stopped) => return,
                    _ => thread::sleep(Duration::from_millis(2)),
                }
            }
        });

        callbacks.on_start(&self.host);
        finished.store(true, Ordering::SeqCst);
        let _ = control_thread.join();
        Ok(())
    }
}
