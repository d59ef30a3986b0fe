//! Runtime state of a service run and the status reports derived from it

use std::time::Duration;

/// Lifecycle phase reported to the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePhase {
    StartPending,
    Running,
    StopPending,
    Stopped,
}

/// Exit status carried by a status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceExit {
    /// Win32 NO_ERROR
    NoError,
    /// Win32 error code reported by the OS
    Win32(u32),
    /// ERROR_SERVICE_SPECIFIC_ERROR carrying the wrapped application's exit code
    ServiceSpecific(u32),
}

impl ServiceExit {
    /// Map a worker exit code to the final exit status
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            ServiceExit::NoError
        } else {
            // Negative codes keep their bit pattern, as the OS stores a DWORD
            ServiceExit::ServiceSpecific(code as u32)
        }
    }
}

/// Status record handed to the service manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub phase: ServicePhase,
    /// Whether the stop control is accepted
    pub accepts_stop: bool,
    pub exit: ServiceExit,
    pub checkpoint: u32,
    pub wait_hint: Duration,
}

/// Mutable state of one service run
#[derive(Debug, Clone)]
pub struct RuntimeState {
    phase: ServicePhase,
    checkpoint: u32,
    published: bool,
    last_error: Option<u32>,
    exit_code: Option<i32>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            phase: ServicePhase::StartPending,
            checkpoint: 0,
            published: false,
            last_error: None,
            exit_code: None,
        }
    }
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ServicePhase {
        self.phase
    }

    pub fn checkpoint(&self) -> u32 {
        self.checkpoint
    }

    pub fn last_error(&self) -> Option<u32> {
        self.last_error
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Record the wrapped application's exit code
    pub fn record_exit_code(&mut self, code: i32) {
        self.exit_code = Some(code);
    }

    /// Move to a new phase and build the report for it
    ///
    /// The checkpoint advances on every report after the first one, so
    /// successive reports of a run never repeat a checkpoint.
    pub fn transition(
        &mut self,
        phase: ServicePhase,
        exit: ServiceExit,
        wait_hint: Duration,
    ) -> StatusReport {
        if self.published {
            self.checkpoint += 1;
        }
        self.published = true;
        self.phase = phase;
        if let ServiceExit::Win32(code) | ServiceExit::ServiceSpecific(code) = exit {
            self.last_error = Some(code);
        }

        StatusReport {
            phase,
            accepts_stop: phase == ServicePhase::Running,
            exit,
            checkpoint: self.checkpoint,
            wait_hint,
        }
    }

    /// Exit status for the final Stopped report
    pub fn final_exit(&self) -> ServiceExit {
        ServiceExit::from_exit_code(self.exit_code.unwrap_or(0))
    }
}
