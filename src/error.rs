//! Unified error types for svcwrap

use thiserror::Error;

/// Process exit codes returned by [`crate::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WrapperExit {
    /// Command or service run completed
    Ok = 0,
    /// Service descriptor failed validation
    InvalidConfig = 1,
    /// Malformed command line
    CliSyntaxError = 2,
    /// Service database operation failed
    CliScmError = 3,
    /// Could not attach to the service control dispatcher
    CtrlDispatcherFailed = 1000,
    /// Could not register the service control handler
    RegisterCtrlHandlerFailed = 1001,
}

impl WrapperExit {
    /// Numeric process exit code
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<WrapperExit> for std::process::ExitCode {
    fn from(exit: WrapperExit) -> Self {
        // Windows exit codes are 32 bit, but ExitCode::from only takes u8
        match u8::try_from(exit.code()) {
            Ok(code) => std::process::ExitCode::from(code),
            Err(_) => std::process::ExitCode::FAILURE,
        }
    }
}

/// Service descriptor validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// Required text field is empty
    #[error("{field} must not be empty")]
    Missing { field: &'static str },

    /// Text field exceeds the service manager's limit
    #[error("{field} exceeds {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// Required callback was not supplied
    #[error("{0} callback is required")]
    MissingCallback(&'static str),
}

/// Errors raised by the OS service host adapter
#[derive(Error, Debug)]
pub enum HostError {
    /// Process was not started by the service control manager
    #[error("Failed to attach to service control dispatcher: {0}")]
    Dispatcher(String),

    /// Control handler registration was refused
    #[error("Failed to register control handler: {0}")]
    RegisterHandler(String),

    /// Status update was rejected
    #[error("Failed to publish service status: {0}")]
    SetStatus(String),

    /// No service manager on this platform
    #[error("Service control manager is not available on this platform")]
    Unsupported,
}

/// Service database (SCM) operation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}{}", .code.map(|c| format!(" (Error code: {})", c)).unwrap_or_default())]
pub struct DatabaseError {
    /// Operation that failed
    pub operation: &'static str,
    /// Human readable cause
    pub message: String,
    /// Raw OS error code, when the OS reported one
    pub code: Option<i32>,
}

impl DatabaseError {
    /// Create a database error with context
    pub fn new(operation: &'static str, message: impl Into<String>, code: Option<i32>) -> Self {
        Self {
            operation,
            message: message.into(),
            code,
        }
    }

    /// Wrap an OS error, keeping its raw code
    pub fn from_io(operation: &'static str, err: &std::io::Error) -> Self {
        Self::new(operation, err.to_string(), err.raw_os_error())
    }
}

/// Failure of an install or uninstall step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScmError {
    /// Service database could not be opened
    #[error("Failed to access Service Control Manager! Do you have Admin rights? ({0})")]
    Connect(#[source] DatabaseError),

    /// Install found an existing entry
    #[error("Service {0} is already installed!\nExecute the uninstall command first, if you want to reinstall it!")]
    AlreadyInstalled(String),

    /// Uninstall found no entry
    #[error("Service {0} is not installed!")]
    NotInstalled(String),

    /// Uninstall found the service still active
    #[error("Service {name} is not stopped! (current state: {state})")]
    NotStopped { name: String, state: String },

    /// Any other database operation failed
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Result type alias for descriptor validation
pub type Result<T> = std::result::Result<T, DescriptorError>;
