//! Service descriptor and its validation

use crate::error::{DescriptorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Longest name, display name or description the service manager accepts
pub const MAX_TEXT_LEN: usize = 255;

/// Default interval reported as wait hint for pending states
pub const DEFAULT_CHECK_STOP_INTERVAL: Duration = Duration::from_millis(3000);

/// Wrapped application entry point: receives the process arguments, returns its exit code
pub type MainCallback = Arc<dyn Fn(Vec<String>) -> i32 + Send + Sync>;

/// Asks the wrapped application to shut down; must not block
pub type StopCallback = Arc<dyn Fn() + Send + Sync>;

/// Receives formatted log lines produced by the wrapper
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// How the service manager starts the installed service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartType {
    /// Started at boot
    Auto,
    /// Started on request
    #[default]
    Demand,
    /// Cannot be started
    Disabled,
}

/// Account the installed service runs under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunAs {
    /// LocalSystem
    #[default]
    System,
    /// NT AUTHORITY\LocalService
    LocalService,
    /// NT AUTHORITY\NetworkService
    LocalNetwork,
    /// Account supplied on the install command line
    Custom,
}

impl RunAs {
    /// Built-in account name, if this identity maps to one
    pub fn account_name(self) -> Option<&'static str> {
        match self {
            RunAs::LocalService => Some(r"NT AUTHORITY\LocalService"),
            RunAs::LocalNetwork => Some(r"NT AUTHORITY\NetworkService"),
            RunAs::System | RunAs::Custom => None,
        }
    }
}

/// Everything needed to install and run a wrapped application as a service
#[derive(Clone)]
pub struct ServiceDescriptor {
    /// Internal service name
    pub name: String,
    /// Name shown in services.msc
    pub display_name: String,
    /// Optional description text
    pub description: Option<String>,
    /// Extra arguments appended to the installed binary path
    pub args: Vec<String>,
    /// Start type used on install
    pub start_type: StartType,
    /// Account used on install
    pub run_as: RunAs,
    /// Upper bound for waiting on the worker after a stop (zero = wait forever)
    pub shutdown_timeout: Duration,
    /// Wait hint reported while a transition is pending
    pub check_stop_interval: Duration,
    /// Wrapped application entry point
    pub main: Option<MainCallback>,
    /// Wrapped application stop request
    pub stop: Option<StopCallback>,
    /// Optional sink for wrapper log output
    pub log: Option<LogCallback>,
}

impl ServiceDescriptor {
    /// Create a descriptor with default settings and no callbacks
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: None,
            args: Vec::new(),
            start_type: StartType::default(),
            run_as: RunAs::default(),
            shutdown_timeout: Duration::ZERO,
            check_stop_interval: DEFAULT_CHECK_STOP_INTERVAL,
            main: None,
            stop: None,
            log: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_start_type(mut self, start_type: StartType) -> Self {
        self.start_type = start_type;
        self
    }

    pub fn with_run_as(mut self, run_as: RunAs) -> Self {
        self.run_as = run_as;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_check_stop_interval(mut self, interval: Duration) -> Self {
        self.check_stop_interval = interval;
        self
    }

    pub fn with_main<F>(mut self, main: F) -> Self
    where
        F: Fn(Vec<String>) -> i32 + Send + Sync + 'static,
    {
        self.main = Some(Arc::new(main));
        self
    }

    pub fn with_stop<F>(mut self, stop: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop = Some(Arc::new(stop));
        self
    }

    pub fn with_log<F>(mut self, log: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.log = Some(Arc::new(log));
        self
    }

    /// Check the descriptor is well formed
    ///
    /// Checks run in a fixed order and stop at the first failure: name,
    /// display name, description, main callback, stop callback.
    pub fn validate(&self) -> Result<()> {
        check_text("name", &self.name)?;
        check_text("display name", &self.display_name)?;
        if let Some(description) = &self.description {
            check_length("description", description)?;
        }
        if self.main.is_none() {
            return Err(DescriptorError::MissingCallback("main"));
        }
        if self.stop.is_none() {
            return Err(DescriptorError::MissingCallback("stop"));
        }
        Ok(())
    }

    /// Wait hint reported while stopping
    pub fn stop_wait_hint(&self) -> Duration {
        if self.shutdown_timeout.is_zero() {
            self.check_stop_interval
        } else {
            self.shutdown_timeout
        }
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("description", &self.description)
            .field("args", &self.args)
            .field("start_type", &self.start_type)
            .field("run_as", &self.run_as)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("check_stop_interval", &self.check_stop_interval)
            .field("main", &self.main.is_some())
            .field("stop", &self.stop.is_some())
            .field("log", &self.log.is_some())
            .finish()
    }
}

fn check_text(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(DescriptorError::Missing { field });
    }
    check_length(field, value)
}

fn check_length(field: &'static str, value: &str) -> Result<()> {
    let len = value.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(DescriptorError::TooLong {
            field,
            len,
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}
