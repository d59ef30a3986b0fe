//! svcwrap - run any foreground application as a Windows service
//!
//! Relays Service Control Manager start/stop events into an application's
//! blocking main function and stop callback, and installs or uninstalls the
//! service definition from the same executable.

pub mod cli;
pub mod error;
pub mod logging;
pub mod service;
pub mod wrapper;

pub use error::{DescriptorError, WrapperExit};
pub use service::{RunAs, ServiceDescriptor, StartType};
pub use wrapper::{run, run_with};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
