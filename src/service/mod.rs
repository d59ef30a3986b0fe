//! Windows Service support
//!
//! Wraps an application's blocking main function as a service managed by the
//! Windows Service Control Manager. The lifecycle engine only talks to the
//! traits in [`host`]; the `windows` module implements them on top of the
//! `windows-service` crate.

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod host;
pub mod signal;
pub mod state;
pub mod worker;

#[cfg(windows)]
pub mod windows;

#[cfg(test)]
pub(crate) mod testing;

pub use descriptor::{RunAs, ServiceDescriptor, StartType};
pub use engine::LifecycleEngine;
pub use host::{platform_dispatcher, Dispatcher};
