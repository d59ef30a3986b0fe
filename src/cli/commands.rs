//! Install and uninstall pipelines
//!
//! Each pipeline runs its steps in order and stops at the first failure.
//! Completed steps are not rolled back: a service created by install stays
//! registered even if setting its description fails afterwards.

use crate::cli::database::{ServiceAccessLevel, ServiceDatabase, ServiceRegistration};
use crate::error::ScmError;
use crate::service::descriptor::ServiceDescriptor;
use crate::service::state::ServicePhase;
use std::path::Path;
use tracing::{debug, warn};

/// Account the installed service runs under
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    /// `None` runs as LocalSystem
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Register the service described by `descriptor` in the service database
///
/// Returns the created registration. A failure to set the description is
/// only logged.
pub fn install_service(
    database: &dyn ServiceDatabase,
    descriptor: &ServiceDescriptor,
    executable: &Path,
    account: Account,
) -> Result<ServiceRegistration, ScmError> {
    let manager = database.open_manager().map_err(ScmError::Connect)?;

    if manager
        .open_service(&descriptor.name, ServiceAccessLevel::Query)?
        .is_some()
    {
        return Err(ScmError::AlreadyInstalled(descriptor.name.clone()));
    }

    let registration = ServiceRegistration {
        name: descriptor.name.clone(),
        display_name: descriptor.display_name.clone(),
        start_type: descriptor.start_type,
        account_name: account.name,
        account_password: account.password,
        executable: executable.to_path_buf(),
        arguments: descriptor.args.clone(),
    };
    debug!("Binary path: {}", registration.binary_path());

    let service = manager.create_service(&registration)?;

    if let Some(description) = &descriptor.description {
        if let Err(e) = service.set_description(description) {
            warn!("Failed to set service description text: {}", e);
            println!("WARNING: Failed to set service description text: {}", e);
        }
    }

    Ok(registration)
}

/// Remove the service `name` from the service database
///
/// Refuses to remove a service that is not stopped.
pub fn uninstall_service(database: &dyn ServiceDatabase, name: &str) -> Result<(), ScmError> {
    let manager = database.open_manager().map_err(ScmError::Connect)?;

    let service = manager
        .open_service(name, ServiceAccessLevel::Modify)?
        .ok_or_else(|| ScmError::NotInstalled(name.to_string()))?;

    let phase = service.query_phase()?;
    if phase != ServicePhase::Stopped {
        return Err(ScmError::NotStopped {
            name: name.to_string(),
            state: format!("{:?}", phase),
        });
    }

    service.delete()?;
    Ok(())
}
