//! Service database backed by the Windows Service Control Manager

use crate::cli::database::{
    ServiceAccessLevel, ServiceDatabase, ServiceHandle, ServiceManagerHandle, ServiceRegistration,
};
use crate::error::DatabaseError;
use crate::service::descriptor::StartType;
use crate::service::state::ServicePhase;
use std::ffi::OsString;
use std::io;
use std::ptr;
use windows_service::{
    service::{
        Service, ServiceAccess, ServiceErrorControl, ServiceInfo, ServiceStartType, ServiceState,
        ServiceType,
    },
    service_manager::{ServiceManager, ServiceManagerAccess},
};
use windows_sys::Win32::Security::SC_HANDLE;
use windows_sys::Win32::System::Services::{
    ChangeServiceConfigW, CloseServiceHandle, OpenSCManagerW, OpenServiceW, SC_MANAGER_CONNECT,
    SERVICE_CHANGE_CONFIG, SERVICE_NO_CHANGE,
};

/// ERROR_SERVICE_DOES_NOT_EXIST
const ERROR_SERVICE_DOES_NOT_EXIST: i32 = 1060;

/// The local computer's active service database
#[derive(Debug, Default, Clone, Copy)]
pub struct ScmDatabase;

impl ServiceDatabase for ScmDatabase {
    fn open_manager(&self) -> Result<Box<dyn ServiceManagerHandle + '_>, DatabaseError> {
        let manager_access = ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE;
        let manager = ServiceManager::local_computer(None::<&str>, manager_access)
            .map_err(|e| db_error("OpenSCManager", e))?;
        Ok(Box::new(ScmManager { manager }))
    }
}

struct ScmManager {
    manager: ServiceManager,
}

impl ServiceManagerHandle for ScmManager {
    fn open_service(
        &self,
        name: &str,
        access: ServiceAccessLevel,
    ) -> Result<Option<Box<dyn ServiceHandle + '_>>, DatabaseError> {
        let service_access = match access {
            ServiceAccessLevel::Query => ServiceAccess::QUERY_STATUS,
            ServiceAccessLevel::Modify => ServiceAccess::all(),
        };
        match self.manager.open_service(name, service_access) {
            Ok(service) => Ok(Some(Box::new(ScmService { service }))),
            Err(e) if os_code(&e) == Some(ERROR_SERVICE_DOES_NOT_EXIST) => Ok(None),
            Err(e) => Err(db_error("OpenService", e)),
        }
    }

    fn create_service(
        &self,
        registration: &ServiceRegistration,
    ) -> Result<Box<dyn ServiceHandle + '_>, DatabaseError> {
        let info = ServiceInfo {
            name: OsString::from(&registration.name),
            display_name: OsString::from(&registration.display_name),
            service_type: ServiceType::OWN_PROCESS,
            start_type: match registration.start_type {
                StartType::Auto => ServiceStartType::AutoStart,
                StartType::Demand => ServiceStartType::OnDemand,
                StartType::Disabled => ServiceStartType::Disabled,
            },
            error_control: ServiceErrorControl::Normal,
            executable_path: registration.executable.clone(),
            launch_arguments: Vec::new(),
            dependencies: vec![],
            account_name: registration.account_name.as_ref().map(OsString::from),
            account_password: registration.account_password.as_ref().map(OsString::from),
        };

        // Full access so the description can be set on the new entry
        let service = self
            .manager
            .create_service(&info, ServiceAccess::all())
            .map_err(|e| db_error("CreateService", e))?;

        // windows-service escapes each argument on its own; store the exact command line instead
        set_binary_path(&registration.name, &launch_command(registration)?)?;
        Ok(Box::new(ScmService { service }))
    }
}

struct ScmService {
    service: Service,
}

impl ServiceHandle for ScmService {
    fn set_description(&self, description: &str) -> Result<(), DatabaseError> {
        self.service
            .set_description(description)
            .map_err(|e| db_error("ChangeServiceConfig2", e))
    }

    fn query_phase(&self) -> Result<ServicePhase, DatabaseError> {
        let status = self
            .service
            .query_status()
            .map_err(|e| db_error("QueryServiceStatusEx", e))?;
        Ok(match status.current_state {
            ServiceState::Stopped => ServicePhase::Stopped,
            ServiceState::StartPending => ServicePhase::StartPending,
            ServiceState::StopPending => ServicePhase::StopPending,
            _ => ServicePhase::Running,
        })
    }

    fn delete(&self) -> Result<(), DatabaseError> {
        self.service
            .delete()
            .map_err(|e| db_error("DeleteService", e))
    }
}

/// NUL-terminated UTF-16 form of the registration's command line
fn launch_command(registration: &ServiceRegistration) -> Result<Vec<u16>, DatabaseError> {
    let command = registration.binary_path();
    to_wide(&command).ok_or_else(|| {
        DatabaseError::new("ChangeServiceConfig", "command line contains a NUL character", None)
    })
}

fn to_wide(s: &str) -> Option<Vec<u16>> {
    if s.contains('\0') {
        return None;
    }
    Some(s.encode_utf16().chain(std::iter::once(0)).collect())
}

/// Service database handle closed on drop
struct RawHandle(SC_HANDLE);

impl RawHandle {
    fn check(handle: SC_HANDLE, operation: &'static str) -> Result<Self, DatabaseError> {
        if handle == 0 {
            return Err(DatabaseError::from_io(operation, &io::Error::last_os_error()));
        }
        Ok(Self(handle))
    }
}

impl Drop for RawHandle {
    fn drop(&mut self) {
        unsafe {
            CloseServiceHandle(self.0);
        }
    }
}

/// Replace the stored command line of an installed service, leaving everything else unchanged
fn set_binary_path(name: &str, command: &[u16]) -> Result<(), DatabaseError> {
    let name = to_wide(name)
        .ok_or_else(|| DatabaseError::new("OpenService", "name contains a NUL character", None))?;

    unsafe {
        let manager = RawHandle::check(
            OpenSCManagerW(ptr::null(), ptr::null(), SC_MANAGER_CONNECT),
            "OpenSCManager",
        )?;
        let service = RawHandle::check(
            OpenServiceW(manager.0, name.as_ptr(), SERVICE_CHANGE_CONFIG),
            "OpenService",
        )?;

        let changed = ChangeServiceConfigW(
            service.0,
            SERVICE_NO_CHANGE,
            SERVICE_NO_CHANGE,
            SERVICE_NO_CHANGE,
            command.as_ptr(),
            ptr::null(),
            ptr::null_mut(),
            ptr::null(),
            ptr::null(),
            ptr::null(),
            ptr::null(),
        );
        if changed == 0 {
            return Err(DatabaseError::from_io(
                "ChangeServiceConfig",
                &io::Error::last_os_error(),
            ));
        }
    }
    Ok(())
}

fn os_code(err: &windows_service::Error) -> Option<i32> {
    match err {
        windows_service::Error::Winapi(io_err) => io_err.raw_os_error(),
        _ => None,
    }
}

fn db_error(operation: &'static str, err: windows_service::Error) -> DatabaseError {
    match &err {
        windows_service::Error::Winapi(io_err) => DatabaseError::from_io(operation, io_err),
        _ => DatabaseError::new(operation, err.to_string(), None),
    }
}
