//! Boundary between the installer and the OS service database

use crate::error::DatabaseError;
use crate::service::descriptor::StartType;
use crate::service::state::ServicePhase;
use std::path::PathBuf;

/// Access requested when opening an installed service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAccessLevel {
    /// Query status only
    Query,
    /// Query, reconfigure and delete
    Modify,
}

/// Everything the database needs to create a service entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRegistration {
    pub name: String,
    pub display_name: String,
    pub start_type: StartType,
    /// Account name; `None` runs as LocalSystem
    pub account_name: Option<String>,
    pub account_password: Option<String>,
    pub executable: PathBuf,
    pub arguments: Vec<String>,
}

impl ServiceRegistration {
    /// Command line stored in the service database: quoted executable plus arguments
    pub fn binary_path(&self) -> String {
        let mut path = format!("\"{}\"", self.executable.display());
        for arg in &self.arguments {
            path.push(' ');
            path.push_str(arg);
        }
        path
    }
}

/// Connection to the service database
pub trait ServiceDatabase {
    /// Open the database with rights to create and modify services
    fn open_manager(&self) -> Result<Box<dyn ServiceManagerHandle + '_>, DatabaseError>;
}

/// Open service database
pub trait ServiceManagerHandle {
    /// Open an installed service; `Ok(None)` if no service has this name
    fn open_service(
        &self,
        name: &str,
        access: ServiceAccessLevel,
    ) -> Result<Option<Box<dyn ServiceHandle + '_>>, DatabaseError>;

    fn create_service(
        &self,
        registration: &ServiceRegistration,
    ) -> Result<Box<dyn ServiceHandle + '_>, DatabaseError>;
}

/// Open service entry
pub trait ServiceHandle {
    fn set_description(&self, description: &str) -> Result<(), DatabaseError>;

    /// Current run state; paused services count as running
    fn query_phase(&self) -> Result<ServicePhase, DatabaseError>;

    /// Mark the entry for deletion
    fn delete(&self) -> Result<(), DatabaseError>;
}

/// Database for platforms without a service manager
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDatabase;

impl ServiceDatabase for UnsupportedDatabase {
    fn open_manager(&self) -> Result<Box<dyn ServiceManagerHandle + '_>, DatabaseError> {
        Err(DatabaseError::new(
            "OpenSCManager",
            "no service control manager on this platform",
            None,
        ))
    }
}

/// Service database for the current platform
#[cfg(windows)]
pub fn platform_database() -> crate::cli::scm::ScmDatabase {
    crate::cli::scm::ScmDatabase
}

/// Service database for the current platform
#[cfg(not(windows))]
pub fn platform_database() -> UnsupportedDatabase {
    UnsupportedDatabase
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory service database

    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// Stored service entry
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Entry {
        pub registration: ServiceRegistration,
        pub description: Option<String>,
        pub phase: ServicePhase,
    }

    /// Service database kept in memory, with switchable failures
    #[derive(Default)]
    pub struct MemoryDatabase {
        pub entries: RefCell<BTreeMap<String, Entry>>,
        pub deny_access: bool,
        pub fail_create: bool,
        pub fail_description: bool,
        pub fail_query: bool,
    }

    impl MemoryDatabase {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn entry(&self, name: &str) -> Option<Entry> {
            self.entries.borrow().get(name).cloned()
        }

        pub fn set_phase(&self, name: &str, phase: ServicePhase) {
            if let Some(entry) = self.entries.borrow_mut().get_mut(name) {
                entry.phase = phase;
            }
        }
    }

    impl ServiceDatabase for MemoryDatabase {
        fn open_manager(&self) -> Result<Box<dyn ServiceManagerHandle + '_>, DatabaseError> {
            if self.deny_access {
                return Err(DatabaseError::new(
                    "OpenSCManager",
                    "Access is denied.",
                    Some(5),
                ));
            }
            Ok(Box::new(MemoryManager { db: self }))
        }
    }

    struct MemoryManager<'a> {
        db: &'a MemoryDatabase,
    }

    impl ServiceManagerHandle for MemoryManager<'_> {
        fn open_service(
            &self,
            name: &str,
            _access: ServiceAccessLevel,
        ) -> Result<Option<Box<dyn ServiceHandle + '_>>, DatabaseError> {
            if !self.db.entries.borrow().contains_key(name) {
                return Ok(None);
            }
            Ok(Some(Box::new(MemoryService {
                db: self.db,
                name: name.to_string(),
            })))
        }

        fn create_service(
            &self,
            registration: &ServiceRegistration,
        ) -> Result<Box<dyn ServiceHandle + '_>, DatabaseError> {
            if self.db.fail_create {
                return Err(DatabaseError::new(
                    "CreateService",
                    "The account name is invalid or does not exist.",
                    Some(1057),
                ));
            }
            self.db.entries.borrow_mut().insert(
                registration.name.clone(),
                Entry {
                    registration: registration.clone(),
                    description: None,
                    phase: ServicePhase::Stopped,
                },
            );
            Ok(Box::new(MemoryService {
                db: self.db,
                name: registration.name.clone(),
            }))
        }
    }

    struct MemoryService<'a> {
        db: &'a MemoryDatabase,
        name: String,
    }

    impl ServiceHandle for MemoryService<'_> {
        fn set_description(&self, description: &str) -> Result<(), DatabaseError> {
            if self.db.fail_description {
                return Err(DatabaseError::new(
                    "ChangeServiceConfig2",
                    "Access is denied.",
                    Some(5),
                ));
            }
            if let Some(entry) = self.db.entries.borrow_mut().get_mut(&self.name) {
                entry.description = Some(description.to_string());
            }
            Ok(())
        }

        fn query_phase(&self) -> Result<ServicePhase, DatabaseError> {
            if self.db.fail_query {
                return Err(DatabaseError::new(
                    "QueryServiceStatusEx",
                    "The handle is invalid.",
                    Some(6),
                ));
            }
            self.db
                .entries
                .borrow()
                .get(&self.name)
                .map(|entry| entry.phase)
                .ok_or_else(|| DatabaseError::new("QueryServiceStatusEx", "entry vanished", None))
        }

        fn delete(&self) -> Result<(), DatabaseError> {
            self.db.entries.borrow_mut().remove(&self.name);
            Ok(())
        }
    }
}
