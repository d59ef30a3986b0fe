//! Service settings file support

use crate::service::descriptor::{ServiceDescriptor, StartType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Settings loaded from a TOML file, layered over the compiled-in descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSettings {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,

    /// Log file path (unset = no file logging in service mode)
    pub log_file: Option<PathBuf>,

    /// Shutdown timeout in milliseconds (0 = wait forever)
    pub shutdown_timeout_ms: Option<u64>,

    /// Wait hint for pending transitions in milliseconds
    pub check_stop_interval_ms: Option<u64>,

    /// Start type used by `install`
    pub start_type: Option<StartType>,

    /// Extra arguments appended to the installed binary path
    pub args: Option<Vec<String>>,
}

impl ServiceSettings {
    /// Default log level when neither settings nor RUST_LOG specify one
    pub const DEFAULT_LOG_LEVEL: &'static str = "info";

    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load settings for `service_name` from the default locations
    ///
    /// Searches in order:
    /// 1. Same directory as executable: `<service_name>.toml`
    /// 2. `%PROGRAMDATA%\<service_name>\config.toml`
    /// 3. User config directory: `<service_name>/config.toml`
    ///
    /// Returns default settings if no file exists.
    pub fn load_default(service_name: &str) -> Result<Self, SettingsError> {
        match Self::candidate_paths(service_name)
            .into_iter()
            .find(|path| path.exists())
        {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Locations searched by [`ServiceSettings::load_default`]
    pub fn candidate_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                paths.push(exe_dir.join(format!("{}.toml", service_name)));
            }
        }

        if let Ok(program_data) = std::env::var("PROGRAMDATA") {
            paths.push(
                Path::new(&program_data)
                    .join(service_name)
                    .join("config.toml"),
            );
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(service_name).join("config.toml"));
        }

        paths
    }

    /// Save settings to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(SettingsError::Serialize)?;

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Override descriptor fields that are set in this file
    pub fn apply(&self, descriptor: &mut ServiceDescriptor) {
        if let Some(ms) = self.shutdown_timeout_ms {
            descriptor.shutdown_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.check_stop_interval_ms {
            descriptor.check_stop_interval = Duration::from_millis(ms);
        }
        if let Some(start_type) = self.start_type {
            descriptor.start_type = start_type;
        }
        if let Some(args) = &self.args {
            descriptor.args = args.clone();
        }
    }

    /// Effective log level
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(Self::DEFAULT_LOG_LEVEL)
    }

    /// Generate a sample settings file
    pub fn sample_config() -> String {
        r#"# Service wrapper settings
# Every key is optional; unset keys keep the values compiled into the service.

# Log level: trace, debug, info, warn, error (default: info)
log_level = "info"

# Log file path (unset = no file logging in service mode)
# Example: log_file = "C:\\ProgramData\\MyService\\service.log"

# Milliseconds to wait for the application after a stop request (0 = forever)
shutdown_timeout_ms = 0

# Wait hint reported while starting or stopping, in milliseconds
check_stop_interval_ms = 3000

# Start type used by `install`: auto, demand, disabled
start_type = "demand"

# Extra arguments appended to the installed binary path
args = []
"#
        .to_string()
    }
}

/// Settings file errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// IO error reading/writing settings file
    #[error("Failed to access settings file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Error parsing TOML
    #[error("Failed to parse settings file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Error serializing settings
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[source] toml::ser::Error),
}
