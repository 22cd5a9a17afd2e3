//! Worker configuration discovery
//!
//! A customer application ships a `worker.config.json` next to its binaries:
//!
//! ```json
//! {
//!   "description": {
//!     "language": "dotnet-isolated",
//!     "defaultExecutablePath": "dotnet",
//!     "defaultWorkerPath": "MyApp.dll",
//!     "canUsePlaceholder": true
//!   }
//! }
//! ```
//!
//! Only `defaultWorkerPath` and `canUsePlaceholder` matter to specialization.
//! Applications built before placeholder support omit the flag, which reads as
//! `false`.

use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const WORKER_CONFIG_FILE_NAME: &str = "worker.config.json";

/// Token some SDKs prefix the worker path with; it stands for the app directory
const WORKER_ROOT_TOKEN: &str = "{WorkerRoot}";

/// What specialization needs to know about one application directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfigDescriptor {
    /// Executable path relative to the application directory
    pub executable_relative_path: String,
    pub supports_placeholder: bool,
}

impl WorkerConfigDescriptor {
    /// Join the relative executable path onto `app_dir`
    pub fn executable_path(&self, app_dir: &Path) -> PathBuf {
        app_dir.join(&self.executable_relative_path)
    }
}

#[derive(Debug, Error)]
pub enum WorkerConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed worker configuration {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

/// Resolves the worker configuration for an application directory
pub trait WorkerConfigSource: Send + Sync {
    /// `Ok(None)` when the directory has no worker configuration
    fn resolve(&self, directory: &Path) -> Result<Option<WorkerConfigDescriptor>, WorkerConfigError>;
}

#[derive(Deserialize)]
struct WorkerConfigFile {
    description: Option<WorkerDescription>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkerDescription {
    default_worker_path: Option<String>,
    #[serde(default)]
    can_use_placeholder: bool,
}

/// Reads `worker.config.json` from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWorkerConfigSource;

impl WorkerConfigSource for JsonWorkerConfigSource {
    fn resolve(&self, directory: &Path) -> Result<Option<WorkerConfigDescriptor>, WorkerConfigError> {
        let path = directory.join(WORKER_CONFIG_FILE_NAME);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("No worker configuration at {:?}", path);
                return Ok(None);
            }
            Err(source) => return Err(WorkerConfigError::Io { path, source }),
        };

        let descriptor = parse_worker_config(&contents).map_err(|reason| {
            WorkerConfigError::Malformed {
                path: path.clone(),
                reason,
            }
        })?;

        debug!(
            path = ?path,
            executable = %descriptor.executable_relative_path,
            supports_placeholder = descriptor.supports_placeholder,
            "worker configuration resolved"
        );
        Ok(Some(descriptor))
    }
}

/// Parse the contents of a `worker.config.json`
pub fn parse_worker_config(contents: &str) -> Result<WorkerConfigDescriptor, String> {
    let file: WorkerConfigFile = serde_json::from_str(contents).map_err(|e| e.to_string())?;
    let description = file
        .description
        .ok_or_else(|| "missing `description` section".to_string())?;

    let raw_path = description
        .default_worker_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| "missing `description.defaultWorkerPath`".to_string())?;

    let relative = raw_path
        .strip_prefix(WORKER_ROOT_TOKEN)
        .unwrap_or(&raw_path)
        .trim_start_matches(['/', '\\'])
        .to_string();

    Ok(WorkerConfigDescriptor {
        executable_relative_path: relative,
        supports_placeholder: description.can_use_placeholder,
    })
}
