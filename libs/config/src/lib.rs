//! # Worker Host Configuration
//!
//! Centralized configuration for the worker host process:
//!
//! - **Host settings**: connection endpoint, worker identity, socket paths and
//!   timeouts, layered from a TOML file and `FUNCTIONS_NETHOST__*` variables
//! - **Worker configuration discovery**: reads `worker.config.json` from a
//!   customer application directory to learn which executable to load and
//!   whether the application can be started from a placeholder
//! - **Environment names and defaults** shared by the host crates
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use worker_config::{HostSettings, JsonWorkerConfigSource, WorkerConfigSource};
//!
//! let settings = HostSettings::load(Some(Path::new("config/net_host.toml")))?;
//! let descriptor = JsonWorkerConfigSource.resolve(Path::new("/home/site/wwwroot"))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod env;
pub mod service;
pub mod service_config;
pub mod worker_config;

pub use service_config::HostSettings;
pub use worker_config::{
    JsonWorkerConfigSource, WorkerConfigDescriptor, WorkerConfigError, WorkerConfigSource,
    WORKER_CONFIG_FILE_NAME,
};
