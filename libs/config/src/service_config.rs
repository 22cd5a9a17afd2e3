//! Host Settings Module
//!
//! Provides settings loading for the worker host. Values are layered:
//! built-in defaults, then an optional TOML file, then environment variables
//! with the `FUNCTIONS_NETHOST__` prefix. The binary applies CLI flags last.

use crate::service;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Runtime settings for one worker host process
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct HostSettings {
    /// Host RPC endpoint address
    pub host: String,
    pub port: u16,

    /// Identity announced in the `StartStream` message
    pub worker_id: String,
    pub request_id: String,

    /// Largest frame accepted on either socket
    pub max_message_length: usize,

    /// Upper bound on waiting for the payload's loaded signal; unbounded when unset
    pub load_timeout_ms: Option<u64>,

    pub payload_socket: PathBuf,
    pub handoff_socket: PathBuf,

    /// File listing paths to page in on warmup, one per line
    pub preload_manifest: Option<PathBuf>,

    pub log_level: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            host: service::host::HOST.to_string(),
            port: service::host::PORT,
            worker_id: String::new(),
            request_id: String::new(),
            max_message_length: service::host::MAX_MESSAGE_LENGTH,
            load_timeout_ms: None,
            payload_socket: PathBuf::from(service::payload::PAYLOAD_SOCKET),
            handoff_socket: PathBuf::from(service::payload::HANDOFF_SOCKET),
            preload_manifest: None,
            log_level: "info".to_string(),
        }
    }
}

impl HostSettings {
    /// Load settings from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading host settings: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // FUNCTIONS_NETHOST__PORT=7071 style overrides
        builder = builder.add_source(
            Environment::with_prefix(crate::env::SETTINGS_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build host settings")?;

        let settings: HostSettings = config
            .try_deserialize()
            .context("Failed to deserialize host settings")?;
        debug!(?settings, "host settings loaded");
        Ok(settings)
    }

    /// Parse settings from TOML text, without environment overrides
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse host settings")
    }

    /// `http://host:port` form used in logs
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}
