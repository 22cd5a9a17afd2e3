//! # Worker Core Error Types
//!
//! [`SpecializationError`] is the failure taxonomy reported back to the host in
//! a `FunctionEnvironmentReloadResponse`. [`PumpError`] covers transport
//! failures, which end pump loops and never become protocol messages.
//! [`LaunchError`] is what a [`PayloadLauncher`](crate::PayloadLauncher)
//! returns.

use message_channel::ChannelError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use types::RpcException;

/// Reported as the `source` of every structured error the worker produces
pub const ERROR_SOURCE: &str = "net-host";

/// Why a specialization attempt did not complete
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecializationError {
    #[error("No worker configuration found in {}{}", directory.display(), reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    ConfigNotFound {
        directory: PathBuf,
        reason: Option<String>,
    },

    #[error(
        "The application in {} does not support placeholder mode. Rebuild it against a worker SDK \
         that sets `canUsePlaceholder` in worker.config.json, or disable placeholders for this app.",
        directory.display()
    )]
    PlaceholderUnsupported { directory: PathBuf },

    #[error("A specialization attempt is already in progress")]
    AlreadySpecializing,

    #[error("The worker is already specialized")]
    AlreadySpecialized,

    #[error("Hand-off to the application failed: {0}")]
    HandoffFailed(String),

    #[error("The application did not signal loaded within {0:?}")]
    LoadTimedOut(Duration),
}

impl SpecializationError {
    /// Variant name, used as the exception type name
    pub fn name(&self) -> &'static str {
        match self {
            SpecializationError::ConfigNotFound { .. } => "ConfigNotFound",
            SpecializationError::PlaceholderUnsupported { .. } => "PlaceholderUnsupported",
            SpecializationError::AlreadySpecializing => "AlreadySpecializing",
            SpecializationError::AlreadySpecialized => "AlreadySpecialized",
            SpecializationError::HandoffFailed(_) => "HandoffFailed",
            SpecializationError::LoadTimedOut(_) => "LoadTimedOut",
        }
    }

    /// Structured error carried by a failed reload response
    pub fn to_rpc_exception(&self) -> RpcException {
        RpcException {
            message: self.to_string(),
            source: ERROR_SOURCE.to_string(),
            stack_trace: String::new(),
            type_name: self.name().to_string(),
            is_user_exception: false,
        }
    }
}

/// Failure starting or signalling the customer payload
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Hand-off channel unavailable: {0}")]
    Unavailable(String),

    #[error("Payload exited with {}", code.map(|c| format!("status {c}")).unwrap_or_else(|| "a signal".to_string()))]
    Exited { code: Option<i32> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Transport-level failures of the pump loops
#[derive(Error, Debug)]
pub enum PumpError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
