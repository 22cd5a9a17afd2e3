//! # Process Launcher
//!
//! Starts the customer application for a resolved [`Handoff`]:
//!
//! - **fast path**: a placeholder app already running next to this process
//!   listens on the hand-off socket; the hand-off is sent to it as one JSON
//!   line and it loads the application in place
//! - **fallback**: the executable is started as a child process with the
//!   hand-off environment, the attempt token and the payload socket path
//!
//! The fast path is available when the hand-off socket exists at startup.

use async_trait::async_trait;
use relay_core::{Handoff, LaunchError, PayloadLauncher};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::process::Command;
use tracing::{info, warn};
use worker_config::env::{PAYLOAD_SOCKET, SPECIALIZATION_ATTEMPT};

#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    handoff_socket: PathBuf,
    payload_socket: PathBuf,
    fast_handoff: bool,
}

impl ProcessLauncher {
    pub fn new(handoff_socket: impl Into<PathBuf>, payload_socket: impl Into<PathBuf>) -> Self {
        let handoff_socket = handoff_socket.into();
        let fast_handoff = handoff_socket.exists();
        Self {
            handoff_socket,
            payload_socket: payload_socket.into(),
            fast_handoff,
        }
    }

    pub fn handoff_socket(&self) -> &Path {
        &self.handoff_socket
    }

    /// One JSON line describing `handoff`
    pub fn handoff_record(handoff: &Handoff) -> Result<String, LaunchError> {
        let mut line =
            serde_json::to_string(handoff).map_err(|e| LaunchError::Other(e.to_string()))?;
        line.push('\n');
        Ok(line)
    }
}

#[async_trait]
impl PayloadLauncher for ProcessLauncher {
    fn supports_fast_handoff(&self) -> bool {
        self.fast_handoff
    }

    async fn signal_handoff(&self, handoff: &Handoff) -> Result<(), LaunchError> {
        let mut stream = UnixStream::connect(&self.handoff_socket).await.map_err(|e| {
            LaunchError::Unavailable(format!("{}: {e}", self.handoff_socket.display()))
        })?;
        let record = Self::handoff_record(handoff)?;
        stream.write_all(record.as_bytes()).await?;
        stream.shutdown().await?;
        info!(attempt = %handoff.attempt, executable = %handoff.executable_path.display(), "Hand-off sent");
        Ok(())
    }

    async fn load_and_run(&self, handoff: Handoff) -> Result<(), LaunchError> {
        info!(attempt = %handoff.attempt, executable = %handoff.executable_path.display(), "Starting application");
        let status = Command::new(&handoff.executable_path)
            .envs(&handoff.environment)
            .env(SPECIALIZATION_ATTEMPT, handoff.attempt.to_string())
            .env(PAYLOAD_SOCKET, &self.payload_socket)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            warn!(attempt = %handoff.attempt, %status, "Application exited");
            Err(LaunchError::Exited {
                code: status.code(),
            })
        }
    }
}
