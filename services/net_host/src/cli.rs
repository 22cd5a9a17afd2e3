//! Command line flags
//!
//! The functions host launches workers with camelCase flags
//! (`--workerId`, `--grpcMaxMessageLength`); both spellings are accepted.
//! Flags given on the command line override the settings file and environment.

use clap::Parser;
use std::path::PathBuf;
use worker_config::HostSettings;

#[derive(Parser, Debug, Default)]
#[command(name = "net_host")]
#[command(about = "Placeholder worker host for function apps")]
#[command(version)]
pub struct Args {
    /// Host RPC address
    #[arg(long)]
    pub host: Option<String>,

    /// Host RPC port
    #[arg(long)]
    pub port: Option<u16>,

    /// Worker id announced to the host
    #[arg(long, alias = "workerId")]
    pub worker_id: Option<String>,

    /// Request id of the start-stream message
    #[arg(long, alias = "requestId")]
    pub request_id: Option<String>,

    /// Largest message accepted on the host stream
    #[arg(long, alias = "grpcMaxMessageLength")]
    pub grpc_max_message_length: Option<usize>,

    /// Path to settings file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Give up on the payload's loaded signal after this many milliseconds
    #[arg(long)]
    pub load_timeout_ms: Option<u64>,

    /// Socket the loaded payload connects back to
    #[arg(long)]
    pub payload_socket: Option<PathBuf>,

    /// Socket of a pre-started placeholder app accepting hand-offs
    #[arg(long)]
    pub handoff_socket: Option<PathBuf>,

    /// File listing paths to page in on warmup
    #[arg(long)]
    pub preload_manifest: Option<PathBuf>,
}

impl Args {
    /// Overlay the flags that were given onto `settings`
    pub fn apply_to(&self, settings: &mut HostSettings) {
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(worker_id) = &self.worker_id {
            settings.worker_id = worker_id.clone();
        }
        if let Some(request_id) = &self.request_id {
            settings.request_id = request_id.clone();
        }
        if let Some(max) = self.grpc_max_message_length {
            settings.max_message_length = max;
        }
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
        }
        if let Some(timeout) = self.load_timeout_ms {
            settings.load_timeout_ms = Some(timeout);
        }
        if let Some(path) = &self.payload_socket {
            settings.payload_socket = path.clone();
        }
        if let Some(path) = &self.handoff_socket {
            settings.handoff_socket = path.clone();
        }
        if let Some(path) = &self.preload_manifest {
            settings.preload_manifest = Some(path.clone());
        }
    }
}
