//! Net host binary
//!
//! Usage:
//!   net_host --host 127.0.0.1 --port 50051 --workerId <id> --requestId <id>
//!   net_host --config config/net_host.toml

use anyhow::{Context, Result};
use clap::Parser;
use net_host::{logging, Args, HostEntrypoint};
use tracing::info;
use worker_config::HostSettings;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings =
        HostSettings::load(args.config.as_deref()).context("Failed to load host settings")?;
    args.apply_to(&mut settings);

    logging::init_logging(&settings.log_level)?;

    info!("🚀 Starting net host {}", env!("CARGO_PKG_VERSION"));
    info!(
        endpoint = %settings.endpoint(),
        worker_id = %settings.worker_id,
        "Placeholder mode"
    );

    HostEntrypoint::new(settings).run().await
}
