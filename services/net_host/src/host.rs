//! Host entrypoint: builds the worker core from settings and runs one session

use crate::environment::ProcessEnvironment;
use crate::launcher::ProcessLauncher;
use crate::payload::PayloadBridge;
use crate::preload::FilePreloader;
use crate::transport;
use anyhow::{Context, Result};
use message_channel::DualChannel;
use relay_core::{
    spawn_supervised, Collaborators, CoordinatorConfig, LoadSignal, ProtocolResponder,
    SpecializationCoordinator, StreamPump,
};
use std::sync::Arc;
use tracing::info;
use worker_config::{HostSettings, JsonWorkerConfigSource};

pub struct HostEntrypoint {
    settings: HostSettings,
}

impl HostEntrypoint {
    pub fn new(settings: HostSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    /// Production collaborators for these settings
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            config_source: Arc::new(JsonWorkerConfigSource),
            environment: Arc::new(ProcessEnvironment),
            pre_warmer: Arc::new(FilePreloader::new(self.settings.preload_manifest.clone())),
            launcher: Arc::new(ProcessLauncher::new(
                &self.settings.handoff_socket,
                &self.settings.payload_socket,
            )),
        }
    }

    /// Serve the host connection until the host closes it
    pub async fn run(self) -> Result<()> {
        let settings = &self.settings;
        let channel = Arc::new(DualChannel::new());
        let signal = Arc::new(LoadSignal::new());
        let collaborators = self.collaborators();

        let coordinator = Arc::new(SpecializationCoordinator::new(
            channel.clone(),
            signal.clone(),
            &collaborators,
            CoordinatorConfig {
                load_timeout: settings.load_timeout(),
            },
        ));
        let responder = Arc::new(ProtocolResponder::new(collaborators.pre_warmer.clone()));
        let pump = Arc::new(StreamPump::new(coordinator, responder));

        let listener = PayloadBridge::bind(&settings.payload_socket).with_context(|| {
            format!(
                "Failed to bind payload socket {}",
                settings.payload_socket.display()
            )
        })?;
        let bridge = Arc::new(PayloadBridge::new(
            channel.clone(),
            signal,
            settings.max_message_length,
        ));
        spawn_supervised("payload-bridge", bridge.serve(listener));

        let (reader, writer) = transport::connect(settings).await?;
        pump.run(reader, writer).await.context("Host stream failed")?;

        let stats = channel.stats();
        info!(
            inbound = stats.inbound_enqueued,
            outbound = stats.outbound_enqueued,
            "Host stream closed, shutting down"
        );
        Ok(())
    }
}
