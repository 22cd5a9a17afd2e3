//! # Specialization Coordinator
//!
//! Runs one specialization attempt from an admitted reload request to a loaded
//! application:
//!
//! ```text
//! Idle ─► Resolving ─► HandingOff ─► AwaitingLoadSignal ─► Specialized
//!            │              │                 │
//!            └──────────────┴─────────────────┴──────────► Failed
//! ```
//!
//! - **Resolving**: apply the request's environment (plus the script root),
//!   then resolve the worker configuration of the application directory.
//! - **HandingOff**: signal the running payload host (fast path) or spawn a
//!   supervised load-and-run task (fallback). The path is chosen once, when the
//!   coordinator is built.
//! - **AwaitingLoadSignal**: wait for this attempt's token on the
//!   [`LoadSignal`], bounded by the configured timeout if there is one.
//!
//! On success the gate pushes the trigger message and everything held behind
//! it to inbound, then flips `specialized`. On failure the gate reopens and the
//! host may retry with another reload request. Nothing here is abortable once
//! started.

use crate::collaborators::{Collaborators, EnvironmentMutator, Handoff, PayloadLauncher};
use crate::error::SpecializationError;
use crate::signal::{AttemptToken, LoadSignal};
use crate::state::{Admission, AttemptTicket, WorkerState};
use crate::supervisor::{spawn_supervised, TaskOutcome};
use message_channel::DualChannel;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use types::{MessageContent, StreamingMessage};
use worker_config::{env, WorkerConfigSource};

/// A reload request unpacked for the coordinator
#[derive(Debug, Clone)]
pub struct SpecializationRequest {
    pub application_directory: PathBuf,
    pub environment_variables: HashMap<String, String>,
    trigger: StreamingMessage,
}

impl SpecializationRequest {
    /// Unpack a `FunctionEnvironmentReloadRequest`; any other message is handed back
    pub fn from_message(message: StreamingMessage) -> Result<Self, StreamingMessage> {
        let MessageContent::FunctionEnvironmentReloadRequest(reload) = &message.content else {
            return Err(message);
        };
        Ok(Self {
            application_directory: PathBuf::from(&reload.function_app_directory),
            environment_variables: reload.environment_variables.clone(),
            trigger: message,
        })
    }

    pub fn request_id(&self) -> &str {
        &self.trigger.request_id
    }

    /// The message that started the attempt
    pub fn trigger(&self) -> &StreamingMessage {
        &self.trigger
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecializationStage {
    Idle,
    Resolving,
    HandingOff,
    AwaitingLoadSignal,
    Specialized,
    Failed,
}

/// How the resolved application is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffMode {
    /// Message the already-running payload host
    Signal,
    /// Spawn the application as a supervised task
    LoadAndRun,
}

#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    /// Upper bound on the load wait; `None` waits indefinitely
    pub load_timeout: Option<Duration>,
}

pub struct SpecializationCoordinator {
    state: Arc<WorkerState>,
    channel: Arc<DualChannel>,
    signal: Arc<LoadSignal>,
    config_source: Arc<dyn WorkerConfigSource>,
    environment: Arc<dyn EnvironmentMutator>,
    launcher: Arc<dyn PayloadLauncher>,
    mode: HandoffMode,
    config: CoordinatorConfig,
    stage: Mutex<SpecializationStage>,
}

impl SpecializationCoordinator {
    pub fn new(
        channel: Arc<DualChannel>,
        signal: Arc<LoadSignal>,
        collaborators: &Collaborators,
        config: CoordinatorConfig,
    ) -> Self {
        let mode = if collaborators.launcher.supports_fast_handoff() {
            HandoffMode::Signal
        } else {
            HandoffMode::LoadAndRun
        };
        info!(?mode, load_timeout = ?config.load_timeout, "Specialization coordinator ready");

        Self {
            state: Arc::new(WorkerState::new()),
            channel,
            signal,
            config_source: collaborators.config_source.clone(),
            environment: collaborators.environment.clone(),
            launcher: collaborators.launcher.clone(),
            mode,
            config,
            stage: Mutex::new(SpecializationStage::Idle),
        }
    }

    pub fn state(&self) -> &Arc<WorkerState> {
        &self.state
    }

    pub fn channel(&self) -> &Arc<DualChannel> {
        &self.channel
    }

    pub fn load_signal(&self) -> &Arc<LoadSignal> {
        &self.signal
    }

    pub fn mode(&self) -> HandoffMode {
        self.mode
    }

    /// Stage of the most recent attempt
    pub fn stage(&self) -> SpecializationStage {
        *self.stage.lock()
    }

    /// Route one host message through the worker state gate
    pub fn admit(&self, message: StreamingMessage) -> Admission {
        self.state.admit(message, &self.channel, &self.signal)
    }

    /// Open an attempt and run it to completion
    pub async fn specialize(&self, request: SpecializationRequest) -> Result<(), SpecializationError> {
        let ticket = self.state.try_begin(&self.signal)?;
        self.run(ticket, request).await
    }

    /// Run the attempt `ticket` was admitted for
    pub async fn run(
        &self,
        ticket: AttemptTicket,
        request: SpecializationRequest,
    ) -> Result<(), SpecializationError> {
        let attempt = ticket.attempt();
        let SpecializationRequest {
            application_directory,
            environment_variables,
            trigger,
        } = request;

        info!(%attempt, directory = %application_directory.display(), "🚀 Specializing");
        match self
            .attempt(attempt, &application_directory, environment_variables)
            .await
        {
            Ok(()) => {
                self.state.complete(ticket, trigger, &self.channel);
                self.set_stage(SpecializationStage::Specialized);
                Ok(())
            }
            Err(e) => {
                warn!(%attempt, error = %e, "Specialization failed");
                self.abandon(ticket);
                self.set_stage(SpecializationStage::Failed);
                Err(e)
            }
        }
    }

    /// Reopen the gate for `ticket`'s attempt and retire its token
    pub(crate) fn abandon(&self, ticket: AttemptTicket) {
        let attempt = ticket.attempt();
        self.state.abandon(ticket, &self.channel);
        self.signal.retire(attempt);
    }

    async fn attempt(
        &self,
        attempt: AttemptToken,
        directory: &Path,
        mut environment: HashMap<String, String>,
    ) -> Result<(), SpecializationError> {
        self.set_stage(SpecializationStage::Resolving);
        environment.insert(env::SCRIPT_ROOT.to_string(), directory.display().to_string());
        self.environment.apply(&environment);

        let descriptor = match self.config_source.resolve(directory) {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                return Err(SpecializationError::ConfigNotFound {
                    directory: directory.to_path_buf(),
                    reason: None,
                })
            }
            Err(e) => {
                return Err(SpecializationError::ConfigNotFound {
                    directory: directory.to_path_buf(),
                    reason: Some(e.to_string()),
                })
            }
        };
        if !descriptor.supports_placeholder {
            return Err(SpecializationError::PlaceholderUnsupported {
                directory: directory.to_path_buf(),
            });
        }

        self.set_stage(SpecializationStage::HandingOff);
        let handoff = Handoff {
            executable_path: descriptor.executable_path(directory),
            environment,
            attempt,
        };
        debug!(%attempt, executable = %handoff.executable_path.display(), mode = ?self.mode, "Handing off");

        let load_task = match self.mode {
            HandoffMode::Signal => {
                self.launcher
                    .signal_handoff(&handoff)
                    .await
                    .map_err(|e| SpecializationError::HandoffFailed(e.to_string()))?;
                None
            }
            HandoffMode::LoadAndRun => {
                let launcher = self.launcher.clone();
                Some(spawn_supervised(format!("load-and-run {attempt}"), async move {
                    launcher.load_and_run(handoff).await
                }))
            }
        };

        self.set_stage(SpecializationStage::AwaitingLoadSignal);
        self.await_loaded(attempt, load_task).await
    }

    async fn await_loaded(
        &self,
        attempt: AttemptToken,
        load_task: Option<JoinHandle<TaskOutcome>>,
    ) -> Result<(), SpecializationError> {
        let exited = async move {
            match load_task {
                Some(task) => match task.await {
                    Ok(TaskOutcome::Completed) => {
                        "application exited before signalling loaded".to_string()
                    }
                    Ok(TaskOutcome::Failed(reason)) | Ok(TaskOutcome::Panicked(reason)) => reason,
                    Err(e) => e.to_string(),
                },
                None => futures::future::pending::<String>().await,
            }
        };
        let race = async {
            tokio::select! {
                biased;
                _ = self.signal.wait(attempt) => Ok(()),
                reason = exited => Err(SpecializationError::HandoffFailed(reason)),
            }
        };

        match self.config.load_timeout {
            Some(limit) => tokio::time::timeout(limit, race)
                .await
                .map_err(|_| SpecializationError::LoadTimedOut(limit))?,
            None => race.await,
        }
    }

    fn set_stage(&self, stage: SpecializationStage) {
        *self.stage.lock() = stage;
    }
}
