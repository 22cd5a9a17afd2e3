//! Common test utilities for the worker core
//!
//! In-memory collaborators, scripted host transports and message builders
//! shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use message_channel::{DualChannel, MessageStream};
use parking_lot::Mutex;
use relay_core::{
    Collaborators, CoordinatorConfig, EnvironmentMutator, Handoff, HostReader, HostWriter,
    LaunchError, LoadSignal, PayloadLauncher, PayloadSink, PreWarmer, ProtocolResponder,
    PumpError, SpecializationCoordinator, StreamPump,
};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use types::{
    FunctionEnvironmentReloadRequest, FunctionsMetadataRequest, InvocationRequest, MessageContent,
    MessageKind, OpaqueMessage, StreamingMessage, WorkerInitRequest, WorkerWarmupRequest,
};
use worker_config::{WorkerConfigDescriptor, WorkerConfigError, WorkerConfigSource};

// ---------------------------------------------------------------------------
// Message builders
// ---------------------------------------------------------------------------

pub fn init(id: &str) -> StreamingMessage {
    StreamingMessage::new(
        id,
        MessageContent::WorkerInitRequest(WorkerInitRequest {
            host_version: "4.0.0".to_string(),
            ..Default::default()
        }),
    )
}

pub fn metadata(id: &str) -> StreamingMessage {
    StreamingMessage::new(
        id,
        MessageContent::FunctionsMetadataRequest(FunctionsMetadataRequest::default()),
    )
}

pub fn warmup(id: &str) -> StreamingMessage {
    StreamingMessage::new(
        id,
        MessageContent::WorkerWarmupRequest(WorkerWarmupRequest::default()),
    )
}

pub fn reload(id: &str, directory: &str, env: &[(&str, &str)]) -> StreamingMessage {
    StreamingMessage::new(
        id,
        MessageContent::FunctionEnvironmentReloadRequest(FunctionEnvironmentReloadRequest {
            function_app_directory: directory.to_string(),
            environment_variables: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }),
    )
}

pub fn custom(id: &str) -> StreamingMessage {
    StreamingMessage::new(
        id,
        MessageContent::Opaque(OpaqueMessage {
            kind: "CustomMessageKind".to_string(),
            payload: id.as_bytes().to_vec(),
        }),
    )
}

pub fn invocation(id: &str) -> StreamingMessage {
    StreamingMessage::new(
        id,
        MessageContent::InvocationRequest(InvocationRequest {
            invocation_id: format!("inv-{id}"),
            function_id: "HttpTrigger".to_string(),
            payload: Vec::new(),
        }),
    )
}

pub fn kinds(messages: &[StreamingMessage]) -> Vec<MessageKind> {
    messages.iter().map(StreamingMessage::kind).collect()
}

pub fn ids(messages: &[StreamingMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.request_id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryConfigSource {
    apps: Mutex<HashMap<PathBuf, WorkerConfigDescriptor>>,
    malformed: Mutex<Vec<PathBuf>>,
    pub resolved: AtomicUsize,
}

impl InMemoryConfigSource {
    pub fn add(&self, directory: &str, executable: &str, supports_placeholder: bool) {
        self.apps.lock().insert(
            PathBuf::from(directory),
            WorkerConfigDescriptor {
                executable_relative_path: executable.to_string(),
                supports_placeholder,
            },
        );
    }

    pub fn add_malformed(&self, directory: &str) {
        self.malformed.lock().push(PathBuf::from(directory));
    }
}

impl WorkerConfigSource for InMemoryConfigSource {
    fn resolve(&self, directory: &Path) -> Result<Option<WorkerConfigDescriptor>, WorkerConfigError> {
        self.resolved.fetch_add(1, Ordering::SeqCst);
        if self.malformed.lock().iter().any(|d| d == directory) {
            return Err(WorkerConfigError::Malformed {
                path: directory.join("worker.config.json"),
                reason: "expected value at line 1 column 1".to_string(),
            });
        }
        Ok(self.apps.lock().get(directory).cloned())
    }
}

#[derive(Default)]
pub struct RecordingEnvironment {
    pub variables: Mutex<HashMap<String, String>>,
}

impl RecordingEnvironment {
    pub fn get(&self, key: &str) -> Option<String> {
        self.variables.lock().get(key).cloned()
    }
}

impl EnvironmentMutator for RecordingEnvironment {
    fn apply(&self, variables: &HashMap<String, String>) {
        self.variables
            .lock()
            .extend(variables.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

#[derive(Default)]
pub struct CountingWarmer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PreWarmer for CountingWarmer {
    async fn pre_warm(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the mock payload does when started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBehavior {
    /// Report loaded right away
    Prompt,
    /// Accept the hand-off but never report loaded
    Never,
    /// Fail the hand-off itself
    Fail,
    /// Load-and-run returns without reporting loaded
    ExitEarly,
}

pub struct MockLauncher {
    fast: bool,
    behavior: Mutex<LoadBehavior>,
    signal: Arc<LoadSignal>,
    pub handoffs: Mutex<Vec<Handoff>>,
}

impl MockLauncher {
    pub fn new(fast: bool, behavior: LoadBehavior, signal: Arc<LoadSignal>) -> Self {
        Self {
            fast,
            behavior: Mutex::new(behavior),
            signal,
            handoffs: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: LoadBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn handoff_count(&self) -> usize {
        self.handoffs.lock().len()
    }
}

#[async_trait]
impl PayloadLauncher for MockLauncher {
    fn supports_fast_handoff(&self) -> bool {
        self.fast
    }

    async fn signal_handoff(&self, handoff: &Handoff) -> Result<(), LaunchError> {
        self.handoffs.lock().push(handoff.clone());
        let behavior = *self.behavior.lock();
        match behavior {
            LoadBehavior::Prompt => {
                self.signal.notify_loaded(handoff.attempt);
                Ok(())
            }
            LoadBehavior::Fail => Err(LaunchError::Unavailable("hand-off socket refused".to_string())),
            LoadBehavior::Never | LoadBehavior::ExitEarly => Ok(()),
        }
    }

    async fn load_and_run(&self, handoff: Handoff) -> Result<(), LaunchError> {
        self.handoffs.lock().push(handoff.clone());
        let behavior = *self.behavior.lock();
        match behavior {
            LoadBehavior::Prompt => {
                self.signal.notify_loaded(handoff.attempt);
                futures::future::pending::<()>().await;
                Ok(())
            }
            LoadBehavior::Never => {
                futures::future::pending::<()>().await;
                Ok(())
            }
            LoadBehavior::Fail => Err(LaunchError::Exited { code: Some(134) }),
            LoadBehavior::ExitEarly => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

/// Host reader that yields a fixed script, then ends
pub struct ScriptedReader(VecDeque<StreamingMessage>);

impl ScriptedReader {
    pub fn new(messages: Vec<StreamingMessage>) -> Self {
        Self(messages.into())
    }
}

#[async_trait]
impl HostReader for ScriptedReader {
    async fn read_message(&mut self) -> Result<Option<StreamingMessage>, PumpError> {
        Ok(self.0.pop_front())
    }
}

/// Host reader fed from a test-owned sender; ends when the sender drops
pub struct ChannelReader(tokio::sync::mpsc::UnboundedReceiver<StreamingMessage>);

impl ChannelReader {
    pub fn new() -> (tokio::sync::mpsc::UnboundedSender<StreamingMessage>, Self) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (tx, Self(rx))
    }
}

#[async_trait]
impl HostReader for ChannelReader {
    async fn read_message(&mut self) -> Result<Option<StreamingMessage>, PumpError> {
        Ok(self.0.recv().await)
    }
}

/// Records everything written, usable as host writer or payload sink
#[derive(Clone, Default)]
pub struct Recorder(pub Arc<Mutex<Vec<StreamingMessage>>>);

impl Recorder {
    pub fn messages(&self) -> Vec<StreamingMessage> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
}

#[async_trait]
impl HostWriter for Recorder {
    async fn write_message(&mut self, message: StreamingMessage) -> Result<(), PumpError> {
        self.0.lock().push(message);
        Ok(())
    }
}

#[async_trait]
impl PayloadSink for Recorder {
    async fn deliver(&mut self, message: StreamingMessage) -> Result<(), PumpError> {
        self.0.lock().push(message);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub channel: Arc<DualChannel>,
    pub signal: Arc<LoadSignal>,
    pub config_source: Arc<InMemoryConfigSource>,
    pub environment: Arc<RecordingEnvironment>,
    pub warmer: Arc<CountingWarmer>,
    pub launcher: Arc<MockLauncher>,
    pub coordinator: Arc<SpecializationCoordinator>,
    pub pump: Arc<StreamPump>,
}

impl Harness {
    /// Fast hand-off, payload loads promptly, `/app` resolves to `run.dll`
    pub fn new() -> Self {
        Self::build(true, LoadBehavior::Prompt, CoordinatorConfig::default())
    }

    pub fn build(fast: bool, behavior: LoadBehavior, config: CoordinatorConfig) -> Self {
        let channel = Arc::new(DualChannel::new());
        let signal = Arc::new(LoadSignal::new());
        let config_source = Arc::new(InMemoryConfigSource::default());
        config_source.add("/app", "run.dll", true);
        let environment = Arc::new(RecordingEnvironment::default());
        let warmer = Arc::new(CountingWarmer::default());
        let launcher = Arc::new(MockLauncher::new(fast, behavior, signal.clone()));

        let collaborators = Collaborators {
            config_source: config_source.clone(),
            environment: environment.clone(),
            pre_warmer: warmer.clone(),
            launcher: launcher.clone(),
        };
        let coordinator = Arc::new(SpecializationCoordinator::new(
            channel.clone(),
            signal.clone(),
            &collaborators,
            config,
        ));
        let responder = Arc::new(ProtocolResponder::new(collaborators.pre_warmer.clone()));
        let pump = Arc::new(StreamPump::new(coordinator.clone(), responder));

        Self {
            channel,
            signal,
            config_source,
            environment,
            warmer,
            launcher,
            coordinator,
            pump,
        }
    }

    pub fn is_specialized(&self) -> bool {
        self.coordinator.state().is_specialized()
    }

    pub fn outbound_count(&self) -> u64 {
        self.channel.stats().outbound_enqueued
    }

    /// Close both queues and collect what each consumer would have seen
    pub async fn finish(
        &self,
        inbound: MessageStream,
        outbound: MessageStream,
    ) -> (Vec<StreamingMessage>, Vec<StreamingMessage>) {
        self.channel.close();
        (collect(inbound).await, collect(outbound).await)
    }
}

pub async fn collect(mut stream: MessageStream) -> Vec<StreamingMessage> {
    let mut messages = Vec::new();
    while let Some(message) = stream.recv().await {
        messages.push(message);
    }
    messages
}

/// Poll `done` until it holds, failing the test after a few seconds
pub async fn settle(mut done: impl FnMut() -> bool) {
    for _ in 0..600 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
