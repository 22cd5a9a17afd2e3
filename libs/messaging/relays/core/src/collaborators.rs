//! Seams to the world outside the worker core
//!
//! The coordinator and responder never touch the process environment, the file
//! system or child processes directly; the binary wires concrete
//! implementations of these traits in, tests wire in-memory ones.

use crate::error::LaunchError;
use crate::signal::AttemptToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use worker_config::WorkerConfigSource;

/// Applies environment variables to the process the application will run in
pub trait EnvironmentMutator: Send + Sync {
    fn apply(&self, variables: &HashMap<String, String>);
}

/// Warms caches ahead of specialization in response to a warmup request
#[async_trait]
pub trait PreWarmer: Send + Sync {
    async fn pre_warm(&self);
}

/// Everything the payload needs to start the resolved application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handoff {
    pub executable_path: PathBuf,
    pub environment: HashMap<String, String>,
    pub attempt: AttemptToken,
}

/// Starts the customer payload for a resolved application
///
/// Exactly one of the two start paths is used for the life of the process,
/// chosen from [`supports_fast_handoff`](PayloadLauncher::supports_fast_handoff)
/// when the coordinator is built.
#[async_trait]
pub trait PayloadLauncher: Send + Sync {
    /// Whether an already-running payload host can take a [`Handoff`] message
    fn supports_fast_handoff(&self) -> bool;

    /// Fast path: pass the hand-off to the running payload host and return
    async fn signal_handoff(&self, handoff: &Handoff) -> Result<(), LaunchError>;

    /// Fallback path: load and run the application; returns when it stops
    async fn load_and_run(&self, handoff: Handoff) -> Result<(), LaunchError>;
}

/// The full set of external collaborators, shared by `Arc`
#[derive(Clone)]
pub struct Collaborators {
    pub config_source: Arc<dyn WorkerConfigSource>,
    pub environment: Arc<dyn EnvironmentMutator>,
    pub pre_warmer: Arc<dyn PreWarmer>,
    pub launcher: Arc<dyn PayloadLauncher>,
}
