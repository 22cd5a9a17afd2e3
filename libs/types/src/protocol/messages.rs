//! Payload structs for each [`MessageContent`](super::MessageContent) variant

use super::status::StatusResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// First message the worker writes, identifying itself to the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartStream {
    pub worker_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerInitRequest {
    pub host_version: String,
    pub capabilities: HashMap<String, String>,
    pub worker_directory: String,
    pub function_app_directory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInitResponse {
    pub worker_version: String,
    pub capabilities: HashMap<String, String>,
    pub result: StatusResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionsMetadataRequest {
    pub function_app_directory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMetadataResponse {
    /// Tells the host to index functions itself instead of asking the worker
    pub use_default_metadata_indexing: bool,
    pub result: StatusResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerWarmupRequest {
    pub worker_directory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerWarmupResponse {
    pub result: StatusResult,
}

/// Specialization trigger: the application to load and the environment it runs with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEnvironmentReloadRequest {
    pub function_app_directory: String,
    pub environment_variables: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEnvironmentReloadResponse {
    pub result: StatusResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub invocation_id: String,
    pub function_id: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub invocation_id: String,
    pub payload: Vec<u8>,
    pub result: StatusResult,
}

/// A message kind forwarded verbatim; `kind` is the host's name for it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueMessage {
    pub kind: String,
    pub payload: Vec<u8>,
}
