//! Streaming protocol envelope and message kinds
//!
//! [`StreamingMessage`] is the unit exchanged with the host. Its
//! [`MessageContent`] decides how the worker treats it: the handshake kinds are
//! answered directly while the worker is still a placeholder, everything else is
//! forwarded to the customer payload.

pub mod constants;
pub mod messages;
pub mod status;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use constants::*;
pub use messages::*;
pub use status::{RpcException, Status, StatusResult};

/// One message on the host stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingMessage {
    /// Correlates a response with the request that produced it
    pub request_id: String,
    pub content: MessageContent,
}

/// Payload of a [`StreamingMessage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageContent {
    StartStream(StartStream),
    WorkerInitRequest(WorkerInitRequest),
    WorkerInitResponse(WorkerInitResponse),
    FunctionsMetadataRequest(FunctionsMetadataRequest),
    FunctionMetadataResponse(FunctionMetadataResponse),
    WorkerWarmupRequest(WorkerWarmupRequest),
    WorkerWarmupResponse(WorkerWarmupResponse),
    FunctionEnvironmentReloadRequest(FunctionEnvironmentReloadRequest),
    FunctionEnvironmentReloadResponse(FunctionEnvironmentReloadResponse),
    InvocationRequest(InvocationRequest),
    InvocationResponse(InvocationResponse),
    /// Any host message kind the worker host passes through without looking inside
    Opaque(OpaqueMessage),
}

/// Field-less discriminant of [`MessageContent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    StartStream,
    WorkerInitRequest,
    WorkerInitResponse,
    FunctionsMetadataRequest,
    FunctionMetadataResponse,
    WorkerWarmupRequest,
    WorkerWarmupResponse,
    FunctionEnvironmentReloadRequest,
    FunctionEnvironmentReloadResponse,
    InvocationRequest,
    InvocationResponse,
    Opaque,
}

impl StreamingMessage {
    pub fn new(request_id: impl Into<String>, content: MessageContent) -> Self {
        Self {
            request_id: request_id.into(),
            content,
        }
    }

    /// Build the reply to `self`, reusing its request id
    pub fn reply(&self, content: MessageContent) -> Self {
        Self::new(self.request_id.clone(), content)
    }

    pub fn kind(&self) -> MessageKind {
        self.content.kind()
    }
}

impl MessageContent {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageContent::StartStream(_) => MessageKind::StartStream,
            MessageContent::WorkerInitRequest(_) => MessageKind::WorkerInitRequest,
            MessageContent::WorkerInitResponse(_) => MessageKind::WorkerInitResponse,
            MessageContent::FunctionsMetadataRequest(_) => MessageKind::FunctionsMetadataRequest,
            MessageContent::FunctionMetadataResponse(_) => MessageKind::FunctionMetadataResponse,
            MessageContent::WorkerWarmupRequest(_) => MessageKind::WorkerWarmupRequest,
            MessageContent::WorkerWarmupResponse(_) => MessageKind::WorkerWarmupResponse,
            MessageContent::FunctionEnvironmentReloadRequest(_) => {
                MessageKind::FunctionEnvironmentReloadRequest
            }
            MessageContent::FunctionEnvironmentReloadResponse(_) => {
                MessageKind::FunctionEnvironmentReloadResponse
            }
            MessageContent::InvocationRequest(_) => MessageKind::InvocationRequest,
            MessageContent::InvocationResponse(_) => MessageKind::InvocationResponse,
            MessageContent::Opaque(_) => MessageKind::Opaque,
        }
    }
}

impl MessageKind {
    /// Kinds the placeholder answers itself before specialization
    pub fn is_handshake(self) -> bool {
        matches!(
            self,
            MessageKind::WorkerInitRequest
                | MessageKind::FunctionsMetadataRequest
                | MessageKind::WorkerWarmupRequest
                | MessageKind::FunctionEnvironmentReloadRequest
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
