//! # Protocol Responder
//!
//! Answers the host's handshake while the worker is still a placeholder:
//!
//! | Request | Answer |
//! |---|---|
//! | `WorkerInitRequest` | success, both capability flags set |
//! | `FunctionsMetadataRequest` | success, host indexes functions itself |
//! | `WorkerWarmupRequest` | pre-warm, then success |
//! | `FunctionEnvironmentReloadRequest` | specialize, answer with the outcome |
//!
//! Anything else, and everything once the worker is specialized, is forwarded.

use crate::collaborators::PreWarmer;
use crate::coordinator::SpecializationRequest;
use crate::error::SpecializationError;
use crate::state::WorkerState;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use types::{
    FunctionEnvironmentReloadResponse, FunctionMetadataResponse, MessageContent, MessageKind,
    StatusResult, StreamingMessage, WorkerInitResponse, WorkerWarmupResponse,
    CAPABILITY_ENABLED, CAPABILITY_ENABLE_USER_CODE_EXCEPTION, CAPABILITY_HANDLES_WORKER_WARMUP,
    WORKER_VERSION,
};

/// What to do with a message handed to the responder
#[derive(Debug)]
pub enum Decision {
    /// Enqueue this response on outbound
    RespondImmediately(StreamingMessage),
    /// Push the message to inbound unchanged
    Forward(StreamingMessage),
    /// Run the attempt, then answer with its outcome
    RespondAndAwaitSpecialization(SpecializationRequest),
}

pub struct ProtocolResponder {
    pre_warmer: Arc<dyn PreWarmer>,
}

impl ProtocolResponder {
    pub fn new(pre_warmer: Arc<dyn PreWarmer>) -> Self {
        Self { pre_warmer }
    }

    pub async fn handle(&self, message: StreamingMessage, state: &WorkerState) -> Decision {
        if state.is_specialized() {
            return Decision::Forward(message);
        }
        self.handle_admitted(message).await
    }

    /// Decide for a message the state gate already handed to the responder
    ///
    /// The gate's routing is final: a request admitted while the worker was a
    /// placeholder is answered even if the worker has specialized since.
    pub async fn handle_admitted(&self, message: StreamingMessage) -> Decision {
        match message.kind() {
            MessageKind::WorkerInitRequest => {
                if let MessageContent::WorkerInitRequest(request) = &message.content {
                    info!(host_version = %request.host_version, "Worker init request received");
                }
                Decision::RespondImmediately(Self::init_response(&message))
            }
            MessageKind::FunctionsMetadataRequest => {
                Decision::RespondImmediately(Self::metadata_response(&message))
            }
            MessageKind::WorkerWarmupRequest => {
                debug!("Pre-warming");
                self.pre_warmer.pre_warm().await;
                Decision::RespondImmediately(Self::warmup_response(&message))
            }
            MessageKind::FunctionEnvironmentReloadRequest => {
                match SpecializationRequest::from_message(message) {
                    Ok(request) => Decision::RespondAndAwaitSpecialization(request),
                    Err(message) => Decision::Forward(message),
                }
            }
            _ => Decision::Forward(message),
        }
    }

    pub fn init_response(request: &StreamingMessage) -> StreamingMessage {
        let capabilities: HashMap<String, String> = [
            CAPABILITY_ENABLE_USER_CODE_EXCEPTION,
            CAPABILITY_HANDLES_WORKER_WARMUP,
        ]
        .into_iter()
        .map(|key| (key.to_string(), CAPABILITY_ENABLED.to_string()))
        .collect();

        request.reply(MessageContent::WorkerInitResponse(WorkerInitResponse {
            worker_version: WORKER_VERSION.to_string(),
            capabilities,
            result: StatusResult::success(),
        }))
    }

    pub fn metadata_response(request: &StreamingMessage) -> StreamingMessage {
        request.reply(MessageContent::FunctionMetadataResponse(
            FunctionMetadataResponse {
                use_default_metadata_indexing: true,
                result: StatusResult::success(),
            },
        ))
    }

    pub fn warmup_response(request: &StreamingMessage) -> StreamingMessage {
        request.reply(MessageContent::WorkerWarmupResponse(WorkerWarmupResponse {
            result: StatusResult::success(),
        }))
    }

    /// Reload response for `request_id`, failed with structured details on error
    pub fn reload_response(
        request_id: impl Into<String>,
        outcome: Result<(), &SpecializationError>,
    ) -> StreamingMessage {
        let result = match outcome {
            Ok(()) => StatusResult::success(),
            Err(e) => StatusResult::failure(e.to_rpc_exception()),
        };
        StreamingMessage::new(
            request_id,
            MessageContent::FunctionEnvironmentReloadResponse(FunctionEnvironmentReloadResponse {
                result,
            }),
        )
    }
}
