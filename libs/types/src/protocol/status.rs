//! Status and structured error payloads carried by responses

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Failure,
    Success,
    Cancelled,
}

/// Outcome attached to every response the worker sends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResult {
    pub status: Status,
    /// Free-form detail, empty on success
    pub result: String,
    pub exception: Option<RpcException>,
}

/// Error detail surfaced to the host on failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcException {
    pub message: String,
    pub source: String,
    pub stack_trace: String,
    pub type_name: String,
    pub is_user_exception: bool,
}

impl StatusResult {
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            result: String::new(),
            exception: None,
        }
    }

    pub fn failure(exception: RpcException) -> Self {
        Self {
            status: Status::Failure,
            result: exception.message.clone(),
            exception: Some(exception),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
