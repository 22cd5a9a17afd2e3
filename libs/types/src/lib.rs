//! # Worker Host Types Library
//!
//! Message model for the bidirectional streaming session between the function
//! host and this worker process.
//!
//! ## Design Philosophy
//!
//! - **Closed message set**: every host message is a [`MessageContent`] variant;
//!   kinds the worker does not interpret travel as [`MessageContent::Opaque`]
//! - **Immutable once built**: messages are plain data, cloned or moved but never
//!   patched in place after construction
//! - **Transport agnostic**: serde derives only, framing lives in `codec`
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{MessageContent, MessageKind, StreamingMessage, WorkerInitRequest};
//!
//! let msg = StreamingMessage::new(
//!     "req-1",
//!     MessageContent::WorkerInitRequest(WorkerInitRequest::default()),
//! );
//! assert_eq!(msg.kind(), MessageKind::WorkerInitRequest);
//! ```

pub mod protocol;

pub use protocol::*;
