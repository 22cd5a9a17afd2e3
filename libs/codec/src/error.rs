//! Frame codec errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode frame payload: {0}")]
    Encode(String),

    #[error("Failed to decode frame payload ({len} bytes): {reason}")]
    Decode { len: usize, reason: String },

    /// Declared length is above the negotiated maximum; nothing was allocated
    #[error("Frame too large: {len} bytes exceeds limit {limit}")]
    FrameTooLarge { len: usize, limit: usize },

    #[error("Stream ended inside a frame: expected {expected} bytes")]
    UnexpectedEof { expected: usize },
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;
