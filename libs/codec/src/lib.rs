//! # Frame Codec
//!
//! Every socket the worker host speaks over (the host session and the payload
//! bridge) carries the same framing:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ len: u32 BE  │ bincode payload (len bytes)  │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! The codec is generic over any serde type so the payload bridge can frame its
//! own control envelope with the same rules as host messages.
//!
//! ## What This Crate Does NOT Contain
//! - Socket setup or connection handling (belongs in the service)
//! - Message semantics (belongs in `types` and `relay-core`)

pub mod error;
pub mod frame;

pub use error::{CodecError, CodecResult};
pub use frame::{decode_payload, encode_frame, read_frame, write_frame, FRAME_HEADER_LEN};
