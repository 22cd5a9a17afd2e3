//! Service defaults
//!
//! Default values used when neither the settings file nor the environment
//! provides one.

/// Host connection defaults
pub mod host {
    pub const HOST: &str = "127.0.0.1";

    pub const PORT: u16 = 0;

    /// Largest frame accepted from the host or the payload
    pub const MAX_MESSAGE_LENGTH: usize = i32::MAX as usize;
}

/// Payload bridge and hand-off defaults
pub mod payload {
    /// Socket the loaded payload connects back to
    pub const PAYLOAD_SOCKET: &str = "/tmp/functions-nethost/payload.sock";

    /// Socket a pre-started placeholder app listens on for the hand-off record
    pub const HANDOFF_SOCKET: &str = "/tmp/functions-nethost/handoff.sock";
}

/// Pre-warm defaults
pub mod prewarm {
    /// Chunk size used to page files in; matches the common OS page size
    pub const READ_CHUNK_BYTES: usize = 4 * 1024;
}
