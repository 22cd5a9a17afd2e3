//! # Net Host
//!
//! The worker host process the functions host starts ahead of time, before
//! it knows which application will run. It connects to the host, answers the
//! worker handshake as a placeholder, and on the environment reload request
//! hands the process over to the customer application.
//!
//! ## Architecture Role
//!
//! ```text
//!   functions host ◄──TCP frames──► HostTransport ─┐
//!                                                  │ StreamPump (relay-core)
//!   customer payload ◄──Unix frames──► PayloadBridge ┘
//!          ▲
//!          └── ProcessLauncher (hand-off socket or child process)
//! ```
//!
//! [`HostEntrypoint`] wires the relay-core components to the concrete
//! collaborators in this crate.

pub mod cli;
pub mod environment;
pub mod host;
pub mod launcher;
pub mod logging;
pub mod payload;
pub mod preload;
pub mod transport;

pub use cli::Args;
pub use environment::ProcessEnvironment;
pub use host::HostEntrypoint;
pub use launcher::ProcessLauncher;
pub use payload::{PayloadBridge, PayloadFrame};
pub use preload::FilePreloader;
pub use transport::{FramedReader, FramedWriter};
