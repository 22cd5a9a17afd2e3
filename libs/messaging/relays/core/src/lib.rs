//! # Placeholder Worker Core
//!
//! Everything a pre-started worker process needs to sit in front of the host
//! stream before it knows which application it will run, and to become that
//! application exactly once.
//!
//! ## Architecture Role
//!
//! ```text
//! host stream ──► StreamPump::run_reader ──► WorkerState::admit
//!                                              │
//!                 ┌────────────────────────────┼──────────────────────┐
//!                 ▼                            ▼                      ▼
//!          forward / hold            ProtocolResponder       SpecializationCoordinator
//!                 │                   (init, metadata,        (resolve → hand off →
//!                 ▼                    warmup answers)          await load signal)
//!          DualChannel.inbound ◄──────────────────────────────────────┘
//!                                              │
//! host stream ◄── StreamPump::run_writer ◄── DualChannel.outbound
//! ```
//!
//! ## Components
//! - [`WorkerState`]: the one-way `specialized` flag and the gate that admits at
//!   most one specialization attempt at a time
//! - [`LoadSignal`]: per-attempt "payload loaded" notification
//! - [`ProtocolResponder`]: answers the handshake kinds while still a placeholder
//! - [`SpecializationCoordinator`]: runs one attempt end to end
//! - [`StreamPump`]: reader, writer and inbound forwarding loops
//! - [`spawn_supervised`]: task spawn that reports failures and panics
//!
//! External effects (process environment, worker configuration lookup, payload
//! start-up, pre-warming) are reached only through the traits in
//! [`collaborators`] and [`worker_config::WorkerConfigSource`].

pub mod collaborators;
pub mod coordinator;
pub mod error;
pub mod pump;
pub mod responder;
pub mod signal;
pub mod state;
pub mod supervisor;

pub use collaborators::{Collaborators, EnvironmentMutator, Handoff, PayloadLauncher, PreWarmer};
pub use coordinator::{
    CoordinatorConfig, HandoffMode, SpecializationCoordinator, SpecializationRequest,
    SpecializationStage,
};
pub use error::{LaunchError, PumpError, SpecializationError};
pub use pump::{HostReader, HostWriter, PayloadSink, StreamPump};
pub use responder::{Decision, ProtocolResponder};
pub use signal::{AttemptToken, LoadSignal};
pub use state::{Admission, AttemptTicket, WorkerState};
pub use supervisor::{spawn_supervised, TaskOutcome};
