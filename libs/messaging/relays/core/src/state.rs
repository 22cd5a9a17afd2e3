//! # Worker State Gate
//!
//! Owns the only mutable shared state of the worker core:
//!
//! - `specialized`: a one-way flag, written with `Release` and read with
//!   `Acquire`. Once a reader observes `true`, every message pushed to inbound
//!   by the completed attempt is already there.
//! - the phase gate, which admits at most one specialization attempt:
//!
//! ```text
//! Placeholder ──reload──► Specializing { attempt, held } ──ok──► Specialized
//!      ▲                              │
//!      └────────────failed────────────┘
//! ```
//!
//! The gate lock is held only for the admission decision and for the final
//! flush, never across an await, so the reader loop is never blocked by an
//! attempt in flight.

use crate::error::SpecializationError;
use crate::signal::{AttemptToken, LoadSignal};
use message_channel::DualChannel;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use types::{MessageKind, StreamingMessage};

#[derive(Debug)]
enum Phase {
    Placeholder,
    Specializing {
        attempt: AttemptToken,
        /// Messages that arrived during the attempt, in arrival order
        held: Vec<StreamingMessage>,
    },
    Specialized,
}

/// What the reader loop should do with a message after admission
#[derive(Debug)]
pub enum Admission {
    /// Already pushed to inbound
    Forwarded,
    /// Parked until the attempt in flight finishes
    Held,
    /// A handshake request for the responder
    Respond(StreamingMessage),
    /// The reload request that opened a new attempt
    Specialize(AttemptTicket, StreamingMessage),
    /// A reload request refused at the gate
    Rejected(StreamingMessage, SpecializationError),
}

/// Exclusive right to run one specialization attempt
///
/// Only [`WorkerState`] creates tickets, and each is consumed by completing or
/// abandoning its attempt.
#[derive(Debug)]
#[must_use]
pub struct AttemptTicket {
    attempt: AttemptToken,
}

impl AttemptTicket {
    pub fn attempt(&self) -> AttemptToken {
        self.attempt
    }
}

#[derive(Debug)]
pub struct WorkerState {
    specialized: AtomicBool,
    phase: Mutex<Phase>,
}

impl WorkerState {
    pub fn new() -> Self {
        Self {
            specialized: AtomicBool::new(false),
            phase: Mutex::new(Phase::Placeholder),
        }
    }

    pub fn is_specialized(&self) -> bool {
        self.specialized.load(Ordering::Acquire)
    }

    pub fn is_specializing(&self) -> bool {
        matches!(*self.phase.lock(), Phase::Specializing { .. })
    }

    /// Route one host message, in read order
    pub fn admit(
        &self,
        message: StreamingMessage,
        channel: &DualChannel,
        signal: &LoadSignal,
    ) -> Admission {
        if self.is_specialized() {
            forward(channel, message);
            return Admission::Forwarded;
        }

        let kind = message.kind();
        let mut phase = self.phase.lock();
        if let Phase::Specializing { attempt, held } = &mut *phase {
            return if kind == MessageKind::FunctionEnvironmentReloadRequest {
                debug!(%attempt, request_id = %message.request_id, "Rejecting concurrent reload request");
                Admission::Rejected(message, SpecializationError::AlreadySpecializing)
            } else if kind.is_handshake() {
                Admission::Respond(message)
            } else {
                held.push(message);
                Admission::Held
            };
        }

        if matches!(*phase, Phase::Specialized) || !kind.is_handshake() {
            forward(channel, message);
            return Admission::Forwarded;
        }

        if kind != MessageKind::FunctionEnvironmentReloadRequest {
            return Admission::Respond(message);
        }

        let attempt = signal.issue();
        *phase = Phase::Specializing {
            attempt,
            held: Vec::new(),
        };
        info!(%attempt, request_id = %message.request_id, "Specialization attempt admitted");
        Admission::Specialize(AttemptTicket { attempt }, message)
    }

    /// Open an attempt outside the reader loop
    pub fn try_begin(&self, signal: &LoadSignal) -> Result<AttemptTicket, SpecializationError> {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Specializing { .. } => return Err(SpecializationError::AlreadySpecializing),
            Phase::Specialized => return Err(SpecializationError::AlreadySpecialized),
            Phase::Placeholder => {}
        }

        let attempt = signal.issue();
        *phase = Phase::Specializing {
            attempt,
            held: Vec::new(),
        };
        Ok(AttemptTicket { attempt })
    }

    /// Finish a successful attempt: trigger first, then everything held, then the flip
    pub(crate) fn complete(
        &self,
        ticket: AttemptTicket,
        trigger: StreamingMessage,
        channel: &DualChannel,
    ) {
        let mut phase = self.phase.lock();
        let held = match std::mem::replace(&mut *phase, Phase::Specialized) {
            Phase::Specializing { attempt, held } if attempt == ticket.attempt => held,
            other => {
                warn!(attempt = %ticket.attempt, phase = ?other, "Completing an attempt the gate does not hold");
                *phase = other;
                return;
            }
        };

        forward(channel, trigger);
        let released = held.len();
        for message in held {
            forward(channel, message);
        }
        self.specialized.store(true, Ordering::Release);
        info!(attempt = %ticket.attempt, released, "✅ Worker specialized");
    }

    /// Give up an attempt: held messages go to inbound and the gate reopens
    pub(crate) fn abandon(&self, ticket: AttemptTicket, channel: &DualChannel) {
        let mut phase = self.phase.lock();
        let held = match std::mem::replace(&mut *phase, Phase::Placeholder) {
            Phase::Specializing { attempt, held } if attempt == ticket.attempt => held,
            other => {
                warn!(attempt = %ticket.attempt, phase = ?other, "Abandoning an attempt the gate does not hold");
                *phase = other;
                return;
            }
        };

        for message in held {
            forward(channel, message);
        }
        debug!(attempt = %ticket.attempt, "Gate reopened after failed attempt");
    }
}

impl Default for WorkerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Push to inbound; a closed queue logs the drop itself
fn forward(channel: &DualChannel, message: StreamingMessage) {
    let _ = channel.send_inbound(message);
}
