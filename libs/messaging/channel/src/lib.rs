//! # Dual Message Channel
//!
//! Two unbounded FIFO queues shared by everything that talks to the host or to
//! the customer payload:
//!
//! ```text
//!            send_inbound ──► [ inbound  ] ──► payload forwarder
//! host reader / coordinator
//!            send_outbound ─► [ outbound ] ──► host writer
//!                     ▲
//!              payload bridge
//! ```
//!
//! Any number of producers may enqueue; each direction has exactly one consumer,
//! handed out once as a [`MessageStream`]. Messages come out in the single
//! global order they were enqueued in, each exactly once. Enqueue never blocks.
//!
//! A [`DualChannel`] is constructed once at startup and shared by `Arc`; there
//! is no process-wide instance.

pub mod error;
pub mod stream;

pub use error::ChannelError;
pub use stream::MessageStream;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};
use types::StreamingMessage;

/// Direction of a queue, used in errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the customer payload
    Inbound,
    /// Towards the host
    Outbound,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

/// One direction: the producer handle plus the not-yet-taken consumer
#[derive(Debug)]
struct Queue {
    direction: Direction,
    sender: Mutex<Option<UnboundedSender<StreamingMessage>>>,
    receiver: Mutex<Option<UnboundedReceiver<StreamingMessage>>>,
    enqueued: AtomicU64,
}

impl Queue {
    fn new(direction: Direction) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            direction,
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            enqueued: AtomicU64::new(0),
        }
    }

    fn send(&self, message: StreamingMessage) -> Result<(), ChannelError> {
        let guard = self.sender.lock();
        let delivered = match guard.as_ref() {
            // The receiver only goes away once its stream is dropped
            Some(sender) => sender.send(message).map_err(|rejected| rejected.0),
            None => Err(message),
        };

        match delivered {
            Ok(()) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(message) => {
                warn!(
                    direction = %self.direction,
                    kind = %message.kind(),
                    request_id = %message.request_id,
                    "queue closed, dropping message"
                );
                Err(ChannelError::Closed(self.direction))
            }
        }
    }

    fn take(&self) -> Result<MessageStream, ChannelError> {
        self.receiver
            .lock()
            .take()
            .map(|rx| MessageStream::new(self.direction, rx))
            .ok_or(ChannelError::AlreadyTaken(self.direction))
    }

    fn restore(&self, stream: MessageStream) -> Result<(), ChannelError> {
        if stream.direction() != self.direction {
            return Err(ChannelError::WrongDirection(stream.direction()));
        }
        let mut slot = self.receiver.lock();
        if slot.is_some() {
            return Err(ChannelError::NotTaken(self.direction));
        }
        *slot = Some(stream.into_receiver());
        debug!(direction = %self.direction, "consumer handed back");
        Ok(())
    }

    fn close(&self) {
        if self.sender.lock().take().is_some() {
            debug!(direction = %self.direction, "queue closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// Enqueue counters for both directions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub inbound_enqueued: u64,
    pub outbound_enqueued: u64,
}

/// Inbound (to payload) and outbound (to host) message queues
#[derive(Debug)]
pub struct DualChannel {
    inbound: Queue,
    outbound: Queue,
}

impl Default for DualChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DualChannel {
    pub fn new() -> Self {
        Self {
            inbound: Queue::new(Direction::Inbound),
            outbound: Queue::new(Direction::Outbound),
        }
    }

    /// Queue a message for the customer payload
    pub fn send_inbound(&self, message: StreamingMessage) -> Result<(), ChannelError> {
        self.inbound.send(message)
    }

    /// Queue a message for the host
    pub fn send_outbound(&self, message: StreamingMessage) -> Result<(), ChannelError> {
        self.outbound.send(message)
    }

    /// Take the single inbound consumer
    pub fn take_inbound(&self) -> Result<MessageStream, ChannelError> {
        self.inbound.take()
    }

    /// Take the single outbound consumer
    pub fn take_outbound(&self) -> Result<MessageStream, ChannelError> {
        self.outbound.take()
    }

    /// Hand the inbound consumer back so a later [`take_inbound`](Self::take_inbound)
    /// resumes where this one stopped
    pub fn restore_inbound(&self, stream: MessageStream) -> Result<(), ChannelError> {
        self.inbound.restore(stream)
    }

    /// Stop accepting inbound messages; queued ones are still delivered
    pub fn close_inbound(&self) {
        self.inbound.close();
    }

    /// Stop accepting outbound messages; queued ones are still delivered
    pub fn close_outbound(&self) {
        self.outbound.close();
    }

    pub fn close(&self) {
        self.close_inbound();
        self.close_outbound();
    }

    pub fn is_closed(&self, direction: Direction) -> bool {
        match direction {
            Direction::Inbound => self.inbound.is_closed(),
            Direction::Outbound => self.outbound.is_closed(),
        }
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            inbound_enqueued: self.inbound.enqueued.load(Ordering::Relaxed),
            outbound_enqueued: self.outbound.enqueued.load(Ordering::Relaxed),
        }
    }
}
