//! # Stream Pump
//!
//! The loops that move messages between the host stream, the [`DualChannel`]
//! and the customer payload for the lifetime of a connection:
//!
//! - **reader**: reads host messages one at a time, routes each through the
//!   worker state gate in read order, and dispatches handshake handling as
//!   supervised tasks so a slow specialization never stalls reading
//! - **writer**: drains outbound to the host in enqueue order until outbound
//!   closes
//! - **inbound forwarder**: drains inbound into the payload in enqueue order
//!
//! Transport types plug in through [`HostReader`], [`HostWriter`] and
//! [`PayloadSink`].

use crate::coordinator::SpecializationCoordinator;
use crate::error::PumpError;
use crate::responder::{Decision, ProtocolResponder};
use crate::state::{Admission, AttemptTicket};
use crate::supervisor::{spawn_supervised, TaskOutcome};
use async_trait::async_trait;
use futures::{future, StreamExt};
use message_channel::{DualChannel, MessageStream};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use types::{MessageContent, StreamingMessage};

/// Source of host messages; `Ok(None)` is the end of the stream
#[async_trait]
pub trait HostReader: Send {
    async fn read_message(&mut self) -> Result<Option<StreamingMessage>, PumpError>;
}

/// Sink for messages to the host
#[async_trait]
pub trait HostWriter: Send {
    async fn write_message(&mut self, message: StreamingMessage) -> Result<(), PumpError>;
}

/// Sink for messages to the loaded customer payload
#[async_trait]
pub trait PayloadSink: Send {
    async fn deliver(&mut self, message: StreamingMessage) -> Result<(), PumpError>;
}

pub struct StreamPump {
    channel: Arc<DualChannel>,
    coordinator: Arc<SpecializationCoordinator>,
    responder: Arc<ProtocolResponder>,
    dispatched: AtomicU64,
    cold_start_logged: AtomicBool,
}

impl StreamPump {
    pub fn new(
        coordinator: Arc<SpecializationCoordinator>,
        responder: Arc<ProtocolResponder>,
    ) -> Self {
        Self {
            channel: coordinator.channel().clone(),
            coordinator,
            responder,
            dispatched: AtomicU64::new(0),
            cold_start_logged: AtomicBool::new(false),
        }
    }

    pub fn coordinator(&self) -> &Arc<SpecializationCoordinator> {
        &self.coordinator
    }

    /// Number of messages handed to supervised handler tasks so far
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Run reader and writer until the host stream ends, then drain outbound
    pub async fn run<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<(), PumpError>
    where
        R: HostReader,
        W: HostWriter + 'static,
    {
        let writer_task = {
            let pump = self.clone();
            spawn_supervised("host-writer", async move {
                pump.run_writer(writer).await.map(|_| ())
            })
        };

        let read = self.run_reader(reader).await;
        self.channel.close_outbound();

        match writer_task.await {
            Ok(TaskOutcome::Completed) => {}
            Ok(outcome) => warn!(?outcome, "Host writer stopped early"),
            Err(e) => warn!(error = %e, "Host writer task lost"),
        }
        read.map(|_| ())
    }

    /// Read until the host stream ends; returns the number of messages read
    pub async fn run_reader<R: HostReader>(self: &Arc<Self>, mut reader: R) -> Result<u64, PumpError> {
        let mut read = 0u64;
        while let Some(message) = reader.read_message().await? {
            read += 1;
            self.note_cold_start(&message);

            match self.coordinator.admit(message) {
                Admission::Forwarded | Admission::Held => {}
                Admission::Respond(message) => {
                    self.dispatch(message, None);
                }
                Admission::Specialize(ticket, message) => {
                    self.dispatch(message, Some(ticket));
                }
                Admission::Rejected(message, error) => {
                    let response =
                        ProtocolResponder::reload_response(message.request_id.clone(), Err(&error));
                    if let Err(e) = self.channel.send_outbound(response) {
                        warn!(error = %e, request_id = %message.request_id, "Could not answer rejected reload");
                    }
                }
            }
        }

        info!(messages = read, "Host stream ended");
        Ok(read)
    }

    /// Write outbound messages to the host until outbound closes
    pub async fn run_writer<W: HostWriter>(&self, mut writer: W) -> Result<u64, PumpError> {
        let mut outbound = self.channel.take_outbound()?;
        let mut written = 0u64;
        while let Some(message) = outbound.next().await {
            writer.write_message(message).await?;
            written += 1;
        }
        debug!(messages = written, "Outbound closed");
        Ok(written)
    }

    /// Deliver inbound messages to the payload until inbound closes
    pub async fn forward_inbound<S: PayloadSink>(
        channel: &DualChannel,
        sink: S,
    ) -> Result<u64, PumpError> {
        let mut inbound = channel.take_inbound()?;
        let forwarded = Self::drain_inbound(&mut inbound, sink, future::pending::<()>()).await;
        channel.restore_inbound(inbound)?;
        forwarded
    }

    /// Deliver from an already taken inbound consumer until inbound closes or
    /// `stop` resolves
    ///
    /// Messages still queued when `stop` resolves stay in `inbound` for the
    /// next consumer. A message the sink fails to take is lost.
    pub async fn drain_inbound<S, F>(
        inbound: &mut MessageStream,
        mut sink: S,
        stop: F,
    ) -> Result<u64, PumpError>
    where
        S: PayloadSink,
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);
        let mut delivered = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = &mut stop => {
                    debug!(messages = delivered, "Inbound forwarding stopped");
                    return Ok(delivered);
                }
                next = inbound.next() => next,
            };
            let Some(message) = next else {
                debug!(messages = delivered, "Inbound closed");
                return Ok(delivered);
            };
            if let Err(e) = sink.deliver(message).await {
                warn!(error = %e, "Payload did not take an inbound message");
                return Err(e);
            }
            delivered += 1;
        }
    }

    /// Hand one admitted message to a supervised handler task
    pub fn dispatch(
        self: &Arc<Self>,
        message: StreamingMessage,
        ticket: Option<AttemptTicket>,
    ) -> JoinHandle<TaskOutcome> {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let name = format!("{} {}", message.kind(), message.request_id);
        let pump = self.clone();
        spawn_supervised(name, async move { pump.handle(message, ticket).await })
    }

    async fn handle(
        &self,
        message: StreamingMessage,
        ticket: Option<AttemptTicket>,
    ) -> Result<(), PumpError> {
        match self.responder.handle_admitted(message).await {
            Decision::RespondImmediately(response) => {
                self.release_unused(ticket);
                self.channel.send_outbound(response)?;
            }
            Decision::Forward(message) => {
                self.release_unused(ticket);
                self.channel.send_inbound(message)?;
            }
            Decision::RespondAndAwaitSpecialization(request) => {
                let request_id = request.request_id().to_string();
                let outcome = match ticket {
                    Some(ticket) => self.coordinator.run(ticket, request).await,
                    None => self.coordinator.specialize(request).await,
                };
                let response =
                    ProtocolResponder::reload_response(request_id, outcome.as_ref().map(|_| ()));
                self.channel.send_outbound(response)?;
            }
        }
        Ok(())
    }

    fn release_unused(&self, ticket: Option<AttemptTicket>) {
        if let Some(ticket) = ticket {
            warn!(attempt = %ticket.attempt(), "Admitted attempt was not run");
            self.coordinator.abandon(ticket);
        }
    }

    fn note_cold_start(&self, message: &StreamingMessage) {
        if let MessageContent::InvocationRequest(invocation) = &message.content {
            if self.coordinator.state().is_specialized()
                && !self.cold_start_logged.swap(true, Ordering::Relaxed)
            {
                info!(
                    invocation_id = %invocation.invocation_id,
                    function_id = %invocation.function_id,
                    "❄️ First invocation after specialization"
                );
            }
        }
    }
}
