//! # Payload Bridge
//!
//! Unix socket the loaded customer payload connects back to. The first frame
//! on a connection must be [`PayloadFrame::Loaded`] with the attempt token the
//! payload was started with; that completes the specialization wait. Tokens
//! other than the current attempt's are refused. After it, the bridge drains
//! inbound into the payload and relays the payload's messages to outbound, both
//! as [`PayloadFrame::Message`]. A payload that reconnects picks up inbound
//! where the previous connection stopped.

use async_trait::async_trait;
use codec::{read_frame, write_frame};
use message_channel::DualChannel;
use relay_core::{spawn_supervised, AttemptToken, LoadSignal, PayloadSink, PumpError, StreamPump};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use types::StreamingMessage;

/// Frame exchanged with the payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayloadFrame {
    Loaded { attempt: AttemptToken },
    Message(StreamingMessage),
}

/// Writes inbound messages to the payload connection
pub struct PayloadWriter<W> {
    inner: W,
}

impl<W> PayloadWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> PayloadSink for PayloadWriter<W> {
    async fn deliver(&mut self, message: StreamingMessage) -> Result<(), PumpError> {
        write_frame(&mut self.inner, &PayloadFrame::Message(message))
            .await
            .map_err(|e| PumpError::Transport(e.to_string()))
    }
}

pub struct PayloadBridge {
    channel: Arc<DualChannel>,
    signal: Arc<LoadSignal>,
    max_message_length: usize,
}

impl PayloadBridge {
    pub fn new(channel: Arc<DualChannel>, signal: Arc<LoadSignal>, max_message_length: usize) -> Self {
        Self {
            channel,
            signal,
            max_message_length,
        }
    }

    /// Bind the payload socket, replacing a stale one
    pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;
        info!("📡 Payload bridge listening on {}", path.display());
        Ok(listener)
    }

    /// Accept payload connections until the listener fails
    pub async fn serve(self: Arc<Self>, listener: UnixListener) -> Result<(), PumpError> {
        loop {
            let (stream, _) = listener.accept().await?;
            debug!("Payload connected");
            let bridge = self.clone();
            spawn_supervised("payload-connection", async move {
                bridge.handle_connection(stream).await
            });
        }
    }

    async fn handle_connection(&self, stream: UnixStream) -> Result<(), PumpError> {
        let (read_half, write_half) = stream.into_split();
        self.relay(read_half, write_half).await
    }

    /// Run one payload connection over any byte stream halves
    ///
    /// The connection must report the current attempt's token; only then does
    /// it take the inbound consumer, which goes back to the channel when the
    /// connection ends.
    pub async fn relay<R, W>(&self, mut reader: R, writer: W) -> Result<(), PumpError>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let attempt = match self.next_frame(&mut reader).await? {
            Some(PayloadFrame::Loaded { attempt }) => attempt,
            Some(PayloadFrame::Message(message)) => {
                return Err(PumpError::Transport(format!(
                    "payload sent {} before reporting loaded",
                    message.kind()
                )))
            }
            None => return Ok(()),
        };
        if !self.signal.is_current(attempt) {
            warn!(%attempt, current = ?self.signal.current(), "Payload reported a stale attempt");
            return Err(PumpError::Transport(format!(
                "{attempt} is not the current attempt"
            )));
        }

        let mut inbound = self.channel.take_inbound()?;
        info!(%attempt, "Payload loaded");

        let (disconnected, stop) = oneshot::channel::<()>();
        let channel = self.channel.clone();
        let forwarder = tokio::spawn(async move {
            let forwarded = StreamPump::drain_inbound(
                &mut inbound,
                PayloadWriter::new(writer),
                async move {
                    let _ = stop.await;
                },
            )
            .await;
            if let Err(e) = channel.restore_inbound(inbound) {
                error!(error = %e, "Inbound consumer lost");
            }
            forwarded
        });
        self.signal.notify_loaded(attempt);

        let relayed = self.relay_outbound(&mut reader).await;

        drop(disconnected);
        match forwarder.await {
            Ok(Ok(delivered)) => debug!(%attempt, delivered, "Inbound forwarding ended"),
            Ok(Err(e)) => warn!(%attempt, error = %e, "Inbound forwarding failed"),
            Err(e) => error!(%attempt, error = %e, "Inbound forwarder lost"),
        }
        info!(%attempt, "Payload disconnected");
        relayed
    }

    /// Relay payload messages to outbound until the payload closes the connection
    async fn relay_outbound<R: AsyncRead + Unpin + Send>(
        &self,
        reader: &mut R,
    ) -> Result<(), PumpError> {
        while let Some(frame) = self.next_frame(reader).await? {
            match frame {
                PayloadFrame::Message(message) => {
                    // A closed outbound queue logs the drop itself
                    let _ = self.channel.send_outbound(message);
                }
                PayloadFrame::Loaded { attempt } => {
                    warn!(%attempt, "Duplicate loaded report ignored");
                }
            }
        }
        Ok(())
    }

    async fn next_frame<R: AsyncRead + Unpin + Send>(
        &self,
        reader: &mut R,
    ) -> Result<Option<PayloadFrame>, PumpError> {
        read_frame(reader, self.max_message_length)
            .await
            .map_err(|e| PumpError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;
    use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
    use tokio_test::assert_ok;
    use types::{MessageContent, OpaqueMessage};

    fn custom(id: &str) -> StreamingMessage {
        StreamingMessage::new(
            id,
            MessageContent::Opaque(OpaqueMessage {
                kind: "Custom".to_string(),
                payload: Vec::new(),
            }),
        )
    }

    #[tokio::test]
    async fn test_loaded_frame_notifies_and_starts_forwarding() {
        let channel = Arc::new(DualChannel::new());
        let signal = Arc::new(LoadSignal::new());
        let attempt = signal.issue();
        let bridge = Arc::new(PayloadBridge::new(channel.clone(), signal.clone(), 1 << 20));

        let (payload_side, bridge_side) = tokio::io::duplex(64 * 1024);
        let (bridge_read, bridge_write) = tokio::io::split(bridge_side);
        let (mut payload_read, mut payload_write) = tokio::io::split(payload_side);

        channel.send_inbound(custom("queued")).unwrap();
        let relay = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.relay(bridge_read, bridge_write).await })
        };

        write_frame(&mut payload_write, &PayloadFrame::Loaded { attempt })
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), signal.wait(attempt))
            .await
            .expect("loaded signal");

        let delivered: Option<PayloadFrame> = read_frame(&mut payload_read, 1 << 20).await.unwrap();
        assert_eq!(delivered, Some(PayloadFrame::Message(custom("queued"))));

        let mut outbound = channel.take_outbound().unwrap();
        write_frame(&mut payload_write, &PayloadFrame::Message(custom("reply")))
            .await
            .unwrap();
        assert_eq!(outbound.recv().await, Some(custom("reply")));

        payload_write.shutdown().await.unwrap();
        relay.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_message_before_loaded_is_rejected() {
        let channel = Arc::new(DualChannel::new());
        let signal = Arc::new(LoadSignal::new());
        let bridge = PayloadBridge::new(channel, signal, 1 << 20);

        let (mut payload_side, bridge_side) = tokio::io::duplex(4096);
        let (bridge_read, bridge_write) = tokio::io::split(bridge_side);
        write_frame(&mut payload_side, &PayloadFrame::Message(custom("early")))
            .await
            .unwrap();

        assert!(matches!(
            bridge.relay(bridge_read, bridge_write).await,
            Err(PumpError::Transport(_))
        ));
    }

    struct PayloadEnd {
        read: ReadHalf<DuplexStream>,
        write: WriteHalf<DuplexStream>,
        relay: tokio::task::JoinHandle<Result<(), PumpError>>,
    }

    async fn connect(bridge: &Arc<PayloadBridge>, attempt: AttemptToken) -> PayloadEnd {
        let (payload_side, bridge_side) = tokio::io::duplex(64 * 1024);
        let (bridge_read, bridge_write) = tokio::io::split(bridge_side);
        let (read, mut write) = tokio::io::split(payload_side);
        let relay = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.relay(bridge_read, bridge_write).await })
        };
        assert_ok!(write_frame(&mut write, &PayloadFrame::Loaded { attempt }).await);
        PayloadEnd { read, write, relay }
    }

    async fn next_delivery(end: &mut PayloadEnd) -> Option<PayloadFrame> {
        tokio::time::timeout(Duration::from_secs(1), read_frame(&mut end.read, 1 << 20))
            .await
            .expect("delivery in time")
            .unwrap()
    }

    #[tokio::test]
    async fn test_stale_attempt_cannot_take_inbound() {
        let channel = Arc::new(DualChannel::new());
        let signal = Arc::new(LoadSignal::new());
        let stale = signal.issue();
        let current = signal.issue();
        let bridge = Arc::new(PayloadBridge::new(channel.clone(), signal.clone(), 1 << 20));
        channel.send_inbound(custom("inv")).unwrap();

        let stale_end = connect(&bridge, stale).await;
        assert_matches!(stale_end.relay.await.unwrap(), Err(PumpError::Transport(_)));
        assert!(!signal.is_loaded(stale));

        let mut current_end = connect(&bridge, current).await;
        tokio::time::timeout(Duration::from_secs(1), signal.wait(current))
            .await
            .expect("loaded signal");
        assert_eq!(
            next_delivery(&mut current_end).await,
            Some(PayloadFrame::Message(custom("inv")))
        );

        current_end.write.shutdown().await.unwrap();
        assert_ok!(current_end.relay.await.unwrap());
    }

    #[tokio::test]
    async fn test_retired_attempt_is_refused() {
        let channel = Arc::new(DualChannel::new());
        let signal = Arc::new(LoadSignal::new());
        let failed = signal.issue();
        signal.retire(failed);
        let bridge = Arc::new(PayloadBridge::new(channel.clone(), signal.clone(), 1 << 20));

        let end = connect(&bridge, failed).await;
        assert_matches!(end.relay.await.unwrap(), Err(PumpError::Transport(_)));
        assert_ok!(channel.take_inbound());
    }

    #[tokio::test]
    async fn test_reconnected_payload_resumes_inbound() {
        let channel = Arc::new(DualChannel::new());
        let signal = Arc::new(LoadSignal::new());
        let attempt = signal.issue();
        let bridge = Arc::new(PayloadBridge::new(channel.clone(), signal.clone(), 1 << 20));

        channel.send_inbound(custom("a")).unwrap();
        let mut first = connect(&bridge, attempt).await;
        assert_eq!(
            next_delivery(&mut first).await,
            Some(PayloadFrame::Message(custom("a")))
        );
        first.write.shutdown().await.unwrap();
        assert_ok!(first.relay.await.unwrap());

        channel.send_inbound(custom("b")).unwrap();
        let mut second = connect(&bridge, attempt).await;
        assert_eq!(
            next_delivery(&mut second).await,
            Some(PayloadFrame::Message(custom("b")))
        );
        second.write.shutdown().await.unwrap();
        assert_ok!(second.relay.await.unwrap());
    }
}
