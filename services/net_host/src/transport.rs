//! # Host Transport
//!
//! Frames [`StreamingMessage`]s over the host connection with the workspace
//! codec, and adapts both halves to the pump's [`HostReader`] and
//! [`HostWriter`] seams.

use anyhow::{Context, Result};
use async_trait::async_trait;
use codec::{read_frame, write_frame};
use relay_core::{HostReader, HostWriter, PumpError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::info;
use types::{MessageContent, StartStream, StreamingMessage};
use worker_config::HostSettings;

/// Reads frames until the peer closes
pub struct FramedReader<R> {
    inner: R,
    max_len: usize,
}

impl<R> FramedReader<R> {
    pub fn new(inner: R, max_len: usize) -> Self {
        Self { inner, max_len }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> HostReader for FramedReader<R> {
    async fn read_message(&mut self) -> Result<Option<StreamingMessage>, PumpError> {
        read_frame(&mut self.inner, self.max_len)
            .await
            .map_err(|e| PumpError::Transport(e.to_string()))
    }
}

pub struct FramedWriter<W> {
    inner: W,
}

impl<W> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> HostWriter for FramedWriter<W> {
    async fn write_message(&mut self, message: StreamingMessage) -> Result<(), PumpError> {
        write_frame(&mut self.inner, &message)
            .await
            .map_err(|e| PumpError::Transport(e.to_string()))
    }
}

/// Connect to the host and announce this worker
///
/// `StartStream` is written before the halves are handed to the pump, so it is
/// always the first message the host sees.
pub async fn connect(
    settings: &HostSettings,
) -> Result<(FramedReader<OwnedReadHalf>, FramedWriter<OwnedWriteHalf>)> {
    let stream = TcpStream::connect((settings.host.as_str(), settings.port))
        .await
        .with_context(|| format!("Failed to connect to host at {}", settings.endpoint()))?;
    stream.set_nodelay(true)?;
    let (read_half, write_half) = stream.into_split();

    let mut writer = FramedWriter::new(write_half);
    let start = StreamingMessage::new(
        settings.request_id.clone(),
        MessageContent::StartStream(StartStream {
            worker_id: settings.worker_id.clone(),
        }),
    );
    writer
        .write_message(start)
        .await
        .context("Failed to send start stream message")?;
    info!(endpoint = %settings.endpoint(), worker_id = %settings.worker_id, "📡 Connected to host");

    Ok((FramedReader::new(read_half, settings.max_message_length), writer))
}
