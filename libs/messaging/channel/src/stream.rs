//! Consumer side of a queue as a `futures::Stream`

use crate::Direction;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc::UnboundedReceiver;
use types::StreamingMessage;

/// Yields queued messages in enqueue order; ends after the queue is closed and drained
#[derive(Debug)]
pub struct MessageStream {
    direction: Direction,
    receiver: UnboundedReceiver<StreamingMessage>,
}

impl MessageStream {
    pub(crate) fn new(direction: Direction, receiver: UnboundedReceiver<StreamingMessage>) -> Self {
        Self {
            direction,
            receiver,
        }
    }

    pub(crate) fn into_receiver(self) -> UnboundedReceiver<StreamingMessage> {
        self.receiver
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Next message, or `None` once the queue is closed and empty
    pub async fn recv(&mut self) -> Option<StreamingMessage> {
        self.receiver.recv().await
    }
}

impl Stream for MessageStream {
    type Item = StreamingMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
