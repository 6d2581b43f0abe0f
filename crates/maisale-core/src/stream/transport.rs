//! Server side: events from a bounded channel onto a byte sink
//!
//! Generation pushes events into the channel; the writer drains it, flushing
//! and yielding after every event. A full channel makes generation wait for a
//! slow reader. A write failure drops the receiver, which the producer
//! observes as a failed send.

use super::StreamEvent;
use crate::error::Result;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

pub type EventSender = mpsc::Sender<StreamEvent>;
pub type EventReceiver = mpsc::Receiver<StreamEvent>;

/// Bounded channel between a turn and its writer
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Writes encoded events to an async sink
pub struct SseWriter<W> {
    writer: W,
    events_written: usize,
}

impl<W: AsyncWrite + Unpin> SseWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            events_written: 0,
        }
    }

    /// Write one event, flush it and let other tasks run
    pub async fn write_event(&mut self, event: &StreamEvent) -> Result<()> {
        self.writer.write_all(event.encode().as_bytes()).await?;
        self.writer.flush().await?;
        self.events_written += 1;
        tokio::task::yield_now().await;
        Ok(())
    }

    /// Drain the channel until every sender is gone. Returns events written.
    pub async fn pump(mut self, mut events: EventReceiver) -> Result<usize> {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.write_event(&event).await {
                tracing::warn!(
                    "Stream consumer went away after {} events: {}",
                    self.events_written,
                    e
                );
                events.close();
                return Err(e);
            }
        }
        let _ = self.writer.shutdown().await;
        Ok(self.events_written)
    }

    pub fn events_written(&self) -> usize {
        self.events_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
