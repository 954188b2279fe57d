//! Storage sinks for reassembled messages.
//!
//! Persistence is outside the gateway's concern; a sink only has to accept a
//! message or report why it could not. Callers log failures and move on.

use std::{io, path::Path};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use super::ReceivedMessage;

/// Failure to store a message.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write message: {0}")]
    Io(#[from] io::Error),
}

/// Destination for reassembled inbound messages.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Store one message.
    async fn store(&self, message: &ReceivedMessage) -> Result<(), SinkError>;
}

/// Sink that only emits a structured log line per message.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl MessageSink for LogSink {
    async fn store(&self, message: &ReceivedMessage) -> Result<(), SinkError> {
        tracing::info!(
            sender = %message.sender,
            timestamp = message.timestamp,
            sim_slot = message.sim_slot,
            chars = message.body.chars().count(),
            "received message"
        );
        Ok(())
    }
}

/// Sink appending one JSON object per line to a writer.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W { self.writer.into_inner() }
}

impl JsonLinesSink<File> {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns any error raised while opening the file.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::new(file))
    }
}

#[async_trait]
impl<W> MessageSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn store(&self, message: &ReceivedMessage) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}
