//! Outbound message transmission.
//!
//! The gateway treats the facility that actually delivers a text message as
//! an opaque capability: it either succeeds or fails. Implementations must be
//! safe to call from many connection tasks at once.

use std::{
    path::PathBuf,
    process::Stdio,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::metrics::{self, SendOutcome};

/// Reasons a message could not be sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransmitError {
    /// The capability precondition is not met.
    #[error("permission to send messages has not been granted")]
    PermissionDenied,
    /// The platform accepted the call but reported a failure.
    #[error("transmission failed: {0}")]
    Platform(String),
}

/// Capability that delivers a message body to a recipient.
#[async_trait]
pub trait MessageTransmitter: Send + Sync {
    /// Whether the transmitter is currently allowed to send.
    fn permitted(&self) -> bool { true }

    /// Deliver `body` to `recipient`.
    async fn transmit(&self, recipient: &str, body: &str) -> Result<(), TransmitError>;
}

/// Send a message through `transmitter`, checking its permission first.
///
/// Failures are logged here and reported as values; callers decide how to
/// surface them.
///
/// # Errors
///
/// Returns [`TransmitError::PermissionDenied`] when the precondition is not
/// met, or whatever [`MessageTransmitter::transmit`] reports.
pub async fn send_message(
    transmitter: &dyn MessageTransmitter,
    recipient: &str,
    body: &str,
    message_id: &str,
) -> Result<(), TransmitError> {
    if !transmitter.permitted() {
        tracing::error!(message_id, "message permission not granted");
        return Err(TransmitError::PermissionDenied);
    }
    match transmitter.transmit(recipient, body).await {
        Ok(()) => {
            tracing::debug!(message_id, recipient, chars = body.chars().count(), "message sent");
            metrics::inc_sends(SendOutcome::Sent);
            Ok(())
        }
        Err(e) => {
            tracing::error!(message_id, recipient, error = %e, "error sending message");
            metrics::inc_sends(SendOutcome::Failed);
            Err(e)
        }
    }
}

/// A message accepted by [`LogTransmitter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub body: String,
}

/// Dry-run transmitter that logs and records every message.
///
/// Useful when no phone stack is attached, and as a test double.
#[derive(Debug)]
pub struct LogTransmitter {
    permitted: bool,
    sent: Mutex<Vec<SentMessage>>,
}

impl Default for LogTransmitter {
    fn default() -> Self {
        Self {
            permitted: true,
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl LogTransmitter {
    /// A transmitter whose permission precondition always fails.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            permitted: false,
            ..Self::default()
        }
    }

    /// Messages accepted so far, in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MessageTransmitter for LogTransmitter {
    fn permitted(&self) -> bool { self.permitted }

    async fn transmit(&self, recipient: &str, body: &str) -> Result<(), TransmitError> {
        tracing::info!(recipient, body, "dry-run send");
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                recipient: recipient.to_owned(),
                body: body.to_owned(),
            });
        Ok(())
    }
}

/// Transmitter that hands each message to an external program.
///
/// The program is invoked as `program [args..] <recipient> <body>` and the
/// send counts as successful when it exits with status zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandTransmitter {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTransmitter {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a whitespace-separated command line such as
    /// `"gammu sendsms TEXT"`. Returns `None` for a blank command line.
    #[must_use]
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let program = words.next()?;
        Some(Self::new(program, words.map(str::to_owned).collect()))
    }

    #[must_use]
    pub fn program(&self) -> &std::path::Path { &self.program }

    #[must_use]
    pub fn args(&self) -> &[String] { &self.args }
}

#[async_trait]
impl MessageTransmitter for CommandTransmitter {
    async fn transmit(&self, recipient: &str, body: &str) -> Result<(), TransmitError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(recipient)
            .arg(body)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                TransmitError::Platform(format!("failed to run {}: {e}", self.program.display()))
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(TransmitError::Platform(format!(
                "{} exited with {status}",
                self.program.display()
            )))
        }
    }
}
