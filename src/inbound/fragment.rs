//! Fragment and message types for the inbound path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Sender recorded when the platform does not report an originating address.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// One physical message unit as reported by the platform.
///
/// Only `timestamp` is mandatory on the wire; every other field tolerates
/// absence because platforms report them on a best-effort basis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInboundFragment {
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Milliseconds since the epoch, or a monotonic reading.
    pub timestamp: i64,
    /// Position within a concatenated message, when known.
    #[serde(default)]
    pub part_index: Option<u32>,
    /// Concatenation reference shared by the parts of one message, when known.
    #[serde(default)]
    pub reference: Option<u16>,
    #[serde(default)]
    pub sim_slot: u8,
}

impl RawInboundFragment {
    #[must_use]
    pub fn new(sender: impl Into<String>, body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            sender: Some(sender.into()),
            body: Some(body.into()),
            timestamp,
            part_index: None,
            reference: None,
            sim_slot: 0,
        }
    }

    #[must_use]
    pub fn with_part_index(mut self, index: u32) -> Self {
        self.part_index = Some(index);
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: u16) -> Self {
        self.reference = Some(reference);
        self
    }

    #[must_use]
    pub fn with_sim_slot(mut self, slot: u8) -> Self {
        self.sim_slot = slot;
        self
    }

    /// Originating address, or [`UNKNOWN_SENDER`].
    #[must_use]
    pub fn sender(&self) -> &str { self.sender.as_deref().unwrap_or(UNKNOWN_SENDER) }

    /// Message text, treating a missing body as empty.
    #[must_use]
    pub fn body(&self) -> &str { self.body.as_deref().unwrap_or_default() }
}

/// A fragment could not be decoded.
#[derive(Debug, Error)]
#[error("undecodable fragment: {0}")]
pub struct FragmentDecodeError(#[from] serde_json::Error);

/// Decode one raw fragment record.
///
/// # Errors
///
/// Returns [`FragmentDecodeError`] when `value` is not a fragment object.
pub fn decode_fragment(value: Value) -> Result<RawInboundFragment, FragmentDecodeError> {
    Ok(serde_json::from_value(value)?)
}

/// A logical message reconstructed from one or more fragments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub sender: String,
    pub body: String,
    /// Earliest timestamp among the merged fragments.
    pub timestamp: i64,
    /// SIM slot of the first part.
    pub sim_slot: u8,
}
