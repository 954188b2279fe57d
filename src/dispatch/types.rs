//! Wire types for the send endpoints.

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;
use uuid::Uuid;

/// One outbound message as submitted by a client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub recipient: String,
    pub message: String,
    /// Numbers and booleans are accepted and kept in their JSON text form.
    #[serde(default, deserialize_with = "message_id_text")]
    pub message_id: Option<String>,
}

/// Text form of a scalar identifier; `None` for `null`, arrays and objects.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn message_id_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => scalar_text(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom("messageId must be a string or number")),
    }
}

impl SendRequest {
    /// Check constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the recipient is blank.
    pub fn validate(&self) -> Result<(), String> {
        if self.recipient.trim().is_empty() {
            return Err("recipient must not be empty".to_owned());
        }
        Ok(())
    }

    /// The client-supplied identifier, or a freshly generated one.
    #[must_use]
    pub fn resolve_message_id(&mut self) -> String {
        self.message_id.get_or_insert_with(new_message_id).clone()
    }
}

/// Generate a unique message identifier.
#[must_use]
pub fn new_message_id() -> String { Uuid::new_v4().to_string() }

/// Envelope for `/send-bulk-sms`.
///
/// Items are kept as raw JSON so one malformed entry cannot reject the
/// whole batch.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BulkSendRequest {
    pub messages: Vec<serde_json::Value>,
}

/// Per-message outcome reported by the bulk endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub message_id: String,
    pub recipient: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SendAccepted<'a> {
    pub success: bool,
    pub message_id: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct Failure {
    pub success: bool,
    pub error: String,
}

impl Failure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct BulkResponse {
    pub success: bool,
    pub results: Vec<SendResult>,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusBody {
    pub status: &'static str,
    pub server: &'static str,
    pub port: u16,
}
