//! Request handlers behind the send and status routes.

use std::sync::Arc;

use serde_json::Value;

use super::types::{
    BulkResponse,
    BulkSendRequest,
    Failure,
    SendAccepted,
    SendRequest,
    SendResult,
    StatusBody,
    new_message_id,
    scalar_text,
};
use crate::{
    http::HttpResponse,
    transmitter::{MessageTransmitter, send_message},
};

/// Name reported by the status endpoint.
pub const SERVER_NAME: &str = "SMS Gateway";

const SEND_FAILED: &str = "Failed to send SMS";

/// Handles `/send-sms` and `/send-bulk-sms`.
#[derive(Clone)]
pub struct MessageDispatcher {
    transmitter: Arc<dyn MessageTransmitter>,
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("transmitter", &"<dyn MessageTransmitter>")
            .finish()
    }
}

impl MessageDispatcher {
    #[must_use]
    pub fn new(transmitter: Arc<dyn MessageTransmitter>) -> Self { Self { transmitter } }

    /// Send one message.
    ///
    /// Replies 200 with the message id on success, 400 when the body is not
    /// a valid [`SendRequest`], and 500 when the transmitter fails.
    pub async fn send_single(&self, body: &[u8]) -> HttpResponse {
        let request = match serde_json::from_slice::<SendRequest>(body)
            .map_err(|e| e.to_string())
            .and_then(|request| request.validate().map(|()| request))
        {
            Ok(request) => request,
            Err(reason) => {
                tracing::warn!(%reason, "rejecting send request");
                return HttpResponse::json(400, &Failure::new(format!("Invalid request: {reason}")));
            }
        };

        let result = self.deliver(request).await;
        if result.success {
            HttpResponse::json(
                200,
                &SendAccepted {
                    success: true,
                    message_id: &result.message_id,
                    message: "SMS sent successfully",
                },
            )
        } else {
            HttpResponse::json(500, &Failure::new(SEND_FAILED))
        }
    }

    /// Send every message of a batch, in order.
    ///
    /// The envelope always reports success once the body parses; each entry
    /// of `results` carries its own outcome. A malformed item becomes a
    /// failed result and does not stop the items after it.
    pub async fn send_bulk(&self, body: &[u8]) -> HttpResponse {
        let bulk = match serde_json::from_slice::<BulkSendRequest>(body) {
            Ok(bulk) => bulk,
            Err(e) => {
                tracing::warn!(reason = %e, "rejecting bulk send request");
                return HttpResponse::json(400, &Failure::new(format!("Invalid request: {e}")));
            }
        };

        let mut results = Vec::with_capacity(bulk.messages.len());
        for item in bulk.messages {
            let result = match decode_item(item) {
                Ok(request) => self.deliver(request).await,
                Err(rejected) => rejected,
            };
            results.push(result);
        }
        tracing::info!(
            total = results.len(),
            failed = results.iter().filter(|r| !r.success).count(),
            "bulk send processed"
        );

        HttpResponse::json(
            200,
            &BulkResponse {
                success: true,
                results,
            },
        )
    }

    async fn deliver(&self, mut request: SendRequest) -> SendResult {
        let message_id = request.resolve_message_id();
        let outcome = send_message(
            self.transmitter.as_ref(),
            &request.recipient,
            &request.message,
            &message_id,
        )
        .await;
        SendResult {
            message_id,
            recipient: request.recipient,
            success: outcome.is_ok(),
            error: outcome.err().map(|_| SEND_FAILED.to_owned()),
        }
    }
}

/// Decode one bulk item, or describe why it was rejected.
fn decode_item(item: Value) -> Result<SendRequest, SendResult> {
    let echoed = |field: &str| item.get(field).and_then(Value::as_str).map(str::to_owned);
    let reject = |reason: String| SendResult {
        message_id: item
            .get("messageId")
            .and_then(scalar_text)
            .unwrap_or_else(new_message_id),
        recipient: echoed("recipient").unwrap_or_default(),
        success: false,
        error: Some(format!("Invalid message: {reason}")),
    };

    let request = match serde_json::from_value::<SendRequest>(item.clone()) {
        Ok(request) => request,
        Err(e) => return Err(reject(e.to_string())),
    };
    request.validate().map_err(reject)?;
    Ok(request)
}

/// Static health payload for `GET /status`.
#[must_use]
pub fn status(port: u16) -> HttpResponse {
    HttpResponse::json(
        200,
        &StatusBody {
            status: "running",
            server: SERVER_NAME,
            port,
        },
    )
}
