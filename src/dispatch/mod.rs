//! Request handlers behind the gateway's JSON endpoints.
//!
//! [`MessageDispatcher`] validates single and bulk send requests, forwards
//! each message to the configured
//! [`MessageTransmitter`](crate::transmitter::MessageTransmitter), and folds
//! the outcomes into response bodies. [`status`] answers the health probe.

mod handlers;
pub mod types;

pub use handlers::{MessageDispatcher, SERVER_NAME, status};
pub use types::{BulkSendRequest, SendRequest, SendResult};
