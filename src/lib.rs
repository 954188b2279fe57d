//! Public API for the `sms_gateway` library.
//!
//! The crate embeds a small HTTP/1.1 server exposing JSON endpoints that
//! send text messages through a pluggable [`MessageTransmitter`], and an
//! inbound engine that reassembles multi-part messages delivered in
//! fragment batches.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod inbound;
pub mod metrics;
pub mod router;
pub mod server;
pub mod supervisor;
pub mod transmitter;

pub use config::GatewayConfig;
pub use inbound::{InboundPump, RawInboundFragment, ReceivedMessage, reassemble};
pub use router::{RequestHandler, Router};
pub use server::{GatewayServer, ServerError};
pub use supervisor::Supervisor;
pub use transmitter::{CommandTransmitter, LogTransmitter, MessageTransmitter, TransmitError};
