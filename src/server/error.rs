//! Errors raised by [`GatewayServer`](super::GatewayServer) operations.

use std::io;

use thiserror::Error;

/// Errors that may occur while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Every port in the fallback range was unavailable.
    #[error("failed to bind after {attempts} attempts (last port {last_port}): {source}")]
    Bind {
        attempts: u16,
        last_port: u16,
        #[source]
        source: io::Error,
    },
    /// Configuring or inspecting the listener failed.
    #[error("listener error: {0}")]
    Listener(#[from] io::Error),
}
