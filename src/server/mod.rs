//! Tokio-based HTTP listener for the gateway.
//!
//! `GatewayServer` accepts TCP connections on a single accept loop and hands
//! each one to a connection task. Connection tasks are capped by a fixed
//! size worker pool so a burst of clients cannot spawn unbounded work. Every
//! connection serves exactly one request and is then closed.

use std::{sync::Arc, time::Duration};

use tokio::{net::TcpListener, sync::oneshot};

use crate::{http::RequestLimits, router::RequestHandler};

/// Tokio-based server for a [`RequestHandler`].
///
/// The server carries a typestate `S` indicating whether it is [`Unbound`]
/// (not yet bound to a TCP listener) or [`Bound`]. New servers start
/// `Unbound` and must be bound before they can run.
pub struct GatewayServer<H, S = Unbound>
where
    H: RequestHandler,
    S: ServerState,
{
    pub(crate) handler: Arc<H>,
    pub(crate) workers: usize,
    pub(crate) limits: RequestLimits,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) drain_timeout: Duration,
    pub(crate) backoff_config: BackoffConfig,
    /// Channel used to notify when the server is ready.
    ///
    /// A `oneshot::Sender` can transmit only one readiness notification, so
    /// a new sender must be provided each time the server is started.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    /// Typestate tracking whether the server has been bound to a listener.
    pub(crate) state: S,
}

/// Marker indicating the server has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the server is bound to a TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod binding;
mod config;
mod connection;
pub mod error;
mod runtime;

pub use binding::{DEFAULT_BIND_ATTEMPTS, bind_with_fallback};
pub use error::ServerError;
/// Re-exported configuration types for server backoff behavior.
pub use runtime::BackoffConfig;

#[cfg(test)]
pub(crate) mod test_util;
