//! Builder methods for [`GatewayServer`].

use std::{sync::Arc, time::Duration};

use tokio::sync::oneshot;

use super::{BackoffConfig, GatewayServer, ServerState, Unbound};
use crate::{config::GatewayConfig, http::RequestLimits, router::RequestHandler};

impl<H> GatewayServer<H, Unbound>
where
    H: RequestHandler,
{
    /// Create a new `GatewayServer` serving requests with `handler`.
    ///
    /// Defaults follow [`GatewayConfig::default`]. The TCP listener is unset;
    /// call [`bind`](Self::bind) or
    /// [`bind_existing_listener`](Self::bind_existing_listener) before
    /// running the server.
    #[must_use]
    pub fn new(handler: H) -> Self {
        let defaults = GatewayConfig::default();
        Self {
            handler: Arc::new(handler),
            workers: defaults.workers,
            limits: defaults.limits(),
            read_timeout: defaults.read_timeout,
            drain_timeout: defaults.drain_timeout,
            backoff_config: defaults.backoff,
            ready_tx: None,
            state: Unbound,
        }
    }
}

impl<H, S> GatewayServer<H, S>
where
    H: RequestHandler,
    S: ServerState,
{
    /// Apply the listener settings from `config`.
    ///
    /// Host, port and bind attempts are ignored; binding is done separately.
    #[must_use]
    pub fn configure(self, config: &GatewayConfig) -> Self {
        self.workers(config.workers)
            .limits(config.limits())
            .read_timeout(config.read_timeout)
            .accept_backoff(config.backoff)
            .drain_timeout(config.drain_timeout)
    }

    /// Set the maximum number of connections served at once.
    #[must_use]
    pub fn workers(mut self, count: usize) -> Self {
        self.workers = count.max(1);
        self
    }

    /// Set the caps applied while parsing requests.
    #[must_use]
    pub fn limits(mut self, limits: RequestLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the deadline for reading a complete request.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Configure the retry policy for failed `accept()` calls.
    #[must_use]
    pub fn accept_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff_config = backoff.normalized();
        self
    }

    /// Set how long shutdown waits for in-flight connections.
    #[must_use]
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Configure a channel used to signal when the server is ready to accept connections.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Returns the configured size of the worker pool.
    #[inline]
    #[must_use]
    pub const fn worker_count(&self) -> usize { self.workers }
}
