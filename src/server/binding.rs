//! Listener binding for [`GatewayServer`].

use std::{
    io,
    net::{IpAddr, SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::net::TcpListener;

use super::{Bound, GatewayServer, ServerError, Unbound};
use crate::router::RequestHandler;

/// Consecutive ports tried by [`bind_with_fallback`] unless told otherwise.
pub const DEFAULT_BIND_ATTEMPTS: u16 = 5;

/// Bind to `base_port`, moving to the next port on failure.
///
/// Tries `base_port`, `base_port + 1`, and so on for at most `attempts`
/// ports. An `attempts` of zero is treated as one. The search stops early
/// rather than wrapping past port 65535. Port 0 asks the OS for an ephemeral
/// port and is only tried once.
///
/// # Examples
///
/// ```
/// use std::net::{IpAddr, Ipv4Addr};
///
/// use sms_gateway::server::bind_with_fallback;
///
/// let listener = bind_with_fallback(IpAddr::V4(Ipv4Addr::LOCALHOST), 0, 5).expect("bind failed");
/// assert_ne!(listener.local_addr().expect("local addr").port(), 0);
/// ```
///
/// # Errors
///
/// Returns [`ServerError::Bind`] carrying the last bind error once every
/// candidate port has failed.
pub fn bind_with_fallback(
    ip: IpAddr,
    base_port: u16,
    attempts: u16,
) -> Result<StdTcpListener, ServerError> {
    bind_with_fallback_using(ip, base_port, attempts, StdTcpListener::bind)
}

fn bind_with_fallback_using<L, F>(
    ip: IpAddr,
    base_port: u16,
    attempts: u16,
    mut bind: F,
) -> Result<L, ServerError>
where
    F: FnMut(SocketAddr) -> io::Result<L>,
{
    let attempts = if base_port == 0 { 1 } else { attempts.max(1) };
    let mut tried = 0;
    let mut last_port = base_port;
    let mut last_error = None;

    for offset in 0..attempts {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        tried += 1;
        last_port = port;
        let addr = SocketAddr::new(ip, port);
        match bind(addr) {
            Ok(listener) => {
                tracing::info!(%addr, attempt = tried, "listener bound");
                return Ok(listener);
            }
            Err(e) => {
                tracing::warn!(%addr, attempt = tried, error = %e, "bind failed");
                last_error = Some(e);
            }
        }
    }

    Err(ServerError::Bind {
        attempts: tried,
        last_port,
        source: last_error.unwrap_or_else(|| io::Error::other("no port was attempted")),
    })
}

impl<H> GatewayServer<H, Unbound>
where
    H: RequestHandler,
{
    /// Return `None` as the server is not bound.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }

    /// Bind to a fresh address.
    ///
    /// # Errors
    /// Returns a [`ServerError`] if binding or configuring the listener fails.
    pub fn bind(self, addr: SocketAddr) -> Result<GatewayServer<H, Bound>, ServerError> {
        let std_listener = StdTcpListener::bind(addr)?;
        self.bind_existing_listener(std_listener)
    }

    /// Bind to an existing `StdTcpListener`, for example one returned by
    /// [`bind_with_fallback`].
    ///
    /// # Errors
    /// Returns a [`ServerError`] if configuring the listener fails.
    pub fn bind_existing_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<GatewayServer<H, Bound>, ServerError> {
        let GatewayServer {
            handler,
            workers,
            limits,
            read_timeout,
            drain_timeout,
            backoff_config,
            ready_tx,
            ..
        } = self;

        std_listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(std_listener)?;

        Ok(GatewayServer {
            handler,
            workers,
            limits,
            read_timeout,
            drain_timeout,
            backoff_config,
            ready_tx,
            state: Bound {
                listener: Arc::new(listener),
            },
        })
    }
}

impl<H> GatewayServer<H, Bound>
where
    H: RequestHandler,
{
    /// Returns the bound address, or `None` if retrieving it fails.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.local_addr().ok() }
}
