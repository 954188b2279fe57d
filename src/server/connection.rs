//! Connection handling for [`GatewayServer`](super::GatewayServer).
//!
//! Each accepted connection carries exactly one request: it is read under
//! the configured deadline, handed to the [`RequestHandler`], answered, and
//! closed.

use std::{any::Any, net::SocketAddr, sync::Arc, time::Duration};

use futures::FutureExt;
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::OwnedSemaphorePermit,
};
use tokio_util::task::TaskTracker;

use crate::{
    http::{RequestLimits, read_request_within, write_response},
    metrics,
    router::RequestHandler,
};

/// Per-connection settings copied into every connection task.
#[derive(Clone, Copy, Debug)]
pub(in crate::server) struct ConnectionOptions {
    pub limits: RequestLimits,
    pub read_timeout: Option<Duration>,
}

/// Spawn a task to serve a single TCP connection, logging and discarding any panics.
///
/// `permit` is held for the lifetime of the task so the worker pool frees a
/// slot only once the connection is closed.
pub(in crate::server) fn spawn_connection_task<H>(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
    options: ConnectionOptions,
    permit: OwnedSemaphorePermit,
    tracker: &TaskTracker,
) where
    H: RequestHandler,
{
    tracker.spawn(async move {
        let _permit = permit;
        let fut =
            std::panic::AssertUnwindSafe(process_stream(stream, peer_addr, handler, options))
                .catch_unwind();

        if let Err(panic) = fut.await {
            metrics::inc_connection_panics();
            let panic_msg = panic_message(panic.as_ref());
            tracing::error!(panic = %panic_msg, %peer_addr, "connection task panicked");
        }
    });
}

/// Render a panic payload, falling back to `Debug` for non-string payloads.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else {
        format!("{panic:?}")
    }
}

/// Tracks the active-connection gauge, including across panics.
struct ActiveConnection;

impl ActiveConnection {
    fn open() -> Self {
        metrics::inc_connections();
        Self
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) { metrics::dec_connections(); }
}

async fn process_stream<H>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
    options: ConnectionOptions,
) where
    H: RequestHandler,
{
    let _active = ActiveConnection::open();
    tracing::debug!(%peer_addr, "connection accepted");

    let outcome = {
        let mut reader = BufReader::new(&mut stream);
        read_request_within(&mut reader, &options.limits, options.read_timeout).await
    };

    let response = match outcome {
        Ok(Some(request)) => handler.handle(request).await,
        Ok(None) => {
            tracing::debug!(%peer_addr, "peer closed without sending a request");
            return;
        }
        Err(err) => match err.response() {
            Some(response) => {
                tracing::warn!(%peer_addr, error = %err, status = response.status(), "rejecting request");
                response
            }
            None => {
                tracing::warn!(%peer_addr, error = %err, "aborting connection");
                return;
            }
        },
    };

    if let Err(e) = write_response(&mut stream, &response).await {
        tracing::warn!(%peer_addr, error = %e, "failed to write response");
        return;
    }
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(%peer_addr, error = %e, "failed to shut down connection");
    }
}
