//! Accept loop feeding the connection worker pool.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use log::warn;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    sync::{OwnedSemaphorePermit, Semaphore},
    time::{Duration, sleep},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::backoff::BackoffConfig;
use crate::{
    router::RequestHandler,
    server::connection::{ConnectionOptions, spawn_connection_task},
};

/// Abstraction for sources of incoming connections consumed by the accept loop.
///
/// Implementations must be cancellation-safe: dropping a pending `accept()`
/// future must not leak resources.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub(in crate::server) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl AcceptListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> { TcpListener::local_addr(self) }
}

#[derive(Debug)]
pub(in crate::server) struct AcceptLoopOptions {
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
    pub backoff: BackoffConfig,
    /// One permit per connection allowed in flight.
    pub pool: Arc<Semaphore>,
    pub connection: ConnectionOptions,
}

enum AcceptFailure {
    PoolClosed,
    Io(io::Error),
}

/// Accepts incoming connections and spawns a task per connection.
///
/// A worker permit is taken from `options.pool` before each `accept()`, so
/// once the pool is exhausted further clients wait in the OS backlog until a
/// connection finishes. Failed accepts are logged and retried with
/// exponential back-off. The loop ends when `options.shutdown` is cancelled;
/// connection tasks are tracked by `options.tracker`.
pub(in crate::server) async fn accept_loop<H, L>(
    listener: Arc<L>,
    handler: Arc<H>,
    options: AcceptLoopOptions,
) where
    H: RequestHandler,
    L: AcceptListener + 'static,
{
    let backoff = options.backoff.normalized();
    debug_assert!(
        backoff.initial_delay <= backoff.max_delay,
        "BackoffConfig invariant violated: initial_delay > max_delay"
    );
    let mut delay = backoff.initial_delay;
    while let Some(next_delay) =
        accept_iteration(listener.as_ref(), &handler, &options, &backoff, delay).await
    {
        delay = next_delay;
    }
    tracing::debug!("accept loop stopped");
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to modulus internally"
)]
async fn accept_iteration<H, L>(
    listener: &L,
    handler: &Arc<H>,
    options: &AcceptLoopOptions,
    backoff: &BackoffConfig,
    delay: Duration,
) -> Option<Duration>
where
    H: RequestHandler,
    L: AcceptListener,
{
    select! {
        biased;

        () = options.shutdown.cancelled() => None,
        res = next_connection(listener, &options.pool) => match res {
            Ok((permit, stream, peer_addr)) => {
                spawn_connection_task(
                    stream,
                    peer_addr,
                    Arc::clone(handler),
                    options.connection,
                    permit,
                    &options.tracker,
                );
                Some(backoff.initial_delay)
            }
            Err(AcceptFailure::PoolClosed) => {
                warn!("worker pool closed; stopping accept loop");
                None
            }
            Err(AcceptFailure::Io(e)) => {
                let local_addr = listener.local_addr().ok();
                warn!("accept error: error={e:?}, local_addr={local_addr:?}");
                sleep(delay).await;
                Some(backoff.next_delay(delay))
            }
        },
    }
}

async fn next_connection<L>(
    listener: &L,
    pool: &Arc<Semaphore>,
) -> Result<(OwnedSemaphorePermit, TcpStream, SocketAddr), AcceptFailure>
where
    L: AcceptListener,
{
    let permit = Arc::clone(pool)
        .acquire_owned()
        .await
        .map_err(|_| AcceptFailure::PoolClosed)?;
    let (stream, peer_addr) = listener.accept().await.map_err(AcceptFailure::Io)?;
    Ok((permit, stream, peer_addr))
}
