//! Runtime control for [`GatewayServer`].

mod accept;
mod backoff;

use std::{future::Future, sync::Arc};

#[cfg(test)]
use accept::MockAcceptListener;
use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
use log::warn;
use tokio::{select, signal, sync::Semaphore, time::timeout};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Bound, GatewayServer, ServerError, connection::ConnectionOptions};
use crate::router::RequestHandler;

impl<H> GatewayServer<H, Bound>
where
    H: RequestHandler,
{
    /// Run the server until Ctrl+C is received.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use sms_gateway::{router::Router, server::GatewayServer, transmitter::LogTransmitter};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), sms_gateway::server::ServerError> {
    /// let router = Router::new(Arc::new(LogTransmitter::default()), 8080);
    /// let server = GatewayServer::new(router).bind(([127, 0, 0, 1], 8080).into())?;
    /// server.run().await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// Attempting to run a server without binding fails to compile:
    ///
    /// ```compile_fail
    /// use std::sync::Arc;
    ///
    /// use sms_gateway::{router::Router, server::GatewayServer, transmitter::LogTransmitter};
    ///
    /// async fn try_run() {
    ///     GatewayServer::new(Router::new(Arc::new(LogTransmitter::default()), 8080))
    ///         .run()
    ///         .await
    ///         .expect("unbound servers do not expose run()");
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the server until the `shutdown` future resolves.
    ///
    /// Once `shutdown` fires the accept loop stops and the listener is
    /// dropped. Connections already being served get up to the configured
    /// drain timeout to finish; any still running after that are left to
    /// complete on their own.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use sms_gateway::{router::Router, server::GatewayServer, transmitter::LogTransmitter};
    /// use tokio::sync::oneshot;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), sms_gateway::server::ServerError> {
    /// let router = Router::new(Arc::new(LogTransmitter::default()), 0);
    /// let server = GatewayServer::new(router).bind(([127, 0, 0, 1], 0).into())?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(async move {
    ///     server
    ///         .run_with_shutdown(async {
    ///             let _ = rx.await;
    ///         })
    ///         .await
    /// });
    ///
    /// let _ = tx.send(());
    /// handle
    ///     .await
    ///     .expect("join server task")
    ///     .expect("server run failed");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let GatewayServer {
            handler,
            workers,
            limits,
            read_timeout,
            drain_timeout,
            backoff_config,
            ready_tx,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();

        let mut accept = tokio::spawn(accept_loop(
            listener,
            handler,
            AcceptLoopOptions {
                shutdown: shutdown_token.clone(),
                tracker: tracker.clone(),
                backoff: backoff_config,
                pool: Arc::new(Semaphore::new(workers)),
                connection: ConnectionOptions {
                    limits,
                    read_timeout,
                },
            },
        ));

        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("Failed to send readiness signal: receiver dropped");
        }

        let finished = select! {
            () = shutdown => {
                shutdown_token.cancel();
                None
            }
            res = &mut accept => Some(res),
        };
        // The listener is released only once the accept loop has exited.
        let res = match finished {
            Some(res) => res,
            None => accept.await,
        };
        if let Err(e) = res {
            warn!("accept loop terminated unexpectedly: error={e}");
        }

        tracker.close();
        if timeout(drain_timeout, tracker.wait()).await.is_err() {
            tracing::warn!(
                in_flight = tracker.len(),
                ?drain_timeout,
                "drain timeout elapsed; abandoning in-flight connections"
            );
        }
        Ok(())
    }
}
