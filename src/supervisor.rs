//! Ownership of the single running gateway instance.
//!
//! A process serves at most one gateway at a time. Starting a new one
//! first stops the old one, so the same port can be rebound.

use std::{net::SocketAddr, sync::Arc};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::GatewayConfig,
    router::Router,
    server::{GatewayServer, ServerError, bind_with_fallback},
    transmitter::MessageTransmitter,
};

#[derive(Debug)]
struct RunningGateway {
    addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), ServerError>>,
}

/// Starts, replaces and stops the gateway.
#[derive(Debug, Default)]
pub struct Supervisor {
    current: Option<RunningGateway>,
}

impl Supervisor {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Start a gateway described by `config`, stopping any running one first.
    ///
    /// Returns the address actually bound, which may use a later port than
    /// `config.port` when that one is taken.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if no port in the fallback range can be bound
    /// or the listener cannot be configured. The previous instance is
    /// stopped even then.
    pub async fn start(
        &mut self,
        config: &GatewayConfig,
        transmitter: Arc<dyn MessageTransmitter>,
    ) -> Result<SocketAddr, ServerError> {
        self.stop().await;

        let listener = bind_with_fallback(config.host, config.port, config.bind_attempts)?;
        let addr = listener.local_addr()?;
        let server = GatewayServer::new(Router::new(transmitter, addr.port()))
            .configure(config)
            .bind_existing_listener(listener)?;

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(server.run_with_shutdown(shutdown.clone().cancelled_owned()));
        tracing::info!(%addr, workers = config.workers, "gateway started");

        self.current = Some(RunningGateway {
            addr,
            shutdown,
            task,
        });
        Ok(addr)
    }

    /// Stop the running gateway, if any, and wait for it to release its
    /// listener. Returns whether a gateway was running.
    pub async fn stop(&mut self) -> bool {
        let Some(running) = self.current.take() else {
            return false;
        };
        running.shutdown.cancel();
        match running.task.await {
            Ok(Ok(())) => tracing::info!(addr = %running.addr, "gateway stopped"),
            Ok(Err(e)) => tracing::error!(addr = %running.addr, error = %e, "gateway failed"),
            Err(e) => tracing::error!(addr = %running.addr, error = %e, "gateway task aborted"),
        }
        true
    }

    /// Address of the running gateway.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.current.as_ref().map(|r| r.addr) }

    #[must_use]
    pub fn is_running(&self) -> bool { self.current.is_some() }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use rstest::{fixture, rstest};

    use super::*;
    use crate::transmitter::LogTransmitter;

    #[fixture]
    fn config() -> GatewayConfig {
        GatewayConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            ..GatewayConfig::default()
        }
    }

    #[fixture]
    fn transmitter() -> Arc<dyn MessageTransmitter> { Arc::new(LogTransmitter::default()) }

    #[rstest]
    #[tokio::test]
    async fn start_reports_bound_address(
        config: GatewayConfig,
        transmitter: Arc<dyn MessageTransmitter>,
    ) {
        let mut supervisor = Supervisor::new();
        let addr = supervisor
            .start(&config, transmitter)
            .await
            .expect("start gateway");

        assert!(supervisor.is_running());
        assert_eq!(supervisor.local_addr(), Some(addr));
        assert_ne!(addr.port(), 0);
        assert!(supervisor.stop().await);
        assert!(!supervisor.is_running());
    }

    #[rstest]
    #[tokio::test]
    async fn restart_on_same_port_replaces_instance(
        config: GatewayConfig,
        transmitter: Arc<dyn MessageTransmitter>,
    ) {
        let mut supervisor = Supervisor::new();
        let first = supervisor
            .start(&config, Arc::clone(&transmitter))
            .await
            .expect("first start");

        let same_port = GatewayConfig {
            port: first.port(),
            bind_attempts: 1,
            ..config
        };
        let second = supervisor
            .start(&same_port, transmitter)
            .await
            .expect("previous instance released the port");

        assert_eq!(second, first);
        assert!(supervisor.stop().await);
    }

    #[tokio::test]
    async fn stop_without_gateway_is_noop() {
        let mut supervisor = Supervisor::new();
        assert!(!supervisor.stop().await);
        assert_eq!(supervisor.local_addr(), None);
    }
}
