//! Gateway configuration.
//!
//! [`GatewayConfig`] gathers every tunable of the HTTP listener in one place
//! so the binary, the [`Supervisor`](crate::supervisor::Supervisor) and tests
//! can share a single description of a gateway instance.

use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use crate::{
    http::RequestLimits,
    server::{BackoffConfig, DEFAULT_BIND_ATTEMPTS},
};

/// Port the gateway tries first unless told otherwise.
pub const DEFAULT_PORT: u16 = 8080;
/// Connections served concurrently unless told otherwise.
pub const DEFAULT_WORKERS: usize = 10;

/// Settings for one gateway instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Interface to listen on.
    pub host: IpAddr,
    /// First port tried; later attempts use the following ports.
    pub port: u16,
    /// Number of consecutive ports tried before giving up.
    pub bind_attempts: u16,
    /// Maximum number of connections served concurrently.
    pub workers: usize,
    /// Deadline for receiving a complete request. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Largest request body accepted.
    pub max_body_bytes: usize,
    /// Retry policy for failed `accept()` calls.
    pub backoff: BackoffConfig,
    /// How long shutdown waits for in-flight connections.
    pub drain_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            bind_attempts: DEFAULT_BIND_ATTEMPTS,
            workers: DEFAULT_WORKERS,
            read_timeout: Some(Duration::from_secs(30)),
            max_body_bytes: RequestLimits::default().max_body_bytes,
            backoff: BackoffConfig::default(),
            drain_timeout: Duration::from_secs(1),
        }
    }
}

impl GatewayConfig {
    /// Parser limits derived from this configuration.
    #[must_use]
    pub fn limits(&self) -> RequestLimits {
        RequestLimits {
            max_body_bytes: self.max_body_bytes,
            ..RequestLimits::default()
        }
    }
}
