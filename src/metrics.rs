//! Metric helpers for the gateway.
//!
//! With the `metrics` feature enabled these wrap the
//! [`metrics`](https://docs.rs/metrics) facade; without it every helper is a
//! no-op so call sites need no feature gates.

/// Name of the gauge tracking connections currently being served.
pub const CONNECTIONS_ACTIVE: &str = "sms_gateway_connections_active";
/// Name of the counter tracking requests by route.
pub const REQUESTS_TOTAL: &str = "sms_gateway_requests_total";
/// Name of the counter tracking outbound sends by outcome.
pub const SENDS_TOTAL: &str = "sms_gateway_sends_total";
/// Name of the counter tracking reassembled inbound messages handed to a sink.
pub const INBOUND_MESSAGES_TOTAL: &str = "sms_gateway_inbound_messages_total";
/// Name of the counter tracking panics in connection tasks.
pub const CONNECTION_PANICS_TOTAL: &str = "sms_gateway_connection_panics_total";

/// Outcome of an outbound send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Failed,
}

impl SendOutcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            SendOutcome::Sent => "sent",
            SendOutcome::Failed => "failed",
        }
    }
}

#[cfg(feature = "metrics")]
mod imp {
    use metrics::{counter, gauge};

    use super::{
        CONNECTION_PANICS_TOTAL,
        CONNECTIONS_ACTIVE,
        INBOUND_MESSAGES_TOTAL,
        REQUESTS_TOTAL,
        SENDS_TOTAL,
        SendOutcome,
    };

    pub fn inc_connections() { gauge!(CONNECTIONS_ACTIVE).increment(1.0); }

    pub fn dec_connections() { gauge!(CONNECTIONS_ACTIVE).decrement(1.0); }

    pub fn inc_requests(route: &'static str) {
        counter!(REQUESTS_TOTAL, "route" => route).increment(1);
    }

    pub fn inc_sends(outcome: SendOutcome) {
        counter!(SENDS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    }

    pub fn inc_inbound_stored() { counter!(INBOUND_MESSAGES_TOTAL).increment(1); }

    pub fn inc_connection_panics() { counter!(CONNECTION_PANICS_TOTAL).increment(1); }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    use super::SendOutcome;

    pub fn inc_connections() {}

    pub fn dec_connections() {}

    pub fn inc_requests(_route: &'static str) {}

    pub fn inc_sends(_outcome: SendOutcome) {}

    pub fn inc_inbound_stored() {}

    pub fn inc_connection_panics() {}
}

/// Increment the active connections gauge.
pub fn inc_connections() { imp::inc_connections(); }

/// Decrement the active connections gauge.
pub fn dec_connections() { imp::dec_connections(); }

/// Record a request dispatched to `route`.
pub fn inc_requests(route: &'static str) { imp::inc_requests(route); }

/// Record an outbound send attempt.
pub fn inc_sends(outcome: SendOutcome) { imp::inc_sends(outcome); }

/// Record an inbound message handed to the storage sink.
pub fn inc_inbound_stored() { imp::inc_inbound_stored(); }

/// Record a panic caught in a connection task.
pub fn inc_connection_panics() { imp::inc_connection_panics(); }

/// Serve Prometheus metrics over HTTP on `addr`.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns an error if the exporter cannot be installed, for example when
/// another recorder is already registered or the address cannot be bound.
#[cfg(feature = "metrics")]
pub fn install_prometheus_exporter(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
}
