//! Test helpers shared across server modules.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use async_trait::async_trait;
use rstest::fixture;

use super::{Bound, GatewayServer};
use crate::{
    http::{HttpRequest, HttpResponse},
    router::RequestHandler,
};

/// Handler answering every request with `200 ok`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticHandler;

#[async_trait]
impl RequestHandler for StaticHandler {
    async fn handle(&self, _request: HttpRequest) -> HttpResponse { HttpResponse::text(200, "ok") }
}

#[fixture]
pub fn handler() -> StaticHandler { StaticHandler }

#[fixture]
/// Returns a bound [`TcpListener`](StdTcpListener) on a free port for use in tests.
///
/// Keeping the listener bound prevents race conditions where another
/// process could claim the port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

pub fn bind_server<H>(handler: H, listener: StdTcpListener) -> GatewayServer<H, Bound>
where
    H: RequestHandler,
{
    GatewayServer::new(handler)
        .bind_existing_listener(listener)
        .expect("Failed to bind")
}
