//! Shared utilities for integration tests.
//!
//! Provides a running gateway bound to an unused local port and a tiny raw
//! HTTP client, so each test speaks to the server over a real socket.

#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
    time::Duration,
};

use sms_gateway::{GatewayConfig, GatewayServer, MessageTransmitter, Router};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
};

/// Create a TCP listener bound to a free local port.
pub fn unused_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("failed to bind port")
}

/// Gateway running on a background task until [`TestGateway::stop`].
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestGateway {
    /// Start a gateway routing through `transmitter` with `config`'s listener settings.
    pub async fn start_with(transmitter: Arc<dyn MessageTransmitter>, config: &GatewayConfig) -> Self {
        let listener = unused_listener();
        let addr = listener.local_addr().expect("listener address");
        let (ready_tx, ready_rx) = oneshot::channel();
        let server = GatewayServer::new(Router::new(transmitter, addr.port()))
            .configure(config)
            .ready_signal(ready_tx)
            .bind_existing_listener(listener)
            .expect("bind gateway");

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .run_with_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("gateway run failed");
        });
        ready_rx.await.expect("gateway signals readiness");
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub async fn start(transmitter: Arc<dyn MessageTransmitter>) -> Self {
        Self::start_with(transmitter, &GatewayConfig::default()).await
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.expect("gateway task join");
    }
}

/// Response as seen on the wire.
#[derive(Debug)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn status(&self) -> u16 {
        self.status_line
            .split(' ')
            .nth(1)
            .and_then(|code| code.parse().ok())
            .expect("status line carries a code")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is JSON")
    }
}

/// Write `request` verbatim and read until the server closes the connection.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    exchange(addr, request, false).await
}

/// Like [`send_raw`], but half-closes the client side after writing.
pub async fn send_raw_then_close(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    exchange(addr, request, true).await
}

async fn exchange(addr: SocketAddr, request: &[u8], close_write: bool) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.expect("connect to gateway");
    stream.write_all(request).await.expect("write request");
    if close_write {
        stream.shutdown().await.expect("half-close client");
    }
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received))
        .await
        .expect("gateway closes the connection")
        .expect("read response");
    received
}

/// Split a raw response into status line, headers and body.
pub fn parse_response(raw: &[u8]) -> RawResponse {
    let text = String::from_utf8(raw.to_vec()).expect("utf-8 response");
    let (head, body) = text.split_once("\r\n\r\n").expect("header terminator");
    let mut lines = head.split("\r\n");
    let status_line = lines.next().expect("status line").to_owned();
    let headers = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
    RawResponse {
        status_line,
        headers,
        body: body.to_owned(),
    }
}

/// Send a request with a JSON body and parse the reply.
pub async fn request(addr: SocketAddr, method: &str, path: &str, body: &str) -> RawResponse {
    let raw = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    parse_response(&send_raw(addr, raw.as_bytes()).await)
}
