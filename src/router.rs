//! Static route table mapping requests onto handlers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    dispatch::{self, MessageDispatcher},
    http::{HttpRequest, HttpResponse, Method},
    metrics,
    transmitter::MessageTransmitter,
};

/// Something that turns a request into a response.
///
/// The server runtime is generic over this trait so the transport can be
/// exercised without the gateway's routes.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: HttpRequest) -> HttpResponse;
}

/// Endpoints known to the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    SendSms,
    SendBulkSms,
    Status,
    NotFound,
}

impl Route {
    /// Match a method and path against the route table. Paths are compared
    /// literally; query strings are not stripped.
    #[must_use]
    pub fn resolve(method: &Method, path: &str) -> Self {
        match (method, path) {
            (Method::Post, "/send-sms") => Self::SendSms,
            (Method::Post, "/send-bulk-sms") => Self::SendBulkSms,
            (Method::Get, "/status") => Self::Status,
            _ => Self::NotFound,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendSms => "send_sms",
            Self::SendBulkSms => "send_bulk_sms",
            Self::Status => "status",
            Self::NotFound => "not_found",
        }
    }
}

/// The gateway's request handler.
#[derive(Debug, Clone)]
pub struct Router {
    dispatcher: MessageDispatcher,
    port: u16,
}

impl Router {
    /// Build the router. `port` is what `/status` reports.
    #[must_use]
    pub fn new(transmitter: Arc<dyn MessageTransmitter>, port: u16) -> Self {
        Self {
            dispatcher: MessageDispatcher::new(transmitter),
            port,
        }
    }
}

#[async_trait]
impl RequestHandler for Router {
    async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let route = Route::resolve(request.method(), request.path());
        tracing::debug!(
            method = %request.method(),
            path = request.path(),
            route = route.as_str(),
            "dispatching request"
        );
        metrics::inc_requests(route.as_str());
        match route {
            Route::SendSms => self.dispatcher.send_single(request.body()).await,
            Route::SendBulkSms => self.dispatcher.send_bulk(request.body()).await,
            Route::Status => dispatch::status(self.port),
            Route::NotFound => HttpResponse::not_found(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::transmitter::LogTransmitter;

    #[rstest]
    #[case(Method::Post, "/send-sms", Route::SendSms)]
    #[case(Method::Post, "/send-bulk-sms", Route::SendBulkSms)]
    #[case(Method::Get, "/status", Route::Status)]
    #[case(Method::Get, "/send-sms", Route::NotFound)]
    #[case(Method::Post, "/status", Route::NotFound)]
    #[case(Method::Options, "/send-sms", Route::NotFound)]
    #[case(Method::Get, "/status?verbose=1", Route::NotFound)]
    #[case(Method::Get, "/status/", Route::NotFound)]
    #[case(Method::Other("PUT".into()), "/send-sms", Route::NotFound)]
    fn resolves_routes(#[case] method: Method, #[case] path: &str, #[case] expected: Route) {
        assert_eq!(Route::resolve(&method, path), expected);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let router = Router::new(Arc::new(LogTransmitter::default()), 8080);
        let response = router
            .handle(HttpRequest::new(Method::Get, "/nope", Vec::new()))
            .await;
        assert_eq!(response.status(), 404);
        assert_eq!(response.body(), b"Endpoint not found");
    }

    #[tokio::test]
    async fn status_reports_configured_port() {
        let router = Router::new(Arc::new(LogTransmitter::default()), 8082);
        let response = router
            .handle(HttpRequest::new(Method::Get, "/status", Vec::new()))
            .await;
        assert_eq!(response.status(), 200);
        let json: serde_json::Value =
            serde_json::from_slice(response.body()).expect("status body is JSON");
        assert_eq!(json["port"], 8082);
    }

    #[tokio::test]
    async fn send_route_reaches_transmitter() {
        let transmitter = Arc::new(LogTransmitter::default());
        let router = Router::new(transmitter.clone(), 8080);
        let response = router
            .handle(HttpRequest::new(
                Method::Post,
                "/send-sms",
                br#"{"recipient":"+1","message":"routed"}"#.to_vec(),
            ))
            .await;
        assert_eq!(response.status(), 200);
        assert_eq!(transmitter.sent()[0].body, "routed");
    }
}
