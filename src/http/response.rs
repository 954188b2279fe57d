//! Response model and wire serialisation.

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Headers attached to every response so browser clients on the local
/// network can call the endpoint directly.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

const CONTENT_TYPE: &str = "application/json";

/// A fully materialised response.
///
/// The header set is fixed: `Content-Type`, a `Content-Length` computed from
/// the body, and [`CORS_HEADERS`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Response with a plain-text body.
    #[must_use]
    pub fn text(status: u16, body: &str) -> Self { Self::new(status, body.as_bytes()) }

    /// Response with `value` serialised as JSON.
    ///
    /// Serialisation failures degrade to a 500 with a fixed body rather than
    /// panicking in the connection task.
    #[must_use]
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, body),
            Err(e) => {
                log::error!("failed to serialise response body: {e}");
                Self::text(500, r#"{"success":false,"error":"Internal error"}"#)
            }
        }
    }

    /// The fallback reply for unknown routes.
    #[must_use]
    pub fn not_found() -> Self { Self::text(404, "Endpoint not found") }

    #[must_use]
    pub const fn status(&self) -> u16 { self.status }

    #[must_use]
    pub fn status_text(&self) -> &'static str { status_text(self.status) }

    #[must_use]
    pub fn body(&self) -> &[u8] { &self.body }

    /// Headers in the order they are written to the wire.
    #[must_use]
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Content-Type", CONTENT_TYPE.to_owned()),
            ("Content-Length", self.body.len().to_string()),
        ];
        headers.extend(
            CORS_HEADERS
                .iter()
                .map(|(name, value)| (*name, (*value).to_owned())),
        );
        headers
    }

    /// Serialise status line, headers, blank line, and body.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.status_text());
        for (name, value) in self.headers() {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(&value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

/// Reason phrase for the status codes the gateway emits.
#[must_use]
pub fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Write `response` in one pass and flush.
///
/// # Errors
///
/// Returns any error raised by the underlying writer.
pub async fn write_response<W>(writer: &mut W, response: &HttpResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&response.encode()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn encodes_status_line_headers_and_body() {
        let response = HttpResponse::text(200, "{}");
        let encoded = String::from_utf8(response.encode()).expect("response is utf-8");

        assert_eq!(
            encoded,
            "HTTP/1.1 200 OK\r\n\
             Content-Type: application/json\r\n\
             Content-Length: 2\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
             Access-Control-Allow-Headers: Content-Type\r\n\
             \r\n\
             {}"
        );
    }

    #[test]
    fn content_length_counts_bytes_not_chars() {
        let response = HttpResponse::text(200, "héllo");
        let length = response
            .headers()
            .into_iter()
            .find(|(name, _)| *name == "Content-Length")
            .map(|(_, value)| value);
        assert_eq!(length.as_deref(), Some("6"));
    }

    #[test]
    fn json_bodies_are_serialised() {
        #[derive(Serialize)]
        struct Body {
            ok: bool,
        }
        let response = HttpResponse::json(200, &Body { ok: true });
        assert_eq!(response.body(), br#"{"ok":true}"#);
    }

    #[rstest]
    #[case(200, "OK")]
    #[case(400, "Bad Request")]
    #[case(404, "Not Found")]
    #[case(413, "Payload Too Large")]
    #[case(500, "Internal Server Error")]
    #[case(418, "Unknown")]
    fn reason_phrases(#[case] status: u16, #[case] text: &str) {
        assert_eq!(status_text(status), text);
    }

    #[tokio::test]
    async fn write_response_flushes_whole_message() {
        let response = HttpResponse::not_found();
        let mut out = Vec::new();
        write_response(&mut out, &response)
            .await
            .expect("writing to a Vec cannot fail");
        assert_eq!(out, response.encode());
        assert!(out.ends_with(b"\r\n\r\nEndpoint not found"));
    }
}
