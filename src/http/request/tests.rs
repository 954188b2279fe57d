//! Tests for request parsing.

use rstest::rstest;

use std::time::Duration;

use super::{Method, RequestLimits, read_request, read_request_within};
use crate::http::ParseError;

async fn parse(raw: &[u8]) -> Result<Option<super::HttpRequest>, ParseError> {
    let mut reader = raw;
    read_request(&mut reader, &RequestLimits::default()).await
}

#[tokio::test]
async fn parses_post_with_body() {
    let raw = b"POST /send-sms HTTP/1.1\r\nHost: phone\r\nContent-Length: 5\r\n\r\nhello";
    let request = parse(raw)
        .await
        .expect("request should parse")
        .expect("request should be present");

    assert_eq!(request.method(), &Method::Post);
    assert_eq!(request.path(), "/send-sms");
    assert_eq!(request.body(), b"hello");
    assert_eq!(request.content_length(), 5);
    assert_eq!(request.headers().get("host"), Some("phone"));
}

#[tokio::test]
async fn missing_content_length_means_empty_body() {
    let raw = b"GET /status HTTP/1.1\r\n\r\ntrailing bytes are ignored";
    let request = parse(raw)
        .await
        .expect("request should parse")
        .expect("request should be present");

    assert_eq!(request.method(), &Method::Get);
    assert!(request.body().is_empty());
}

#[rstest]
#[case("content-length")]
#[case("CONTENT-LENGTH")]
#[case("Content-length")]
#[tokio::test]
async fn content_length_is_case_insensitive(#[case] name: &str) {
    let raw = format!("POST /x HTTP/1.1\r\n{name}: 3\r\n\r\nabc");
    let request = parse(raw.as_bytes())
        .await
        .expect("request should parse")
        .expect("request should be present");
    assert_eq!(request.body(), b"abc");
}

#[tokio::test]
async fn last_header_value_wins() {
    let raw = b"POST /x HTTP/1.1\r\nContent-Length: 10\r\ncontent-length: 2\r\n\r\nok";
    let request = parse(raw)
        .await
        .expect("request should parse")
        .expect("request should be present");
    assert_eq!(request.body(), b"ok");
    assert_eq!(request.headers().len(), 1);
}

#[tokio::test]
async fn accepts_bare_newlines() {
    let raw = b"GET /status HTTP/1.1\nAccept: */*\n\n";
    let request = parse(raw)
        .await
        .expect("request should parse")
        .expect("request should be present");
    assert_eq!(request.path(), "/status");
    assert_eq!(request.headers().get("accept"), Some("*/*"));
}

#[tokio::test]
async fn empty_stream_yields_none() {
    assert!(parse(b"").await.expect("empty stream is not an error").is_none());
}

#[rstest]
#[case(b"GARBAGE\r\n\r\n".as_slice())]
#[case(b"\r\n\r\n".as_slice())]
#[tokio::test]
async fn rejects_single_token_request_line(#[case] raw: &[u8]) {
    let err = parse(raw).await.expect_err("request line must be rejected");
    assert!(matches!(err, ParseError::MalformedRequestLine(_)));
    let response = err.response().expect("malformed request gets a reply");
    assert_eq!(response.status(), 400);
}

#[rstest]
#[case(b"NONSENSE\r\n".as_slice())]
#[case(b"NONSENSE".as_slice())]
#[case(b"NONSENSE\r\nHost: x\r\n".as_slice())]
#[tokio::test]
async fn malformed_request_line_is_reported_when_headers_end_early(#[case] raw: &[u8]) {
    let err = parse(raw)
        .await
        .expect_err("request line must be rejected");
    assert!(matches!(err, ParseError::MalformedRequestLine(ref line) if line == "NONSENSE"));
    assert_eq!(err.response().map(|r| r.status()), Some(400));
}

#[tokio::test]
async fn malformed_request_line_wins_over_header_limits() {
    let limits = RequestLimits {
        max_headers: 1,
        max_line_bytes: 32,
        ..RequestLimits::default()
    };
    let raw = format!("NONSENSE\r\nA: 1\r\nB: {}\r\n\r\n", "b".repeat(64));
    let mut reader = raw.as_bytes();
    let err = read_request(&mut reader, &limits)
        .await
        .expect_err("request line must be rejected");
    assert!(matches!(err, ParseError::MalformedRequestLine(_)));
}

#[tokio::test]
async fn malformed_request_line_never_reads_a_body() {
    let mut reader = b"NONSENSE\r\nContent-Length: 4\r\n\r\nbody".as_slice();
    let err = read_request(&mut reader, &RequestLimits::default())
        .await
        .expect_err("request line must be rejected");
    assert!(matches!(err, ParseError::MalformedRequestLine(_)));
    assert_eq!(reader, b"body");
}

#[tokio::test(start_paused = true)]
async fn malformed_request_line_is_reported_when_deadline_fires() {
    let (mut client, server) = tokio::io::duplex(64);
    tokio::io::AsyncWriteExt::write_all(&mut client, b"NONSENSE\r\nHost: x\r\n")
        .await
        .expect("client write");
    let mut reader = tokio::io::BufReader::new(server);

    let err = read_request_within(
        &mut reader,
        &RequestLimits::default(),
        Some(Duration::from_millis(50)),
    )
    .await
    .expect_err("request line must be rejected");
    assert!(matches!(err, ParseError::MalformedRequestLine(_)));
    drop(client);
}

#[tokio::test(start_paused = true)]
async fn stalled_valid_request_times_out() {
    let (mut client, server) = tokio::io::duplex(64);
    tokio::io::AsyncWriteExt::write_all(&mut client, b"GET /status HTTP/1.1\r\n")
        .await
        .expect("client write");
    let mut reader = tokio::io::BufReader::new(server);

    let err = read_request_within(
        &mut reader,
        &RequestLimits::default(),
        Some(Duration::from_millis(50)),
    )
    .await
    .expect_err("stalled request must time out");
    assert!(matches!(err, ParseError::Timeout(limit) if limit == Duration::from_millis(50)));
    assert!(err.response().is_none());
    drop(client);
}

#[tokio::test]
async fn other_methods_are_preserved() {
    let request = parse(b"DELETE /status HTTP/1.1\r\n\r\n")
        .await
        .expect("request should parse")
        .expect("request should be present");
    assert_eq!(request.method(), &Method::Other("DELETE".into()));
    assert_eq!(request.method().to_string(), "DELETE");
}

#[tokio::test]
async fn short_body_is_a_length_mismatch() {
    let err = parse(b"POST /x HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc")
        .await
        .expect_err("short body must fail");
    assert!(matches!(
        err,
        ParseError::BodyLengthMismatch {
            expected: 10,
            received: 3
        }
    ));
    assert!(err.response().is_none());
}

#[tokio::test]
async fn non_numeric_content_length_is_rejected() {
    let err = parse(b"POST /x HTTP/1.1\r\nContent-Length: lots\r\n\r\n")
        .await
        .expect_err("content length must be numeric");
    assert!(matches!(err, ParseError::InvalidContentLength(ref v) if v == "lots"));
}

#[tokio::test]
async fn truncated_headers_are_rejected() {
    let err = parse(b"POST /x HTTP/1.1\r\nContent-Length: 3\r\n")
        .await
        .expect_err("header block must be terminated");
    assert!(matches!(err, ParseError::UnexpectedEof));
}

#[tokio::test]
async fn oversized_body_is_refused_before_reading() {
    let limits = RequestLimits {
        max_body_bytes: 4,
        ..RequestLimits::default()
    };
    let mut reader = b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello".as_slice();
    let err = read_request(&mut reader, &limits)
        .await
        .expect_err("body over the limit must be refused");
    assert!(matches!(
        err,
        ParseError::BodyTooLarge {
            declared: 5,
            limit: 4
        }
    ));
    assert_eq!(reader, b"hello", "body bytes must remain unread");
    assert_eq!(err.response().map(|r| r.status()), Some(413));
}

#[tokio::test]
async fn overlong_line_is_rejected() {
    let limits = RequestLimits {
        max_line_bytes: 16,
        ..RequestLimits::default()
    };
    let raw = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(64));
    let mut reader = raw.as_bytes();
    let err = read_request(&mut reader, &limits)
        .await
        .expect_err("line over the limit must fail");
    assert!(matches!(err, ParseError::LineTooLong { limit: 16 }));
}

#[tokio::test]
async fn header_count_is_capped() {
    let limits = RequestLimits {
        max_headers: 2,
        ..RequestLimits::default()
    };
    let mut reader = b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n".as_slice();
    let err = read_request(&mut reader, &limits)
        .await
        .expect_err("too many headers must fail");
    assert!(matches!(err, ParseError::TooManyHeaders { limit: 2 }));
}
