//! Request-line, header, and body parsing.
//!
//! [`read_request`] consumes exactly one request from a buffered reader. The
//! only header with semantic meaning is `Content-Length`, which decides how
//! many body bytes are read; everything else is stored for handlers that
//! care.

use std::{collections::HashMap, fmt, future::Future, time::Duration};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt},
    time::{Instant, timeout_at},
};

use super::ParseError;

#[cfg(test)]
mod tests;

/// Request method. Anything other than the three methods the gateway knows
/// about is kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Options,
    Other(String),
}

impl Method {
    /// Interpret a request-line token. Matching is case-sensitive, as
    /// HTTP methods are.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Options => "OPTIONS",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Header map with case-insensitive names. Repeated headers keep the last
/// value seen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    /// Insert or replace a header.
    pub fn insert(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_ascii_lowercase(), value.to_owned());
    }

    /// Look up a header by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// A fully read request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    method: Method,
    path: String,
    headers: Headers,
    body: Vec<u8>,
}

impl HttpRequest {
    /// Assemble a request from parts. Mostly useful for driving handlers
    /// directly in tests.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Headers::default(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method { &self.method }

    #[must_use]
    pub fn path(&self) -> &str { &self.path }

    #[must_use]
    pub fn headers(&self) -> &Headers { &self.headers }

    #[must_use]
    pub fn body(&self) -> &[u8] { &self.body }

    /// Length of the body, which always equals the declared `Content-Length`.
    #[must_use]
    pub fn content_length(&self) -> usize { self.body.len() }
}

/// Caps applied while reading a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestLimits {
    /// Longest accepted request or header line, line terminator included.
    pub max_line_bytes: usize,
    /// Maximum number of header lines.
    pub max_headers: usize,
    /// Largest `Content-Length` the server will read.
    pub max_body_bytes: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 8 * 1024,
            max_headers: 100,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Read a single request from `reader`.
///
/// Returns `Ok(None)` when the peer closes the connection before sending a
/// request line. A request line with fewer than two tokens is reported as
/// [`ParseError::MalformedRequestLine`]; the header block is drained on a
/// best-effort basis first and the body is never read.
///
/// The read itself is unbounded in time; see [`read_request_within`] for a
/// deadline-aware variant.
///
/// # Errors
///
/// Returns a [`ParseError`] for malformed input, limit violations, a body
/// shorter than declared, or any socket error.
pub async fn read_request<R>(
    reader: &mut R,
    limits: &RequestLimits,
) -> Result<Option<HttpRequest>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    read_request_within(reader, limits, None).await
}

/// Read a single request, giving the client at most `read_timeout` to send it.
///
/// A malformed request line is still reported as
/// [`ParseError::MalformedRequestLine`] when the deadline fires while the
/// header block is being drained.
///
/// # Errors
///
/// As [`read_request`], plus [`ParseError::Timeout`] once the deadline
/// elapses.
pub async fn read_request_within<R>(
    reader: &mut R,
    limits: &RequestLimits,
    read_timeout: Option<Duration>,
) -> Result<Option<HttpRequest>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let deadline = read_timeout.map(|limit| (Instant::now() + limit, limit));

    let Some(request_line) = within(deadline, read_line(reader, limits.max_line_bytes)).await?
    else {
        return Ok(None);
    };

    let mut parts = request_line.split(' ');
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        if let Err(e) = within(deadline, read_headers(reader, limits)).await {
            tracing::debug!(error = %e, "header block after malformed request line not drained");
        }
        return Err(ParseError::MalformedRequestLine(request_line));
    };
    let method = Method::parse(method);
    let path = path.to_owned();

    let headers = within(deadline, read_headers(reader, limits)).await?;
    let declared = content_length(&headers)?;
    if declared > limits.max_body_bytes {
        return Err(ParseError::BodyTooLarge {
            declared,
            limit: limits.max_body_bytes,
        });
    }
    let body = within(deadline, read_body(reader, declared)).await?;

    Ok(Some(HttpRequest {
        method,
        path,
        headers,
        body,
    }))
}

/// Await `step`, failing with [`ParseError::Timeout`] past the deadline.
async fn within<F, T>(deadline: Option<(Instant, Duration)>, step: F) -> Result<T, ParseError>
where
    F: Future<Output = Result<T, ParseError>>,
{
    match deadline {
        Some((at, limit)) => timeout_at(at, step)
            .await
            .unwrap_or_else(|_| Err(ParseError::Timeout(limit))),
        None => step.await,
    }
}

async fn read_headers<R>(reader: &mut R, limits: &RequestLimits) -> Result<Headers, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = Headers::default();
    let mut count = 0_usize;
    loop {
        let Some(line) = read_line(reader, limits.max_line_bytes).await? else {
            return Err(ParseError::UnexpectedEof);
        };
        if line.is_empty() {
            return Ok(headers);
        }
        count += 1;
        if count > limits.max_headers {
            return Err(ParseError::TooManyHeaders {
                limit: limits.max_headers,
            });
        }
        // Lines without a colon carry nothing usable and are skipped.
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim(), value.trim());
        }
    }
}

fn content_length(headers: &Headers) -> Result<usize, ParseError> {
    match headers.get("content-length") {
        None => Ok(0),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(value.to_owned())),
    }
}

async fn read_body<R>(reader: &mut R, expected: usize) -> Result<Vec<u8>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut body = Vec::with_capacity(expected);
    let limit = u64::try_from(expected).unwrap_or(u64::MAX);
    (&mut *reader).take(limit).read_to_end(&mut body).await?;
    if body.len() != expected {
        return Err(ParseError::BodyLengthMismatch {
            expected,
            received: body.len(),
        });
    }
    Ok(body)
}

/// Read one line, stripping the `\r\n` or `\n` terminator.
///
/// Returns `Ok(None)` at end of stream. A final unterminated line is
/// returned as-is.
async fn read_line<R>(reader: &mut R, limit: usize) -> Result<Option<String>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX);
    let read = (&mut *reader).take(cap).read_until(b'\n', &mut buf).await?;
    if read == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if read >= limit {
        return Err(ParseError::LineTooLong { limit });
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
