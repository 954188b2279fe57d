//! Errors raised while reading a request off the wire.

use std::{io, time::Duration};

use thiserror::Error;

use super::HttpResponse;

/// Failures encountered while parsing a request.
///
/// Every variant is fatal for the connection it occurred on. Some variants
/// still warrant a reply before the connection is closed; see
/// [`ParseError::response`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// The request line had fewer than two space-delimited tokens.
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    /// A request or header line exceeded the configured cap.
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
    /// The client sent more header lines than allowed.
    #[error("more than {limit} header lines")]
    TooManyHeaders { limit: usize },
    /// `Content-Length` was present but not a non-negative integer.
    #[error("invalid Content-Length value: {0:?}")]
    InvalidContentLength(String),
    /// The declared body is larger than the configured cap.
    #[error("declared body of {declared} bytes exceeds limit of {limit}")]
    BodyTooLarge { declared: usize, limit: usize },
    /// The stream ended before the declared body was read.
    #[error("body ended after {received} of {expected} bytes")]
    BodyLengthMismatch { expected: usize, received: usize },
    /// The stream ended in the middle of the header block.
    #[error("connection closed before headers completed")]
    UnexpectedEof,
    /// The per-connection read deadline elapsed.
    #[error("request read timed out after {0:?}")]
    Timeout(Duration),
    /// Reading from the socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    /// Reply owed to the client for this failure, if any.
    ///
    /// Malformed request lines receive a 400 and oversized bodies a 413; all
    /// other failures abort the connection without a response.
    #[must_use]
    pub fn response(&self) -> Option<HttpResponse> {
        match self {
            Self::MalformedRequestLine(_) => {
                Some(HttpResponse::text(400, "Invalid request format"))
            }
            Self::BodyTooLarge { .. } => Some(HttpResponse::text(413, "Payload too large")),
            _ => None,
        }
    }
}
