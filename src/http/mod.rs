//! Minimal HTTP/1.1 primitives for the gateway endpoint.
//!
//! Only what the gateway needs is modelled: a single request per
//! connection, a `Content-Length` delimited body, and a fully materialised
//! JSON response. There is no keep-alive, chunked encoding, or TLS.

pub mod error;
pub mod request;
pub mod response;

pub use error::ParseError;
pub use request::{Headers, HttpRequest, Method, RequestLimits, read_request, read_request_within};
pub use response::{HttpResponse, status_text, write_response};
