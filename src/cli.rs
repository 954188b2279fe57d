//! Command line interface for the `sms-gateway` binary.
//!
//! Every flag can also be supplied through an `SMS_GATEWAY_*` environment
//! variable. The build script renders a man page from this definition.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use clap::Parser;

/// Command line arguments for the `sms-gateway` binary.
#[derive(Debug, Parser)]
#[command(
    name = "sms-gateway",
    version,
    about = "HTTP gateway that sends and collects SMS messages"
)]
pub struct Cli {
    /// Interface to listen on.
    #[arg(long, env = "SMS_GATEWAY_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// First port to try; the following ports are tried if it is taken.
    #[arg(short, long, env = "SMS_GATEWAY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Number of consecutive ports to try before giving up.
    #[arg(long, env = "SMS_GATEWAY_BIND_ATTEMPTS", default_value_t = 5)]
    pub bind_attempts: u16,

    /// Maximum number of connections served at once.
    #[arg(short, long, env = "SMS_GATEWAY_WORKERS", default_value_t = 10)]
    pub workers: usize,

    /// Seconds allowed for a client to send a complete request; 0 disables the deadline.
    #[arg(long, env = "SMS_GATEWAY_READ_TIMEOUT", default_value_t = 30)]
    pub read_timeout_secs: u64,

    /// Largest request body accepted, in bytes.
    #[arg(long, env = "SMS_GATEWAY_MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Program that delivers messages. It is run with the recipient and body
    /// appended as its last two arguments. Without it messages are only logged.
    #[arg(long, env = "SMS_GATEWAY_SEND_COMMAND")]
    pub send_command: Option<String>,

    /// File receiving reassembled inbound messages as JSON lines.
    #[arg(long, env = "SMS_GATEWAY_INBOX")]
    pub inbox: Option<PathBuf>,

    /// Read inbound fragment batches from stdin, one JSON array per line.
    #[arg(long, env = "SMS_GATEWAY_INBOUND_STDIN")]
    pub inbound_stdin: bool,

    /// Address for the Prometheus metrics endpoint.
    #[arg(long, env = "SMS_GATEWAY_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}
