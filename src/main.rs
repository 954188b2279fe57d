//! `sms-gateway` binary.
//!
//! Starts the HTTP gateway and, optionally, the inbound pipeline reading
//! fragment batches from stdin. Runs until Ctrl+C.

mod cli;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use sms_gateway::{
    CommandTransmitter,
    GatewayConfig,
    InboundPump,
    LogTransmitter,
    MessageTransmitter,
    Supervisor,
    inbound::{JsonLinesSink, LogSink, MessageSink, read_batches},
};
use tokio::{io::BufReader, sync::mpsc};
use tracing_subscriber::EnvFilter;

/// Fragment batches buffered between stdin and the pump.
const INBOUND_QUEUE: usize = 64;

fn gateway_config(cli: &cli::Cli) -> GatewayConfig {
    GatewayConfig {
        host: cli.host,
        port: cli.port,
        bind_attempts: cli.bind_attempts,
        workers: cli.workers,
        read_timeout: (cli.read_timeout_secs > 0)
            .then(|| Duration::from_secs(cli.read_timeout_secs)),
        max_body_bytes: cli.max_body_bytes,
        ..GatewayConfig::default()
    }
}

fn transmitter(cli: &cli::Cli) -> Result<Arc<dyn MessageTransmitter>, Box<dyn std::error::Error>> {
    match cli.send_command.as_deref() {
        Some(line) => {
            let command = CommandTransmitter::from_command_line(line)
                .ok_or("--send-command must name a program")?;
            tracing::info!(program = %command.program().display(), "sending through external command");
            Ok(Arc::new(command))
        }
        None => {
            tracing::info!("no send command configured; messages will only be logged");
            Ok(Arc::new(LogTransmitter::default()))
        }
    }
}

async fn spawn_inbound(cli: &cli::Cli) -> std::io::Result<()> {
    let sink: Arc<dyn MessageSink> = match &cli.inbox {
        Some(path) => Arc::new(JsonLinesSink::open(path).await?),
        None => Arc::new(LogSink),
    };
    let (tx, rx) = mpsc::channel(INBOUND_QUEUE);
    tokio::spawn(InboundPump::new(sink).run(rx));
    tokio::spawn(async move {
        match read_batches(BufReader::new(tokio::io::stdin()), tx).await {
            Ok(batches) => tracing::info!(batches, "inbound input closed"),
            Err(e) => tracing::error!(error = %e, "failed to read inbound batches"),
        }
    });
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    #[cfg(feature = "metrics")]
    if let Some(addr) = cli.metrics_addr {
        sms_gateway::metrics::install_prometheus_exporter(addr)?;
        tracing::info!(%addr, "metrics exporter listening");
    }
    #[cfg(not(feature = "metrics"))]
    if cli.metrics_addr.is_some() {
        tracing::warn!("built without the metrics feature; ignoring --metrics-addr");
    }

    let mut supervisor = Supervisor::new();
    let addr = supervisor
        .start(&gateway_config(&cli), transmitter(&cli)?)
        .await?;
    tracing::info!(%addr, "SMS gateway listening");

    if cli.inbound_stdin {
        spawn_inbound(&cli).await?;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    supervisor.stop().await;
    Ok(())
}
