//! Channel-driven consumer feeding fragment batches through reassembly.

use std::{io, sync::Arc};

use serde_json::Value;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};

use super::{MessageSink, RawInboundFragment, fragment::decode_fragment, reassemble};
use crate::metrics;

/// Raw fragment records delivered together by one platform notification.
///
/// Records are decoded individually so one corrupt fragment does not poison
/// its siblings.
pub type FragmentBatch = Vec<Value>;

/// Consumes fragment batches and stores the reassembled messages.
#[derive(Clone)]
pub struct InboundPump {
    sink: Arc<dyn MessageSink>,
}

impl std::fmt::Debug for InboundPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundPump")
            .field("sink", &"<dyn MessageSink>")
            .finish()
    }
}

impl InboundPump {
    #[must_use]
    pub fn new(sink: Arc<dyn MessageSink>) -> Self { Self { sink } }

    /// Process one batch, returning how many messages the sink accepted.
    ///
    /// Undecodable fragments are logged and skipped. Sink failures are logged
    /// and not retried.
    pub async fn process_batch(&self, batch: FragmentBatch) -> usize {
        let received = batch.len();
        let fragments: Vec<RawInboundFragment> = batch
            .into_iter()
            .enumerate()
            .filter_map(|(position, value)| match decode_fragment(value) {
                Ok(fragment) => Some(fragment),
                Err(e) => {
                    tracing::error!(position, error = %e, "dropping fragment");
                    None
                }
            })
            .collect();
        tracing::debug!(received, decoded = fragments.len(), "processing fragment batch");

        let mut stored = 0;
        for message in reassemble(fragments) {
            match self.sink.store(&message).await {
                Ok(()) => {
                    stored += 1;
                    metrics::inc_inbound_stored();
                }
                Err(e) => {
                    tracing::error!(sender = %message.sender, error = %e, "error storing message");
                }
            }
        }
        stored
    }

    /// Drain `batches` until every sender has been dropped.
    pub async fn run(self, mut batches: mpsc::Receiver<FragmentBatch>) {
        while let Some(batch) = batches.recv().await {
            self.process_batch(batch).await;
        }
        tracing::debug!("fragment channel closed; inbound pump stopping");
    }
}

/// Forward newline-delimited JSON batches from `reader` into `tx`.
///
/// Each line must be a JSON array of fragment records. Blank lines are
/// ignored and lines that are not arrays are logged and skipped. Stops at
/// end of input or when the receiving side is gone, returning the number of
/// batches forwarded.
///
/// # Errors
///
/// Returns any error raised while reading from `reader`.
pub async fn read_batches<R>(reader: R, tx: mpsc::Sender<FragmentBatch>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let batch = match serde_json::from_str::<FragmentBatch>(line) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed fragment batch");
                continue;
            }
        };
        if tx.send(batch).await.is_err() {
            tracing::debug!("inbound pump gone; no longer reading batches");
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}
