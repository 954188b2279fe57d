//! Inbound message reconstruction.
//!
//! The platform delivers received fragments in batches, one batch per
//! hardware notification. [`reassemble`] groups a batch by sender, restores
//! part order, and merges each group into a single [`ReceivedMessage`].
//! [`InboundPump`] drives that function from a channel and hands the results
//! to a [`MessageSink`].
//!
//! Grouping state lives only for the duration of one batch. Fragments of the
//! same logical message that arrive in separate batches are emitted as
//! separate messages.

pub mod fragment;
pub mod pump;
pub mod reassembly;
pub mod sink;

pub use fragment::{FragmentDecodeError, RawInboundFragment, ReceivedMessage, UNKNOWN_SENDER};
pub use pump::{FragmentBatch, InboundPump, read_batches};
pub use reassembly::reassemble;
pub use sink::{JsonLinesSink, LogSink, MessageSink, SinkError};
