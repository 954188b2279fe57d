//! Batch-scoped grouping and merging of inbound fragments.

use std::collections::{HashMap, hash_map::Entry};

use super::{RawInboundFragment, ReceivedMessage};

/// Identity of a reassembly group within one batch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct GroupKey {
    sender: String,
    reference: Option<u16>,
}

/// Fragments from one sender (and reference, when reported) awaiting merge.
#[derive(Debug)]
struct ReassemblyGroup {
    key: GroupKey,
    fragments: Vec<RawInboundFragment>,
}

impl ReassemblyGroup {
    /// Merge the group into a message. Empty merged bodies yield `None`.
    fn into_message(self) -> Option<ReceivedMessage> {
        let Self { key, mut fragments } = self;
        let parts = fragments.len();

        if parts > 1 {
            // Stable, so fragments without an index keep arrival order.
            fragments.sort_by_key(|f| f.part_index.unwrap_or(0));
        }
        let first = fragments.first()?;
        let sim_slot = first.sim_slot;
        let timestamp = fragments.iter().map(|f| f.timestamp).min()?;
        let body: String = fragments.iter().map(RawInboundFragment::body).collect();

        if body.is_empty() {
            tracing::debug!(sender = %key.sender, parts, "dropping message with empty body");
            return None;
        }
        if parts > 1 {
            tracing::debug!(
                sender = %key.sender,
                parts,
                reference = ?key.reference,
                "merged multipart message"
            );
        }
        Some(ReceivedMessage {
            sender: key.sender,
            body,
            timestamp,
            sim_slot,
        })
    }
}

/// Reconstruct logical messages from one batch of fragments.
///
/// Fragments are grouped by sender, and additionally by concatenation
/// reference when one is reported. Groups are emitted in the order their
/// first fragment appeared. A single-fragment group is emitted unchanged;
/// larger groups are ordered by part index (missing indices count as 0),
/// concatenated without a separator, and stamped with the earliest timestamp
/// and the SIM slot of the first part. Groups whose merged body is empty are
/// dropped.
///
/// Merging happens lazily as the returned iterator is advanced.
pub fn reassemble<I>(batch: I) -> impl Iterator<Item = ReceivedMessage>
where
    I: IntoIterator<Item = RawInboundFragment>,
{
    group(batch)
        .into_iter()
        .filter_map(ReassemblyGroup::into_message)
}

fn group<I>(batch: I) -> Vec<ReassemblyGroup>
where
    I: IntoIterator<Item = RawInboundFragment>,
{
    let mut groups: Vec<ReassemblyGroup> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for fragment in batch {
        let key = GroupKey {
            sender: fragment.sender().to_owned(),
            reference: fragment.reference,
        };
        match index.entry(key) {
            Entry::Occupied(slot) => groups[*slot.get()].fragments.push(fragment),
            Entry::Vacant(slot) => {
                let key = slot.key().clone();
                slot.insert(groups.len());
                groups.push(ReassemblyGroup {
                    key,
                    fragments: vec![fragment],
                });
            }
        }
    }
    groups
}
