//! k-way chronological merge over recorder snapshots.
//!
//! Each recorder's snapshot is already sorted by timestamp, so the merge keeps
//! one heap entry per recorder (its unconsumed head) and repeatedly pops the
//! minimum. The heap holds at most one entry per recorder, giving O(N log k)
//! for N interactions spread over k recorders.

use crate::interaction::Interaction;
use crate::logical_clock::Timestamp;
use crate::recorder::{InteractionRecording, RecorderId};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::Arc;

/// One interaction produced by the merge, together with where it came from.
#[derive(Clone)]
pub struct MergedInteraction {
    pub recorder: Arc<dyn InteractionRecording>,
    /// Position of the interaction within its recorder.
    pub index: usize,
    pub interaction: Interaction,
}

impl MergedInteraction {
    pub fn recorder_id(&self) -> RecorderId {
        self.recorder.id()
    }
}

impl std::fmt::Debug for MergedInteraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedInteraction")
            .field("recorder", &self.recorder.id())
            .field("index", &self.index)
            .field("interaction", &self.interaction)
            .finish()
    }
}

struct Stream {
    recorder: Arc<dyn InteractionRecording>,
    interactions: Vec<Interaction>,
    cursor: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Head {
    timestamp: Timestamp,
    stream: usize,
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.stream.cmp(&other.stream))
    }
}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-pass iterator over the interactions of a set of recorders in
/// timestamp order. Build a fresh merge for every verification attempt.
pub struct ChronologicalMerge {
    streams: Vec<Stream>,
    heap: BinaryHeap<Reverse<Head>>,
    remaining: usize,
}

impl ChronologicalMerge {
    /// Snapshots every recorder (deduplicated by identity) up front. Recorders
    /// with nothing recorded are left out.
    pub fn new<I>(recorders: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn InteractionRecording>>,
    {
        let mut unique: BTreeMap<RecorderId, Arc<dyn InteractionRecording>> = BTreeMap::new();
        for recorder in recorders {
            unique.entry(recorder.id()).or_insert(recorder);
        }

        let streams = unique
            .into_values()
            .filter_map(|recorder| {
                let interactions = recorder.snapshot();
                (!interactions.is_empty()).then_some(Stream {
                    recorder,
                    interactions,
                    cursor: 0,
                })
            })
            .collect::<Vec<_>>();

        let heap = streams
            .iter()
            .enumerate()
            .map(|(stream, s)| {
                Reverse(Head {
                    timestamp: s.interactions[0].timestamp,
                    stream,
                })
            })
            .collect::<BinaryHeap<_>>();
        let remaining = streams.iter().map(|s| s.interactions.len()).sum();

        Self {
            streams,
            heap,
            remaining,
        }
    }

    /// Number of recorders that contributed at least one interaction.
    pub fn recorder_count(&self) -> usize {
        self.streams.len()
    }
}

impl Iterator for ChronologicalMerge {
    type Item = MergedInteraction;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse(head) = self.heap.pop()?;
        if let Some(Reverse(other)) = self.heap.peek() {
            assert_ne!(
                other.timestamp, head.timestamp,
                "logical clock invariant violated: timestamp {} issued twice; \
                 recorders merged together must share one LogicalClock",
                head.timestamp
            );
        }

        let stream = &mut self.streams[head.stream];
        let index = stream.cursor;
        let interaction = stream.interactions[index].clone();
        stream.cursor += 1;
        if let Some(next) = stream.interactions.get(stream.cursor) {
            assert!(
                next.timestamp > head.timestamp,
                "logical clock invariant violated: {} recorded timestamp {} after {}",
                stream.recorder.id(),
                next.timestamp,
                head.timestamp
            );
            self.heap.push(Reverse(Head {
                timestamp: next.timestamp,
                stream: head.stream,
            }));
        }
        self.remaining -= 1;

        Some(MergedInteraction {
            recorder: Arc::clone(&stream.recorder),
            index,
            interaction,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ChronologicalMerge {}
