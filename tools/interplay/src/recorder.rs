//! Thread-safe, append-only interaction logs.
//!
//! A [`Recorder`] is owned by one collaborator (test double) and may be written
//! from any number of threads. Acquiring the timestamp and appending the entry
//! happen under the same write lock, so a recorder's entries are always in
//! timestamp order and that order equals arrival order.

use crate::interaction::{Interaction, SourceLocation};
use crate::logical_clock::{shared_clock, LogicalClock, Timestamp};
use serde::Serialize;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

static NEXT_RECORDER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a recorder, independent of its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RecorderId(u64);

impl RecorderId {
    fn issue() -> Self {
        Self(NEXT_RECORDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecorderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "recorder-{}", self.0)
    }
}

/// Chronological access to recorded interactions, independent of the value
/// type. This is the view the verifier merges over.
pub trait InteractionRecording: Send + Sync {
    fn id(&self) -> RecorderId;

    /// Point-in-time copy of the recorded interactions, in timestamp order.
    fn snapshot(&self) -> Vec<Interaction>;
}

struct Entry<V> {
    interaction: Interaction,
    value: V,
}

pub struct Recorder<V> {
    id: RecorderId,
    clock: Arc<LogicalClock>,
    entries: RwLock<Vec<Entry<V>>>,
}

impl<V> Recorder<V> {
    /// Creates a recorder on the process-wide [`shared_clock`].
    pub fn new() -> Self {
        Self::with_clock(shared_clock())
    }

    pub fn with_clock(clock: Arc<LogicalClock>) -> Self {
        Self {
            id: RecorderId::issue(),
            clock,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> RecorderId {
        self.id
    }

    pub fn clock(&self) -> &Arc<LogicalClock> {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("recorder entries lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Interaction> {
        self.entries
            .read()
            .expect("recorder entries lock")
            .iter()
            .map(|entry| entry.interaction.clone())
            .collect()
    }

    /// Evaluates `predicate` against the value recorded at `index` without
    /// cloning it. Returns `false` for an index that was never recorded.
    pub fn matches_at(&self, index: usize, predicate: impl FnOnce(&V) -> bool) -> bool {
        let entries = self.entries.read().expect("recorder entries lock");
        entries.get(index).is_some_and(|entry| predicate(&entry.value))
    }

    pub fn value_at(&self, index: usize) -> Option<V>
    where
        V: Clone,
    {
        self.entries
            .read()
            .expect("recorder entries lock")
            .get(index)
            .map(|entry| entry.value.clone())
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.entries
            .read()
            .expect("recorder entries lock")
            .iter()
            .map(|entry| entry.value.clone())
            .collect()
    }
}

impl<V: Debug> Recorder<V> {
    /// Records `value`, stamping it with the next logical timestamp and the
    /// caller's source location.
    #[track_caller]
    pub fn record(&self, value: V) -> Timestamp {
        let location = SourceLocation::caller();
        let description = format!("{value:?}");
        let mut entries = self.entries.write().expect("recorder entries lock");
        // The timestamp must be drawn while holding the entries lock, otherwise
        // two writers could append out of timestamp order.
        let timestamp = self.clock.next();
        entries.push(Entry {
            interaction: Interaction {
                description,
                timestamp,
                location,
            },
            value,
        });
        timestamp
    }
}

impl<V> Default for Recorder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for Recorder<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

impl<V: Send + Sync> InteractionRecording for Recorder<V> {
    fn id(&self) -> RecorderId {
        self.id
    }

    fn snapshot(&self) -> Vec<Interaction> {
        Recorder::snapshot(self)
    }
}
