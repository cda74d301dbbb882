use std::sync::{Mutex, MutexGuard, PoisonError};

use pfn_protocol::DataItem;

/// Result of offering a record to a [`PendingMerge`].
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome<T> {
    /// A record with the same identity was waiting. It has been removed
    /// and merged into the offered record, which is returned complete.
    Merged { record: T, remaining: usize },
    /// Nothing matched; the offered record is now held.
    Held { pending: usize },
}

impl<T> MergeOutcome<T> {
    /// Container size after the operation.
    pub fn pending(&self) -> usize {
        match self {
            MergeOutcome::Merged { remaining, .. } => *remaining,
            MergeOutcome::Held { pending } => *pending,
        }
    }
}

/// Ordered, lock-guarded collection of partial records keyed by
/// [`DataItem::matches`]. Holds at most one entry per identity.
///
/// Lookup, insert and removal happen under one lock acquisition, so two
/// producers offering the same identity concurrently cannot both be held.
/// The merge itself runs after the lock is released.
#[derive(Debug)]
pub struct PendingMerge<T> {
    entries: Mutex<Vec<T>>,
}

impl<T: DataItem> PendingMerge<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Vec<T>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge `record` with its waiting counterpart, or hold it until one
    /// arrives. On a match the arriving record absorbs the stored one's
    /// fields and the stored one is discarded.
    pub fn take_match_or_hold(&self, mut record: T) -> MergeOutcome<T> {
        let (stored, remaining) = {
            let mut entries = self.guard();
            match entries.iter().position(|held| held.matches(&record)) {
                Some(idx) => {
                    let stored = entries.remove(idx);
                    (stored, entries.len())
                }
                None => {
                    entries.push(record);
                    let pending = entries.len();
                    tracing::trace!(pending, "Record held for merge");
                    return MergeOutcome::Held { pending };
                }
            }
        };
        record.merge_from(&stored);
        MergeOutcome::Merged { record, remaining }
    }

    /// Whether a record with the same identity as `wanted` is waiting.
    pub fn contains(&self, wanted: &T) -> bool {
        self.guard().iter().any(|held| held.matches(wanted))
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Copies of the waiting records, in arrival order.
    pub fn snapshot(&self) -> Vec<T> {
        self.guard().clone()
    }

    /// Remove and return every waiting record.
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.guard())
    }
}

impl<T: DataItem> Default for PendingMerge<T> {
    fn default() -> Self {
        Self::new()
    }
}
