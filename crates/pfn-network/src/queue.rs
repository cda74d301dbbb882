use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pfn_protocol::Package;

/// FIFO of packages shared between a socket task and the dispatch loop.
///
/// Every operation takes the lock for a single push or pop; popping an
/// empty queue returns `None` instead of waiting.
#[derive(Debug)]
pub struct PackageQueue<T> {
    inner: Mutex<VecDeque<Package<T>>>,
}

impl<T> PackageQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, VecDeque<Package<T>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, package: Package<T>) {
        self.guard().push_back(package);
    }

    pub fn pop(&self) -> Option<Package<T>> {
        self.guard().pop_front()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Remove everything still queued.
    pub fn drain(&self) -> Vec<Package<T>> {
        self.guard().drain(..).collect()
    }
}

impl<T> Default for PackageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
