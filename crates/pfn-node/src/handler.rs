//! The handler chain.
//!
//! Handlers are consulted in the order they were added. Each one may
//! rewrite the package in place; the first handler that returns `true`
//! consumes it and nobody after it sees it.

use std::fmt;
use std::sync::Arc;

use pfn_protocol::Package;

/// Position of a handler in its node's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

impl HandlerId {
    pub fn index(&self) -> usize {
        self.0
    }

    /// Where processing resumes when a handler re-injects a package
    /// downstream of itself.
    pub fn next(&self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub trait DataHandler<T>: Send + Sync {
    fn name(&self) -> &str;

    /// Inspect and possibly rewrite `package`. Return `true` to consume it.
    fn consume(&self, package: &mut Package<T>) -> bool;

    /// Called once when the handler joins a chain.
    fn attached(&self, _id: HandlerId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    Consumed(HandlerId),
    Passed,
}

pub struct HandlerChain<T> {
    handlers: Vec<Arc<dyn DataHandler<T>>>,
}

impl<T> HandlerChain<T> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn push(&mut self, handler: Arc<dyn DataHandler<T>>) -> HandlerId {
        let id = HandlerId(self.handlers.len());
        self.handlers.push(handler);
        id
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    /// Thread `package` through the handlers from position `start` on.
    pub fn dispatch(&self, start: usize, package: &mut Package<T>) -> ChainOutcome {
        for (index, handler) in self.handlers.iter().enumerate().skip(start) {
            if handler.consume(package) {
                tracing::trace!(handler = handler.name(), position = index, "Package consumed");
                return ChainOutcome::Consumed(HandlerId(index));
            }
        }
        ChainOutcome::Passed
    }
}

impl<T> Default for HandlerChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for HandlerChain<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        seen: AtomicUsize,
        consume: bool,
    }

    impl Counting {
        fn new(consume: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: AtomicUsize::new(0),
                consume,
            })
        }
    }

    impl DataHandler<String> for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn consume(&self, _package: &mut Package<String>) -> bool {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.consume
        }
    }

    #[test]
    fn first_consumer_short_circuits() {
        let (a, b, c) = (Counting::new(false), Counting::new(true), Counting::new(false));
        let mut chain: HandlerChain<String> = HandlerChain::new();
        chain.push(a.clone());
        let b_id = chain.push(b.clone());
        chain.push(c.clone());

        let mut p = Package::data_text("x");
        assert_eq!(chain.dispatch(0, &mut p), ChainOutcome::Consumed(b_id));
        assert_eq!(a.seen.load(Ordering::SeqCst), 1);
        assert_eq!(b.seen.load(Ordering::SeqCst), 1);
        assert_eq!(c.seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispatch_from_a_later_position_skips_earlier_handlers() {
        let (a, b) = (Counting::new(true), Counting::new(false));
        let mut chain: HandlerChain<String> = HandlerChain::new();
        let a_id = chain.push(a.clone());
        chain.push(b.clone());

        let mut p = Package::data_text("x");
        assert_eq!(chain.dispatch(a_id.next(), &mut p), ChainOutcome::Passed);
        assert_eq!(a.seen.load(Ordering::SeqCst), 0);
        assert_eq!(b.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_chain_passes_everything() {
        let chain: HandlerChain<String> = HandlerChain::default();
        let mut p = Package::data_text("x");
        assert_eq!(chain.dispatch(0, &mut p), ChainOutcome::Passed);
    }
}
