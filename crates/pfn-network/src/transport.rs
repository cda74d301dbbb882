//! Shared transport settings and the arrival observer contract.

use tokio::sync::Notify;

use pfn_protocol::MAX_DATAGRAM_SIZE;

use crate::NetworkError;

/// Configuration for the datagram transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Size of the receive buffer. Longer datagrams are truncated by the
    /// OS and will then fail to parse.
    pub recv_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

/// Notified by a [`NetworkReader`](crate::NetworkReader) each time a package
/// has been queued. Called from the receive task, so it must not block.
pub trait ReaderObserver: Send + Sync {
    fn received_data(&self);

    /// The receive loop hit an error it cannot recover from and has exited.
    /// Packages already queued stay readable.
    fn reader_failed(&self, _error: &NetworkError) {}
}

/// A `Notify` wakes one waiting dispatch loop, or stores a permit so a
/// notification arriving before the loop waits is not lost.
impl ReaderObserver for Notify {
    fn received_data(&self) {
        self.notify_one();
    }

    fn reader_failed(&self, _error: &NetworkError) {
        self.notify_one();
    }
}
