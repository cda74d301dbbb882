//! PFN Network - datagram transport for processor nodes
//!
//! A [`NetworkReader`] receives UDP datagrams, decodes them into packages and
//! queues them for the node's dispatch loop. A [`NetworkWriter`] drains an
//! outbound queue and sends each package as one datagram to the next hop.
//! Delivery is fire-and-forget in both directions.

pub mod error;
pub mod queue;
pub mod reader;
pub mod transport;
pub mod writer;

pub use error::NetworkError;
pub use queue::PackageQueue;
pub use reader::NetworkReader;
pub use transport::{ReaderObserver, TransportConfig};
pub use writer::NetworkWriter;
