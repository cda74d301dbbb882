//! PFN Node - processor node orchestration
//!
//! A [`Node`] owns an ordered chain of [`DataHandler`]s, a datagram transport
//! and a configuration. Packages arriving from the network or injected by a
//! producer are threaded through the chain; whatever survives is sent to the
//! next hop.

pub mod config;
pub mod error;
pub mod events;
pub mod file;
pub mod handler;
pub mod node;

pub use config::{ConfigLoader, FileSection, NetworkSection, NodeConfig, NodeSection, TomlConfigLoader};
pub use error::{ConfigError, FileError, NodeError};
pub use events::{EventCategory, EventLog, NodeEvent, NodeObserver, NullObserver};
pub use file::{DataFileReader, DataFileWriter, DataReaderObserver};
pub use handler::{ChainOutcome, DataHandler, HandlerChain, HandlerId};
pub use node::{Node, NodeHandle, NodeOptions, NodeState};
