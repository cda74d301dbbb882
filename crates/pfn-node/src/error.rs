use std::io;
use std::path::PathBuf;

use pfn_network::NetworkError;

/// Configuration could not be loaded. Fatal to `start`, recoverable by
/// configuring again.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read configuration {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed configuration {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the line-oriented file collaborators.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} has no content type header", .0.display())]
    MissingHeader(PathBuf),

    #[error("file I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("node is not configured")]
    NotConfigured,

    #[error("node is not running")]
    NotRunning,

    #[error("node is running")]
    AlreadyRunning,

    #[error("no next hop configured")]
    NoNextHop,

    #[error(transparent)]
    Transport(#[from] NetworkError),
}
