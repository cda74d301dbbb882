use std::io;
use std::net::SocketAddr;

/// Transport failures. Each one affects only the direction that raised it.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("cannot resolve next hop '{0}'")]
    Resolve(String),

    #[error("send to {addr} failed: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("datagram of {0} bytes exceeds the UDP payload limit")]
    Oversized(usize),

    #[error("transport is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
