/// Separates the kind discriminator from the body on the wire.
pub const WIRE_DELIMITER: char = ':';

/// Wire discriminator of control packages.
pub const CONTROL_TAG: &str = "control";

/// Wire discriminator of data packages.
pub const DATA_TAG: &str = "data";

pub const CMD_PING: &str = "ping";
pub const CMD_READFILE: &str = "readfile";
pub const CMD_SHUTDOWN: &str = "shutdown";

/// Largest UDP payload over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
