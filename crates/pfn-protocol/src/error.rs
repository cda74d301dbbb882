/// Errors raised while decoding packages or records.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty message")]
    EmptyMessage,

    #[error("missing ':' between kind and body")]
    MissingDelimiter,

    #[error("unknown package kind '{0}'")]
    UnknownKind(String),

    #[error("unknown control command '{0}'")]
    UnknownCommand(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
