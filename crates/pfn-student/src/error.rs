#[derive(Debug, thiserror::Error)]
pub enum StudentError {
    #[error("unknown grader {0:?}, expected \"usual\" or \"cruel\"")]
    UnknownGrader(String),

    #[error(transparent)]
    File(#[from] pfn_node::FileError),
}
