//! Handlers for student record pipelines.
//!
//! Typical chains:
//!
//! - first node: `[PlainStudentFileHandler, StudentNetOutputHandler]`
//! - middle node: `[StudentInputHandler, StudentHandler, StudentNetOutputHandler]`
//! - last node: `[StudentInputHandler, StudentHandler, GradingHandler,
//!   StudentWriterHandler, StudentNetOutputHandler]`

mod correlate;
mod grading;
mod input;
mod output;
mod plain_file;
mod writer;

pub use correlate::StudentHandler;
pub use grading::GradingHandler;
pub use input::StudentInputHandler;
pub use output::StudentNetOutputHandler;
pub use plain_file::PlainStudentFileHandler;
pub use writer::StudentWriterHandler;

/// Queue depth label for students waiting for their counterpart.
pub const PENDING_LABEL: &str = "students pending";
