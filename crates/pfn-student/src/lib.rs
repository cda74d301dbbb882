//! PFN Student - student record aggregation on processor nodes
//!
//! Nodes each contribute part of a student's record. Records travel as JSON
//! between nodes; handlers here decode and encode them, merge partial
//! records from the network with those read from local data files, grade
//! complete records and write the results out.

pub mod error;
pub mod file;
pub mod grader;
pub mod handlers;
pub mod item;

pub use error::StudentError;
pub use file::{StudentFileReader, StudentFileWriter};
pub use grader::{CruelGrader, GradeCalculator, GraderFactory, UsualGrader};
pub use handlers::{
    GradingHandler, PlainStudentFileHandler, StudentHandler, StudentInputHandler,
    StudentNetOutputHandler, StudentWriterHandler,
};
pub use item::{StudentDataItem, MAX_GRADE};
