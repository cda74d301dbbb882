//! PFN State - holding area for records awaiting their counterpart.

pub mod pending;

pub use pending::{MergeOutcome, PendingMerge};
