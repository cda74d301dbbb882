use pfn_node::DataHandler;
use pfn_protocol::{DataItem, Package};

use crate::StudentDataItem;

const TAG: &str = "StudentNetOutputHandler";

/// Replaces a decoded student with its JSON text, ready for the next hop.
#[derive(Debug, Default)]
pub struct StudentNetOutputHandler;

impl StudentNetOutputHandler {
    pub fn new() -> Self {
        Self
    }
}

impl DataHandler<StudentDataItem> for StudentNetOutputHandler {
    fn name(&self) -> &str {
        TAG
    }

    fn consume(&self, package: &mut Package<StudentDataItem>) -> bool {
        if package.is_data() {
            if let Some(student) = package.take_item() {
                tracing::debug!(handler = TAG, id = %student.id, "Encoding student as JSON");
                package.set_text(student.to_wire_body());
            }
        }
        false
    }
}
