use std::sync::{Mutex, PoisonError};

use pfn_node::{DataHandler, EventCategory, NodeHandle};
use pfn_protocol::Package;

use crate::{StudentDataItem, StudentFileWriter};

const TAG: &str = "StudentWriterHandler";

/// Appends graded students to the node's configured output file. The file
/// is opened on first use. Never consumes.
pub struct StudentWriterHandler {
    node: NodeHandle<StudentDataItem>,
    writer: Mutex<Option<StudentFileWriter>>,
}

impl StudentWriterHandler {
    pub fn new(node: NodeHandle<StudentDataItem>) -> Self {
        Self {
            node,
            writer: Mutex::new(None),
        }
    }

    fn write(&self, student: &StudentDataItem) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if writer.is_none() {
            let Some(path) = self.node.config().and_then(|c| c.files.output_file) else {
                tracing::debug!(handler = TAG, "No output file configured");
                return;
            };
            match StudentFileWriter::append(&path) {
                Ok(opened) => *writer = Some(opened),
                Err(e) => {
                    self.node
                        .report(EventCategory::Warning, format!("Cannot open output file: {e}"));
                    return;
                }
            }
        }
        if let Some(out) = writer.as_mut() {
            match out.write(student) {
                Ok(()) => tracing::debug!(handler = TAG, id = %student.id, path = %out.path().display(), "Student written"),
                Err(e) => self
                    .node
                    .report(EventCategory::Warning, format!("Writing student failed: {e}")),
            }
        }
    }
}

impl DataHandler<StudentDataItem> for StudentWriterHandler {
    fn name(&self) -> &str {
        TAG
    }

    fn consume(&self, package: &mut Package<StudentDataItem>) -> bool {
        if let Some(student) = package.item().filter(|s| s.grade.is_some()) {
            self.write(student);
        }
        false
    }
}
