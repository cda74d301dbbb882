use std::sync::{Arc, OnceLock};

use pfn_node::{DataHandler, DataReaderObserver, EventCategory, FileError, HandlerId, NodeHandle};
use pfn_protocol::{ControlCommand, Package};

use crate::{StudentDataItem, StudentFileReader};

const TAG: &str = "PlainStudentFileHandler";

/// On `readfile`, reads the configured data file in the background and
/// injects every student after itself in the chain. Merges nothing.
pub struct PlainStudentFileHandler {
    inner: Arc<Feeder>,
}

struct Feeder {
    node: NodeHandle<StudentDataItem>,
    id: OnceLock<HandlerId>,
}

impl PlainStudentFileHandler {
    pub fn new(node: NodeHandle<StudentDataItem>) -> Self {
        Self {
            inner: Arc::new(Feeder {
                node,
                id: OnceLock::new(),
            }),
        }
    }
}

impl DataHandler<StudentDataItem> for PlainStudentFileHandler {
    fn name(&self) -> &str {
        TAG
    }

    fn consume(&self, package: &mut Package<StudentDataItem>) -> bool {
        if package.command() == Some(ControlCommand::ReadFile) {
            StudentFileReader::spawn_configured(&self.inner.node, Arc::clone(&self.inner));
        }
        false
    }

    fn attached(&self, id: HandlerId) {
        if self.inner.id.set(id).is_err() {
            tracing::warn!(handler = TAG, "Handler added to a second chain, keeping first position");
        }
    }
}

impl DataReaderObserver<StudentDataItem> for Feeder {
    fn handle_new_item(&self, student: StudentDataItem) {
        let Some(id) = self.id.get().copied() else {
            return;
        };
        tracing::debug!(handler = TAG, id = %student.id, "Passing file record on");
        if let Err(e) = self.node.pass_to_next_handlers(id, Package::data_item(student)) {
            tracing::debug!(handler = TAG, error = %e, "File record not delivered");
        }
    }

    fn read_finished(&self, result: &Result<usize, FileError>) {
        if let Err(e) = result {
            self.node
                .report(EventCategory::Error, format!("Reading student data failed: {e}"));
        }
    }
}
