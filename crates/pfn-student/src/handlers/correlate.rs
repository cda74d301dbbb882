//! Merges student data from the previous node with the local data file.
//!
//! Whichever half of a record arrives first waits in a [`PendingMerge`].
//! When the other half arrives the two are merged and the complete record
//! continues down the chain exactly once: a network package carries on in
//! place, a file record is injected after this handler.

use std::sync::{Arc, OnceLock};

use pfn_node::{DataHandler, DataReaderObserver, EventCategory, FileError, HandlerId, NodeHandle};
use pfn_protocol::{ControlCommand, Package};
use pfn_state::{MergeOutcome, PendingMerge};

use super::PENDING_LABEL;
use crate::{StudentDataItem, StudentFileReader};

const TAG: &str = "StudentHandler";

pub struct StudentHandler {
    inner: Arc<Correlator>,
}

struct Correlator {
    node: NodeHandle<StudentDataItem>,
    pending: PendingMerge<StudentDataItem>,
    id: OnceLock<HandlerId>,
}

impl StudentHandler {
    pub fn new(node: NodeHandle<StudentDataItem>) -> Self {
        Self {
            inner: Arc::new(Correlator {
                node,
                pending: PendingMerge::new(),
                id: OnceLock::new(),
            }),
        }
    }

    /// Students waiting for their other half.
    pub fn pending(&self) -> usize {
        self.inner.pending.len()
    }

    /// Offer a record read from the local data file.
    pub fn handle_new_item(&self, student: StudentDataItem) {
        self.inner.handle_new_item(student);
    }
}

impl DataHandler<StudentDataItem> for StudentHandler {
    fn name(&self) -> &str {
        TAG
    }

    fn consume(&self, package: &mut Package<StudentDataItem>) -> bool {
        if package.command() == Some(ControlCommand::ReadFile) {
            StudentFileReader::spawn_configured(&self.inner.node, Arc::clone(&self.inner));
            return false;
        }
        if !package.is_data() {
            return false;
        }
        let Some(student) = package.take_item() else {
            return false;
        };

        let node = &self.inner.node;
        node.show_ui_message(format!("Got student data for {}", student.display_name()));
        match self.inner.pending.take_match_or_hold(student) {
            MergeOutcome::Merged { record, remaining } => {
                tracing::info!(handler = TAG, id = %record.id, "Merged network data with local data");
                node.show_ui_message("Found local student data, merging with received data.");
                node.update_queue_depth(PENDING_LABEL, remaining);
                package.set_item(record);
                false
            }
            MergeOutcome::Held { pending } => {
                node.show_ui_message("No local data for this student, waiting for it");
                node.update_queue_depth(PENDING_LABEL, pending);
                true
            }
        }
    }

    fn attached(&self, id: HandlerId) {
        if self.inner.id.set(id).is_err() {
            tracing::warn!(handler = TAG, "Handler added to a second chain, keeping first position");
        }
    }
}

impl DataReaderObserver<StudentDataItem> for Correlator {
    fn handle_new_item(&self, student: StudentDataItem) {
        if !self.node.is_running() {
            tracing::debug!(handler = TAG, id = %student.id, "Node stopped, file record ignored");
            return;
        }
        let Some(id) = self.id.get().copied() else {
            tracing::warn!(handler = TAG, "Not attached to a node, file record ignored");
            return;
        };

        self.node
            .show_ui_message(format!("Student data read from file for {}", student.display_name()));
        match self.pending.take_match_or_hold(student) {
            MergeOutcome::Merged { record, remaining } => {
                tracing::info!(handler = TAG, id = %record.id, "Merged file data with network data");
                self.node
                    .show_ui_message("Had received same student data from previous node, combining.");
                self.node.update_queue_depth(PENDING_LABEL, remaining);
                if let Err(e) = self.node.pass_to_next_handlers(id, Package::data_item(record)) {
                    tracing::debug!(handler = TAG, error = %e, "Merged record not delivered");
                }
            }
            MergeOutcome::Held { pending } => {
                self.node
                    .show_ui_message(format!("Holding {pending} students now."));
                self.node.update_queue_depth(PENDING_LABEL, pending);
            }
        }
    }

    fn read_finished(&self, result: &Result<usize, FileError>) {
        match result {
            Ok(count) => self
                .node
                .show_ui_message(format!("Read {count} students from the data file")),
            Err(e) => self
                .node
                .report(EventCategory::Error, format!("Reading student data failed: {e}")),
        }
    }
}
