use pfn_node::DataHandler;
use pfn_protocol::{DataItem, Package};

use crate::StudentDataItem;

const TAG: &str = "StudentInputHandler";

/// Decodes the JSON body of data packages into a [`StudentDataItem`].
/// Bodies that do not decode are dropped.
#[derive(Debug, Default)]
pub struct StudentInputHandler;

impl StudentInputHandler {
    pub fn new() -> Self {
        Self
    }
}

impl DataHandler<StudentDataItem> for StudentInputHandler {
    fn name(&self) -> &str {
        TAG
    }

    fn consume(&self, package: &mut Package<StudentDataItem>) -> bool {
        if !package.is_data() || package.item().is_some() {
            return false;
        }
        let Some(body) = package.text().filter(|body| !body.is_empty()) else {
            return false;
        };
        match StudentDataItem::from_wire(body) {
            Ok(student) => {
                tracing::debug!(handler = TAG, id = %student.id, "Decoded student");
                package.set_item(student);
                package.clear_text();
                false
            }
            Err(e) => {
                tracing::warn!(handler = TAG, error = %e, "Dropping undecodable student data");
                true
            }
        }
    }
}
