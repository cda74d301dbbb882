//! Student data files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pfn_node::{DataFileReader, DataFileWriter, DataReaderObserver, EventCategory, FileError, NodeHandle};

use crate::{StudentDataItem, StudentError};

pub struct StudentFileReader;

impl StudentFileReader {
    pub async fn read(
        path: &Path,
        observer: &dyn DataReaderObserver<StudentDataItem>,
    ) -> Result<usize, FileError> {
        DataFileReader::read::<StudentDataItem>(path, observer).await
    }

    /// Read the node's configured data file in the background, feeding
    /// `observer`. Reports a warning when no data file is configured.
    pub fn spawn_configured<O>(handle: &NodeHandle<StudentDataItem>, observer: Arc<O>)
    where
        O: DataReaderObserver<StudentDataItem> + 'static,
    {
        let Some(path) = handle.config().and_then(|c| c.files.data_file) else {
            handle.report(EventCategory::Warning, "No data file configured, nothing to read");
            return;
        };
        handle.show_ui_message(format!("Reading student data from {}", path.display()));
        handle.spawn(async move {
            // Outcome already logged and reported to the observer.
            let _ = Self::read(&path, &*observer).await;
        });
    }
}

/// Appends graded students to a file, one JSON object per line.
#[derive(Debug)]
pub struct StudentFileWriter {
    inner: DataFileWriter,
}

impl StudentFileWriter {
    pub fn append(path: impl Into<PathBuf>) -> Result<Self, StudentError> {
        Ok(Self {
            inner: DataFileWriter::append(path)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    pub fn write(&mut self, student: &StudentDataItem) -> Result<(), StudentError> {
        Ok(self.inner.write(student)?)
    }
}
