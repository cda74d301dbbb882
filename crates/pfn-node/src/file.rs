//! Line-oriented data files.
//!
//! A data file starts with a content type line naming what the following
//! lines describe. Blank lines and lines starting with `#` are skipped
//! everywhere. Every remaining line is handed to [`DataItem::parse_line`];
//! lines that fail to parse are logged and skipped.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};

use pfn_protocol::DataItem;

use crate::FileError;

const TAG: &str = "DataFileReader";

/// Receives the records of a file as they are read.
pub trait DataReaderObserver<T>: Send + Sync {
    fn handle_new_item(&self, item: T);

    /// Called once per read with the number of records delivered.
    fn read_finished(&self, _result: &Result<usize, FileError>) {}
}

pub struct DataFileReader;

impl DataFileReader {
    /// Read `path`, delivering each record to `observer`, and return how
    /// many were delivered.
    pub async fn read<T: DataItem>(
        path: &Path,
        observer: &dyn DataReaderObserver<T>,
    ) -> Result<usize, FileError> {
        let result = Self::read_records(path, observer).await;
        match &result {
            Ok(count) => {
                tracing::info!(reader = TAG, path = %path.display(), count, "Finished reading data file")
            }
            Err(e) => tracing::warn!(reader = TAG, path = %path.display(), error = %e, "Data file read failed"),
        }
        observer.read_finished(&result);
        result
    }

    async fn read_records<T: DataItem>(
        path: &Path,
        observer: &dyn DataReaderObserver<T>,
    ) -> Result<usize, FileError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|source| FileError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let mut lines = BufReader::new(file).lines();

        let mut content_type: Option<String> = None;
        let mut delivered = 0;
        let mut line_no = 0usize;
        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            if content_type.is_none() {
                content_type = Some(line.trim().to_string());
                continue;
            }
            match T::parse_line(line, content_type.as_deref().unwrap_or_default()) {
                Ok(item) => {
                    observer.handle_new_item(item);
                    delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(reader = TAG, line = line_no, error = %e, "Skipping unreadable line");
                }
            }
        }

        if content_type.is_none() {
            return Err(FileError::MissingHeader(path.to_path_buf()));
        }
        Ok(delivered)
    }
}

/// Appends serialized records to a file, one per line.
#[derive(Debug)]
pub struct DataFileWriter {
    path: PathBuf,
    file: File,
}

impl DataFileWriter {
    /// Open `path` for appending, creating it if needed.
    pub fn append(path: impl Into<PathBuf>) -> Result<Self, FileError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| FileError::Open {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write<T: DataItem>(&mut self, item: &T) -> Result<(), FileError> {
        writeln!(self.file, "{}", item.to_wire_body())?;
        self.file.flush()?;
        Ok(())
    }
}
