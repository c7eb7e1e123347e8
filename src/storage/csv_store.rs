//! Date-partitioned CSV files on the local filesystem

use crate::archive::ArchiveKind;
use crate::storage::{ArchiveStore, StorageError, StorageResult};
use chrono::NaiveDate;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Stores CSVs as `{data_dir}/{results|programs}/{YYYY}/{MM}/{DD}.csv`
#[derive(Debug, Clone)]
pub struct CsvFileStore {
    data_dir: PathBuf,
}

impl CsvFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl ArchiveStore for CsvFileStore {
    fn path_for(&self, date: NaiveDate, kind: ArchiveKind) -> PathBuf {
        self.data_dir
            .join(kind.output_dir())
            .join(date.format("%Y").to_string())
            .join(date.format("%m").to_string())
            .join(format!("{}.csv", date.format("%d")))
    }

    fn exists(&self, date: NaiveDate, kind: ArchiveKind) -> StorageResult<bool> {
        Ok(self.path_for(date, kind).try_exists()?)
    }

    fn write(&self, date: NaiveDate, kind: ArchiveKind, csv: &str) -> StorageResult<PathBuf> {
        let path = self.path_for(date, kind);
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::NoParent(path.clone()))?;

        std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;

        // Written next to the destination so the rename stays on one filesystem
        let write_err = |source| StorageError::Write {
            path: path.clone(),
            source,
        };
        let mut temp = NamedTempFile::new_in(parent).map_err(write_err)?;
        temp.write_all(csv.as_bytes()).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&path).map_err(|e| write_err(e.error))?;

        tracing::debug!(path = %path.display(), bytes = csv.len(), "Wrote CSV");
        Ok(path)
    }
}
