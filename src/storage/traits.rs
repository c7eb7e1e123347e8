//! Storage traits and error types
//!
//! This module defines the trait interface for CSV archive destinations and
//! associated error types.

use crate::archive::ArchiveKind;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Destination {0} has no parent directory")]
    NoParent(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for CSV archive destinations
///
/// A destination holds at most one CSV per (date, kind). Its presence is
/// what makes a run idempotent, so `exists` must reflect completed writes
/// only; a failed write leaves the destination as it was.
pub trait ArchiveStore: Send + Sync {
    /// Location of the CSV for `date` and `kind`
    fn path_for(&self, date: NaiveDate, kind: ArchiveKind) -> PathBuf;

    /// Whether a CSV for `date` and `kind` has already been written
    fn exists(&self, date: NaiveDate, kind: ArchiveKind) -> StorageResult<bool>;

    /// Writes `csv` for `date` and `kind`, replacing any previous file
    ///
    /// # Arguments
    ///
    /// * `date` - Race date of the archive
    /// * `kind` - Results or programs
    /// * `csv` - Complete CSV text
    ///
    /// # Returns
    ///
    /// The path written
    fn write(&self, date: NaiveDate, kind: ArchiveKind, csv: &str) -> StorageResult<PathBuf>;
}
