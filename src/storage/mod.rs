//! Storage module for persisting converted CSV archives
//!
//! This module handles the destination side of the pipeline:
//! - The `ArchiveStore` trait the orchestrator writes through
//! - Date-partitioned CSV files with atomic replacement
//! - Existence checks that make repeated runs idempotent

mod csv_store;
mod traits;

pub use csv_store::CsvFileStore;
pub use traits::{ArchiveStore, StorageError, StorageResult};

