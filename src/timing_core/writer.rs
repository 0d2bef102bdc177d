//! Unified writer interface for timing maps
//!
//! Routes writes to either JSONL or SQLite backend based on configuration.

use super::jsonl_writer::HistogramJsonlWriter;
use super::snapshot::HistogramEntry;
use super::sqlite_writer::SqliteHistogramWriter;
use super::writer_backend::{HistogramStoreBackend, HistogramWriterError};
use crate::config::BackendType;
use std::path::PathBuf;

/// Unified writer that routes to either JSONL or SQLite backend
pub enum HistogramWriter {
    Jsonl(HistogramJsonlWriter),
    Sqlite(SqliteHistogramWriter),
}

impl HistogramWriter {
    /// Create a new histogram writer based on backend type
    pub fn new(backend: BackendType, base_path: PathBuf) -> Result<Self, HistogramWriterError> {
        match backend {
            BackendType::Jsonl => {
                let writer = HistogramJsonlWriter::new(base_path)?;
                Ok(HistogramWriter::Jsonl(writer))
            }
            BackendType::Sqlite => {
                let writer = SqliteHistogramWriter::new(base_path)?;
                Ok(HistogramWriter::Sqlite(writer))
            }
        }
    }

    fn backend(&mut self) -> &mut dyn HistogramStoreBackend {
        match self {
            HistogramWriter::Jsonl(w) => w,
            HistogramWriter::Sqlite(w) => w,
        }
    }

    pub async fn write_entry(&mut self, entry: &HistogramEntry) -> Result<(), HistogramWriterError> {
        self.backend().write_entry(entry).await
    }

    /// Write every entry, then flush
    pub async fn write_all(&mut self, entries: &[HistogramEntry]) -> Result<usize, HistogramWriterError> {
        for entry in entries {
            self.write_entry(entry).await?;
        }
        self.flush().await?;
        Ok(entries.len())
    }

    /// Flush pending writes to storage
    pub async fn flush(&mut self) -> Result<(), HistogramWriterError> {
        self.backend().flush().await
    }

    /// Get backend type for logging
    pub fn backend_type(&self) -> &'static str {
        match self {
            HistogramWriter::Jsonl(_) => "JSONL",
            HistogramWriter::Sqlite(_) => "SQLite",
        }
    }
}
