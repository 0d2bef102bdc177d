//! Writer backend trait for the histogram store
//!
//! Defines the interface for persisting exported timing maps to different backends.

use super::snapshot::HistogramEntry;
use async_trait::async_trait;

#[derive(Debug)]
pub enum HistogramWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
}

impl From<std::io::Error> for HistogramWriterError {
    fn from(err: std::io::Error) -> Self {
        HistogramWriterError::Io(err)
    }
}

impl From<serde_json::Error> for HistogramWriterError {
    fn from(err: serde_json::Error) -> Self {
        HistogramWriterError::Serialization(err)
    }
}

impl From<rusqlite::Error> for HistogramWriterError {
    fn from(err: rusqlite::Error) -> Self {
        HistogramWriterError::Database(err.to_string())
    }
}

impl std::fmt::Display for HistogramWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistogramWriterError::Io(e) => write!(f, "IO error: {}", e),
            HistogramWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            HistogramWriterError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for HistogramWriterError {}

/// Backend trait for writing named histogram entries
#[async_trait]
pub trait HistogramStoreBackend: Send {
    /// Write (or replace) a single named entry
    async fn write_entry(&mut self, entry: &HistogramEntry) -> Result<(), HistogramWriterError>;

    /// Flush pending writes to storage
    async fn flush(&mut self) -> Result<(), HistogramWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
