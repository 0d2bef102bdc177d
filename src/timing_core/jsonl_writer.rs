//! JSONL writer for timing maps - one histogram entry per line

use super::snapshot::HistogramEntry;
use super::writer_backend::{HistogramStoreBackend, HistogramWriterError};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const JSONL_FILE_NAME: &str = "timing_maps.jsonl";

pub struct HistogramJsonlWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    written: usize,
}

impl HistogramJsonlWriter {
    /// Create `timing_maps.jsonl` under `base_path`, truncating a previous job's output
    pub fn new(base_path: impl AsRef<Path>) -> std::io::Result<Self> {
        std::fs::create_dir_all(base_path.as_ref())?;
        let path = base_path.as_ref().join(JSONL_FILE_NAME);
        let file = File::create(&path)?;

        log::info!("📝 Writing timing maps to: {}", path.display());

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_entry(&mut self, entry: &HistogramEntry) -> Result<(), HistogramWriterError> {
        let json = serde_json::to_string(entry)?;
        writeln!(self.writer, "{}", json)?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl Drop for HistogramJsonlWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[async_trait]
impl HistogramStoreBackend for HistogramJsonlWriter {
    async fn write_entry(&mut self, entry: &HistogramEntry) -> Result<(), HistogramWriterError> {
        HistogramJsonlWriter::write_entry(self, entry)
    }

    async fn flush(&mut self) -> Result<(), HistogramWriterError> {
        HistogramJsonlWriter::flush(self)?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}
