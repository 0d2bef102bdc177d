//! SQLite writer for timing maps
//!
//! One row per named histogram; re-running a job replaces the rows by name.

use super::snapshot::HistogramEntry;
use super::writer_backend::{HistogramStoreBackend, HistogramWriterError};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;

pub struct SqliteHistogramWriter {
    conn: Connection,
    batch: Vec<HistogramEntry>,
    batch_size: usize,
    written: usize,
}

const CREATE_HISTOGRAMS: &str = "CREATE TABLE IF NOT EXISTS histograms (
    name TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    entries INTEGER NOT NULL,
    payload TEXT NOT NULL,
    written_at INTEGER NOT NULL
)";

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    log::debug!("SQLite journal_mode={}", mode);
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(())
}

impl SqliteHistogramWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, HistogramWriterError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path.as_ref())?;
        apply_pragmas(&conn)?;

        conn.execute(CREATE_HISTOGRAMS, [])?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_histograms_kind ON histograms(kind)",
            [],
        )?;

        log::info!("✅ SQLite histogram store initialized: {}", db_path.as_ref().display());

        Ok(Self {
            conn,
            batch: Vec::with_capacity(500),
            batch_size: 500,
            written: 0,
        })
    }

    /// Upsert the pending batch in one transaction. The batch is kept when
    /// the transaction fails so a later flush can retry it.
    fn write_batch(&mut self) -> Result<(), HistogramWriterError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        upsert_entries(&mut self.conn, &self.batch)?;

        self.written += self.batch.len();
        log::debug!("✅ Wrote {} histogram rows", self.batch.len());
        self.batch.clear();
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

fn upsert_entries(conn: &mut Connection, entries: &[HistogramEntry]) -> Result<(), HistogramWriterError> {
    let written_at = chrono::Utc::now().timestamp();
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO histograms (name, kind, title, entries, payload, written_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO UPDATE SET
                kind = excluded.kind,
                title = excluded.title,
                entries = excluded.entries,
                payload = excluded.payload,
                written_at = excluded.written_at",
        )?;
        for entry in entries {
            let payload = serde_json::to_string(&entry.payload)?;
            stmt.execute(params![
                entry.name,
                entry.kind(),
                entry.title,
                entry.entries() as i64,
                payload,
                written_at
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[async_trait]
impl HistogramStoreBackend for SqliteHistogramWriter {
    async fn write_entry(&mut self, entry: &HistogramEntry) -> Result<(), HistogramWriterError> {
        self.batch.push(entry.clone());
        if self.batch.len() >= self.batch_size {
            self.write_batch()?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), HistogramWriterError> {
        self.write_batch()
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
