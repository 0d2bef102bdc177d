//! Asynchronous JSONL rechit reader that groups consecutive records into events

use super::measurement::{EventId, EventRecord, MeasurementRecord};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

pub struct EventReader<R> {
    lines: Lines<R>,
    source_label: String,
    line_no: usize,
    pending: Option<MeasurementRecord>,
    malformed_lines: u64,
    foreign_records: u64,
}

impl EventReader<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>, source_label: impl Into<String>) -> std::io::Result<Self> {
        let file = File::open(path.as_ref()).await?;
        log::info!("📖 Reading rechits from: {}", path.as_ref().display());
        Ok(Self::from_reader(BufReader::new(file), source_label))
    }
}

impl<R: AsyncBufRead + Unpin> EventReader<R> {
    pub fn from_reader(reader: R, source_label: impl Into<String>) -> Self {
        Self {
            lines: reader.lines(),
            source_label: source_label.into(),
            line_no: 0,
            pending: None,
            malformed_lines: 0,
            foreign_records: 0,
        }
    }

    /// Next record of the configured collection. Blank and malformed lines
    /// are skipped; malformed ones are logged and counted.
    async fn next_record(&mut self) -> std::io::Result<Option<MeasurementRecord>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match MeasurementRecord::from_jsonl(line) {
                Ok(record) if record.matches_source(&self.source_label) => return Ok(Some(record)),
                Ok(_) => self.foreign_records += 1,
                Err(e) => {
                    self.malformed_lines += 1;
                    log::warn!("Skipping malformed rechit on line {}: {}", self.line_no, e);
                }
            }
        }
        Ok(None)
    }

    /// Collect the next run of records sharing one (run, lumi, event) id
    pub async fn next_event(&mut self) -> std::io::Result<Option<EventRecord>> {
        let first = match self.pending.take() {
            Some(record) => record,
            None => match self.next_record().await? {
                Some(record) => record,
                None => return Ok(None),
            },
        };

        let id: EventId = first.event_id();
        let mut measurements = vec![first.into_measurement()];

        while let Some(record) = self.next_record().await? {
            if record.event_id() != id {
                self.pending = Some(record);
                break;
            }
            measurements.push(record.into_measurement());
        }

        Ok(Some(EventRecord { id, measurements }))
    }

    pub fn malformed_lines(&self) -> u64 {
        self.malformed_lines
    }

    /// Records dropped because they belong to another collection
    pub fn foreign_records(&self) -> u64 {
        self.foreign_records
    }
}
