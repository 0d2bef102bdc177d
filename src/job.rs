//! Timing-map job: feeds an event stream through the processor and exports the maps

use crate::config::TimingConfig;
use crate::timing_core::{
    EventOutcome, EventProcessor, EventReader, HistogramEntry, HistogramWriter, HistogramWriterError,
    ProcessingStats, TimeSliceRecorder,
};
use tokio::io::AsyncBufRead;

/// End-of-job counters reported by the binary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub stats: ProcessingStats,
    pub malformed_lines: u64,
    pub foreign_records: u64,
    pub booked_channels: usize,
}

pub struct TimingJob {
    processor: EventProcessor,
    malformed_lines: u64,
    foreign_records: u64,
}

impl TimingJob {
    pub fn new(config: &TimingConfig) -> Self {
        let mut processor = EventProcessor::new(
            config.energy_threshold,
            config.time_range_low,
            config.time_range_high,
        )
        .with_target_run(config.target_run_number);

        if let Some(energy) = config.diagnostic_energy {
            log::info!("🔬 Pulse-shape capture enabled above {} GeV", energy);
            processor = processor.with_diagnostic(Box::new(TimeSliceRecorder::new(energy)));
        }

        Self {
            processor,
            malformed_lines: 0,
            foreign_records: 0,
        }
    }

    /// Drain the reader, one event at a time
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: &mut EventReader<R>) -> std::io::Result<()> {
        while let Some(event) = reader.next_event().await? {
            if let EventOutcome::Processed {
                invalid_channels, ..
            } = self.processor.process_event(&event)
            {
                if invalid_channels > 0 {
                    log::warn!(
                        "Run {} event {}: {} of {} rechits had invalid channels",
                        event.id.run,
                        event.id.event,
                        invalid_channels,
                        event.measurements.len()
                    );
                }
            }

            let seen = self.processor.stats().events_seen;
            if seen % 10_000 == 0 {
                log::info!("⏱️  {} events read", seen);
            }
        }

        self.malformed_lines = reader.malformed_lines();
        self.foreign_records = reader.foreign_records();
        Ok(())
    }

    pub fn processor(&self) -> &EventProcessor {
        &self.processor
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            stats: *self.processor.stats(),
            malformed_lines: self.malformed_lines,
            foreign_records: self.foreign_records,
            booked_channels: self.processor.grid().booked_channels(),
        }
    }

    pub fn export(&self) -> Vec<HistogramEntry> {
        self.processor.export()
    }

    /// Write every map to the store; returns the number of entries written
    pub async fn write(&self, writer: &mut HistogramWriter) -> Result<usize, HistogramWriterError> {
        let entries = self.export();
        let written = writer.write_all(&entries).await?;
        log::info!("✅ Wrote {} histograms ({} backend)", written, writer.backend_type());
        Ok(written)
    }
}
