//! Per-event orchestration of the timing accumulators

use super::channel::InvalidChannelError;
use super::classifier::{EnergyTimeClassifier, TimingWindow};
use super::correlator::PhiCorrelationAnalyzer;
use super::grid::AccumulatorGrid;
use super::histogram::MergeError;
use super::measurement::{EventId, EventRecord, Measurement};
use super::snapshot::HistogramEntry;
use super::time_slices::DiagnosticHook;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    ProcessingEvent,
}

/// Result of handing one event to the processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Processed {
        measurements: usize,
        invalid_channels: usize,
    },
    /// Event belongs to another run than the configured target
    RunMismatch { run: u32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub events_seen: u64,
    pub events_processed: u64,
    pub events_skipped_run: u64,
    pub measurements: u64,
    pub above_threshold: u64,
    pub invalid_channels: u64,
    pub in_time: u64,
    pub out_of_time_1: u64,
    pub out_of_time_2: u64,
    pub within_pairs: u64,
    pub cross_pairs: u64,
}

impl ProcessingStats {
    fn merge(&mut self, other: &ProcessingStats) {
        self.events_seen += other.events_seen;
        self.events_processed += other.events_processed;
        self.events_skipped_run += other.events_skipped_run;
        self.measurements += other.measurements;
        self.above_threshold += other.above_threshold;
        self.invalid_channels += other.invalid_channels;
        self.in_time += other.in_time;
        self.out_of_time_1 += other.out_of_time_1;
        self.out_of_time_2 += other.out_of_time_2;
        self.within_pairs += other.within_pairs;
        self.cross_pairs += other.cross_pairs;
    }
}

pub struct EventProcessor {
    energy_threshold: f64,
    target_run: Option<u32>,
    grid: AccumulatorGrid,
    classifier: EnergyTimeClassifier,
    correlator: PhiCorrelationAnalyzer,
    diagnostic: Option<Box<dyn DiagnosticHook>>,
    state: ProcessorState,
    stats: ProcessingStats,
}

impl EventProcessor {
    pub fn new(energy_threshold: f64, time_low: f64, time_high: f64) -> Self {
        Self {
            energy_threshold,
            target_run: None,
            grid: AccumulatorGrid::new(time_low, time_high),
            classifier: EnergyTimeClassifier::new(),
            correlator: PhiCorrelationAnalyzer::new(),
            diagnostic: None,
            state: ProcessorState::Idle,
            stats: ProcessingStats::default(),
        }
    }

    /// Skip every event whose run number differs from `run`
    pub fn with_target_run(mut self, run: Option<u32>) -> Self {
        self.target_run = run;
        self
    }

    pub fn with_diagnostic(mut self, hook: Box<dyn DiagnosticHook>) -> Self {
        self.diagnostic = Some(hook);
        self
    }

    pub fn process_event(&mut self, event: &EventRecord) -> EventOutcome {
        self.process(&event.id, &event.measurements)
    }

    /// Run every measurement through the classifier, the grid (above the
    /// energy threshold) and the phi correlator, then close the event
    pub fn process(&mut self, event: &EventId, measurements: &[Measurement]) -> EventOutcome {
        self.stats.events_seen += 1;

        if let Some(target) = self.target_run {
            if event.run != target {
                self.stats.events_skipped_run += 1;
                log::debug!(
                    "Skipping run {} event {} (target run {})",
                    event.run,
                    event.event,
                    target
                );
                return EventOutcome::RunMismatch { run: event.run };
            }
        }

        self.state = ProcessorState::ProcessingEvent;
        let mut invalid_channels = 0;

        for measurement in measurements {
            if let Err(e) = self.process_measurement(event, measurement) {
                invalid_channels += 1;
                log::warn!("Run {} event {}: {}", event.run, event.event, e);
            }
        }

        let pairs = self.correlator.flush_event();
        self.stats.within_pairs += pairs.within;
        self.stats.cross_pairs += pairs.cross;
        self.stats.events_processed += 1;
        self.stats.invalid_channels += invalid_channels as u64;
        self.state = ProcessorState::Idle;

        EventOutcome::Processed {
            measurements: measurements.len(),
            invalid_channels,
        }
    }

    fn process_measurement(&mut self, event: &EventId, measurement: &Measurement) -> Result<(), InvalidChannelError> {
        self.stats.measurements += 1;

        match self.classifier.record(measurement) {
            Some(TimingWindow::InTime) => self.stats.in_time += 1,
            Some(TimingWindow::OutOfTime1) => self.stats.out_of_time_1 += 1,
            Some(TimingWindow::OutOfTime2) => self.stats.out_of_time_2 += 1,
            None => {}
        }

        if let Some(hook) = self.diagnostic.as_mut() {
            hook.inspect(event, measurement);
        }

        if measurement.energy > self.energy_threshold {
            self.grid.fill_above_threshold(&measurement.channel, measurement.time)?;
            self.stats.above_threshold += 1;
            self.correlator.observe(measurement);
        }

        Ok(())
    }

    /// `process` runs to completion under `&mut self`, so callers always
    /// observe `Idle`; `ProcessingEvent` only holds while an event's
    /// measurements are being dispatched.
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    pub fn grid(&self) -> &AccumulatorGrid {
        &self.grid
    }

    pub fn classifier(&self) -> &EnergyTimeClassifier {
        &self.classifier
    }

    pub fn correlator(&self) -> &PhiCorrelationAnalyzer {
        &self.correlator
    }

    pub fn energy_threshold(&self) -> f64 {
        self.energy_threshold
    }

    /// Fold a worker's accumulators into this one. The diagnostic hook of
    /// `other` is not merged. Every accumulator is checked before any is
    /// touched, so a layout mismatch leaves this processor unchanged.
    pub fn merge(&mut self, other: &EventProcessor) -> Result<(), MergeError> {
        self.grid.check_merge(&other.grid)?;
        self.classifier.check_merge(&other.classifier)?;
        self.correlator.check_merge(&other.correlator)?;

        self.grid.merge(&other.grid)?;
        self.classifier.merge(&other.classifier)?;
        self.correlator.merge(&other.correlator)?;
        self.stats.merge(&other.stats);
        Ok(())
    }

    /// Every named histogram owned by the processor and its diagnostic hook
    pub fn export(&self) -> Vec<HistogramEntry> {
        let mut entries = self.grid.export();
        entries.extend(self.classifier.export());
        entries.extend(self.correlator.export());
        if let Some(hook) = self.diagnostic.as_ref() {
            entries.extend(hook.export());
        }
        entries
    }
}
