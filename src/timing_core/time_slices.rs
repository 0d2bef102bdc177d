//! Pulse-shape diagnostics from the auxiliary ADC words
//!
//! Each hit carries eight 7-bit ADC time slices packed four per word. The
//! recorder keeps the decoded pulses of hits above its energy cut, up to a
//! fixed number, and writes them out with the timing maps.

use super::channel::DetectorChannel;
use super::histogram::Hist1D;
use super::measurement::{AuxWords, EventId, Measurement};
use super::snapshot::HistogramEntry;
use serde::{Deserialize, Serialize};

pub const N_TIME_SLICES: usize = 8;
const SLICE_MASK: u32 = 0x7F;
const SLICE_SHIFTS: [u32; 4] = [0, 7, 14, 21];
/// Pulses kept for export; later ones are only logged
pub const DEFAULT_MAX_CAPTURES: usize = 1000;

pub struct TimeSlices;

impl TimeSlices {
    /// Slices 0..3 come from `aux_hbhe`, 4..7 from `aux`
    pub fn decode(words: &AuxWords) -> [u8; N_TIME_SLICES] {
        let mut adc = [0u8; N_TIME_SLICES];
        for (i, shift) in SLICE_SHIFTS.iter().enumerate() {
            adc[i] = ((words.aux_hbhe >> shift) & SLICE_MASK) as u8;
            adc[i + 4] = ((words.aux >> shift) & SLICE_MASK) as u8;
        }
        adc
    }
}

/// Per-measurement callback run by the event processor for every hit of a
/// processed event, whatever its energy or channel validity
pub trait DiagnosticHook: Send {
    fn inspect(&mut self, event: &EventId, measurement: &Measurement);

    /// Histograms the hook wants written alongside the timing maps
    fn export(&self) -> Vec<HistogramEntry> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseCapture {
    pub event: EventId,
    pub channel: DetectorChannel,
    pub energy: f64,
    pub time: f64,
    pub slices: [u8; N_TIME_SLICES],
}

pub struct TimeSliceRecorder {
    energy_threshold: f64,
    captures: Vec<PulseCapture>,
    max_captures: usize,
    dropped: u64,
    /// Pulse of the most recent capture, one slice per bin
    last_pulse: Hist1D,
}

impl TimeSliceRecorder {
    pub fn new(energy_threshold: f64) -> Self {
        Self {
            energy_threshold,
            captures: Vec::new(),
            max_captures: DEFAULT_MAX_CAPTURES,
            dropped: 0,
            last_pulse: Hist1D::new(10, -100.0, 150.0),
        }
    }

    pub fn with_max_captures(mut self, max_captures: usize) -> Self {
        self.max_captures = max_captures;
        self
    }

    pub fn captures(&self) -> &[PulseCapture] {
        &self.captures
    }

    /// Pulses above the cut that did not fit in the capture list
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn last_pulse(&self) -> &Hist1D {
        &self.last_pulse
    }
}

impl DiagnosticHook for TimeSliceRecorder {
    fn inspect(&mut self, event: &EventId, measurement: &Measurement) {
        if measurement.energy <= self.energy_threshold {
            return;
        }
        let Some(words) = measurement.aux else {
            return;
        };

        let slices = TimeSlices::decode(&words);
        for (i, adc) in slices.iter().enumerate() {
            self.last_pulse.set_bin_content(i + 1, *adc as u64);
        }

        log::debug!(
            "Pulse capture run {} event {} {} energy={:.1} time={:.2} adc={:?}",
            event.run,
            event.event,
            measurement.channel,
            measurement.energy,
            measurement.time,
            slices
        );

        if self.captures.len() >= self.max_captures {
            if self.dropped == 0 {
                log::warn!(
                    "Pulse capture list full ({} pulses); further pulses are only logged",
                    self.max_captures
                );
            }
            self.dropped += 1;
            return;
        }

        self.captures.push(PulseCapture {
            event: *event,
            channel: measurement.channel,
            energy: measurement.energy,
            time: measurement.time,
            slices,
        });
    }

    fn export(&self) -> Vec<HistogramEntry> {
        vec![
            HistogramEntry::h1("hTimeSlices", "hTimeSlices", &self.last_pulse),
            HistogramEntry::pulses("pulseCaptures", "pulseCaptures", &self.captures),
        ]
    }
}
