//! Intra-event timing correlation between the iphi=67 and iphi=66 columns
//!
//! Only depth-1 towers with 0 < ieta <= 16 take part. Times are buffered while
//! an event is processed and paired up when the event ends.

use super::histogram::{Axis, Hist1D, Hist2D, MergeError};
use super::measurement::Measurement;
use super::snapshot::HistogramEntry;

pub const PRIMARY_IPHI: i32 = 67;
pub const NEIGHBOUR_IPHI: i32 = 66;
const MAX_IETA: i32 = 16;

fn difference_hist() -> Hist1D {
    Hist1D::new(50, -25.0, 25.0)
}

fn correlation_hist() -> Hist2D {
    Hist2D::new(Axis::new(100, -25.0, 75.0), Axis::new(100, -25.0, 75.0))
}

/// Entries produced by one `flush_event`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushCounts {
    pub within: u64,
    pub cross: u64,
}

pub struct PhiCorrelationAnalyzer {
    primary: Vec<f64>,
    neighbour: Vec<f64>,
    within_difference: Hist1D,
    within_correlation: Hist2D,
    cross_difference: Hist1D,
    cross_correlation: Hist2D,
}

impl PhiCorrelationAnalyzer {
    pub fn new() -> Self {
        Self {
            primary: Vec::with_capacity(MAX_IETA as usize),
            neighbour: Vec::with_capacity(MAX_IETA as usize),
            within_difference: difference_hist(),
            within_correlation: correlation_hist(),
            cross_difference: difference_hist(),
            cross_correlation: correlation_hist(),
        }
    }

    /// Buffer the measurement's time if it sits on one of the two columns
    pub fn observe(&mut self, measurement: &Measurement) {
        let channel = &measurement.channel;
        if channel.depth != 1 || channel.ieta <= 0 || channel.ieta > MAX_IETA {
            return;
        }

        match channel.iphi {
            PRIMARY_IPHI => self.primary.push(measurement.time),
            NEIGHBOUR_IPHI => self.neighbour.push(measurement.time),
            _ => {}
        }
    }

    /// Pair every two iphi=67 times (i < j) and every (iphi=67, iphi=66)
    /// combination, then clear both buffers
    pub fn flush_event(&mut self) -> FlushCounts {
        let mut counts = FlushCounts::default();

        for (i, &a) in self.primary.iter().enumerate() {
            for &b in &self.primary[i + 1..] {
                self.within_difference.fill(a - b);
                self.within_correlation.fill(a, b);
                counts.within += 1;
            }
            for &b in &self.neighbour {
                self.cross_difference.fill(a - b);
                self.cross_correlation.fill(a, b);
                counts.cross += 1;
            }
        }

        self.primary.clear();
        self.neighbour.clear();
        counts
    }

    pub fn buffered(&self) -> (usize, usize) {
        (self.primary.len(), self.neighbour.len())
    }

    pub fn within_difference(&self) -> &Hist1D {
        &self.within_difference
    }

    pub fn within_correlation(&self) -> &Hist2D {
        &self.within_correlation
    }

    pub fn cross_difference(&self) -> &Hist1D {
        &self.cross_difference
    }

    pub fn cross_correlation(&self) -> &Hist2D {
        &self.cross_correlation
    }

    /// Merges accumulated histograms only; per-event buffers are worker-local
    pub fn check_merge(&self, other: &PhiCorrelationAnalyzer) -> Result<(), MergeError> {
        self.within_difference.check_merge(&other.within_difference)?;
        self.within_correlation.check_merge(&other.within_correlation)?;
        self.cross_difference.check_merge(&other.cross_difference)?;
        self.cross_correlation.check_merge(&other.cross_correlation)
    }

    pub fn merge(&mut self, other: &PhiCorrelationAnalyzer) -> Result<(), MergeError> {
        self.check_merge(other)?;
        self.within_difference.merge(&other.within_difference)?;
        self.within_correlation.merge(&other.within_correlation)?;
        self.cross_difference.merge(&other.cross_difference)?;
        self.cross_correlation.merge(&other.cross_correlation)?;
        Ok(())
    }

    pub fn export(&self) -> Vec<HistogramEntry> {
        vec![
            HistogramEntry::h1("hCheckTimingPhi67Plus", "hCheckTimingPhi67Plus", &self.within_difference),
            HistogramEntry::h1("hCheckTiming66to67P", "hCheckTiming66to67P", &self.cross_difference),
            HistogramEntry::h2("hCorrTimingPhi67Plus", "hCorrTimingPhi67Plus", &self.within_correlation),
            HistogramEntry::h2("hCorrTiming66to67P", "hCorrTiming66to67P", &self.cross_correlation),
        ]
    }
}

impl Default for PhiCorrelationAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing_core::channel::DetectorChannel;

    fn hit(depth: u8, ieta: i32, iphi: i32, time: f64) -> Measurement {
        Measurement::new(DetectorChannel::new(depth, ieta, iphi), 10.0, time)
    }

    #[test]
    fn test_observe_selects_columns() {
        let mut analyzer = PhiCorrelationAnalyzer::new();

        analyzer.observe(&hit(1, 1, 67, 0.0));
        analyzer.observe(&hit(1, 16, 66, 0.0));
        analyzer.observe(&hit(1, 17, 67, 0.0)); // ieta too large
        analyzer.observe(&hit(1, -3, 67, 0.0)); // negative side
        analyzer.observe(&hit(2, 3, 67, 0.0)); // wrong depth
        analyzer.observe(&hit(1, 3, 65, 0.0)); // wrong column

        assert_eq!(analyzer.buffered(), (1, 1));
    }

    #[test]
    fn test_pair_counts() {
        let mut analyzer = PhiCorrelationAnalyzer::new();
        for ieta in 1..=5 {
            analyzer.observe(&hit(1, ieta, 67, ieta as f64));
        }
        for ieta in 1..=3 {
            analyzer.observe(&hit(1, ieta, 66, 0.0));
        }

        let counts = analyzer.flush_event();
        assert_eq!(counts.within, 5 * 4 / 2);
        assert_eq!(counts.cross, 5 * 3);
        assert_eq!(analyzer.within_difference().entries, 10);
        assert_eq!(analyzer.cross_correlation().entries, 15);
    }

    #[test]
    fn test_second_flush_is_noop() {
        let mut analyzer = PhiCorrelationAnalyzer::new();
        analyzer.observe(&hit(1, 2, 67, 1.0));
        analyzer.observe(&hit(1, 3, 67, 2.0));
        analyzer.observe(&hit(1, 3, 66, 2.0));

        assert_eq!(analyzer.flush_event(), FlushCounts { within: 1, cross: 2 });
        assert_eq!(analyzer.buffered(), (0, 0));
        assert_eq!(analyzer.flush_event(), FlushCounts::default());
        assert_eq!(analyzer.within_difference().entries, 1);
        assert_eq!(analyzer.cross_difference().entries, 2);
    }

    #[test]
    fn test_difference_is_signed_in_buffer_order() {
        let mut analyzer = PhiCorrelationAnalyzer::new();
        analyzer.observe(&hit(1, 4, 67, 1.0));
        analyzer.observe(&hit(1, 9, 67, 4.0));
        analyzer.flush_event();

        let diff = analyzer.within_difference();
        assert_eq!(diff.count(diff.axis.bin(-3.0)), 1);
        assert_eq!(analyzer.within_correlation().count_at(1.0, 4.0), 1);
    }

    #[test]
    fn test_neighbour_only_produces_nothing() {
        let mut analyzer = PhiCorrelationAnalyzer::new();
        analyzer.observe(&hit(1, 4, 66, 1.0));
        analyzer.observe(&hit(1, 5, 66, 2.0));

        assert_eq!(analyzer.flush_event(), FlushCounts::default());
        assert_eq!(analyzer.buffered(), (0, 0));
    }
}
