//! Timing-window classification and energy spectra per window

use super::channel::DetectorChannel;
use super::histogram::{Hist1D, MergeError};
use super::measurement::Measurement;
use super::snapshot::HistogramEntry;

const GLOBAL_ENERGY_BINS: usize = 500;
const GLOBAL_ENERGY_MAX: f64 = 1000.0;
const REGION_ENERGY_BINS: usize = 300;
const REGION_ENERGY_MAX: f64 = 300.0;

/// iphi columns with their own energy spectra (for -16 < ieta < 0)
pub const REGION_IPHIS: [i32; 2] = [51, 54];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingWindow {
    InTime,
    OutOfTime1,
    OutOfTime2,
}

impl TimingWindow {
    pub fn all() -> [TimingWindow; 3] {
        [
            TimingWindow::InTime,
            TimingWindow::OutOfTime1,
            TimingWindow::OutOfTime2,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimingWindow::InTime => "IT",
            TimingWindow::OutOfTime1 => "OOT1",
            TimingWindow::OutOfTime2 => "OOT2",
        }
    }

    /// Open interval (low, high) in ns
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            TimingWindow::InTime => (-5.0, 5.0),
            TimingWindow::OutOfTime1 => (6.0, 12.0),
            TimingWindow::OutOfTime2 => (12.0, 20.0),
        }
    }

    fn slot(&self) -> usize {
        match self {
            TimingWindow::InTime => 0,
            TimingWindow::OutOfTime1 => 1,
            TimingWindow::OutOfTime2 => 2,
        }
    }
}

pub struct EnergyTimeClassifier {
    global: Vec<Hist1D>,
    /// Indexed `[region iphi][window]`
    region: Vec<Vec<Hist1D>>,
}

impl EnergyTimeClassifier {
    pub fn new() -> Self {
        let spectra = |bins, max| -> Vec<Hist1D> {
            TimingWindow::all()
                .iter()
                .map(|_| Hist1D::new(bins, 0.0, max))
                .collect()
        };

        Self {
            global: spectra(GLOBAL_ENERGY_BINS, GLOBAL_ENERGY_MAX),
            region: REGION_IPHIS
                .iter()
                .map(|_| spectra(REGION_ENERGY_BINS, REGION_ENERGY_MAX))
                .collect(),
        }
    }

    /// Window containing `time`, if any. Both window edges are exclusive, so
    /// 5.0, 6.0, 12.0 and 20.0 all fall outside every window.
    pub fn classify(time: f64) -> Option<TimingWindow> {
        TimingWindow::all().into_iter().find(|window| {
            let (low, high) = window.bounds();
            time > low && time < high
        })
    }

    /// Position in `REGION_IPHIS` when the channel lies in the monitored region
    pub fn region_slot(channel: &DetectorChannel) -> Option<usize> {
        if channel.ieta >= 0 || channel.ieta <= -16 {
            return None;
        }
        REGION_IPHIS.iter().position(|&iphi| iphi == channel.iphi)
    }

    /// Classify the measurement and fill its energy into the global spectrum
    /// of the matched window and, inside the monitored region, into the
    /// region spectrum as well
    pub fn record(&mut self, measurement: &Measurement) -> Option<TimingWindow> {
        let window = Self::classify(measurement.time)?;

        self.global[window.slot()].fill(measurement.energy);
        if let Some(region) = Self::region_slot(&measurement.channel) {
            self.region[region][window.slot()].fill(measurement.energy);
        }

        Some(window)
    }

    pub fn global_spectrum(&self, window: TimingWindow) -> &Hist1D {
        &self.global[window.slot()]
    }

    pub fn region_spectrum(&self, iphi: i32, window: TimingWindow) -> Option<&Hist1D> {
        let region = REGION_IPHIS.iter().position(|&p| p == iphi)?;
        Some(&self.region[region][window.slot()])
    }

    pub fn check_merge(&self, other: &EnergyTimeClassifier) -> Result<(), MergeError> {
        for (mine, theirs) in self.global.iter().zip(&other.global) {
            mine.check_merge(theirs)?;
        }
        for (mine_row, their_row) in self.region.iter().zip(&other.region) {
            for (mine, theirs) in mine_row.iter().zip(their_row) {
                mine.check_merge(theirs)?;
            }
        }
        Ok(())
    }

    pub fn merge(&mut self, other: &EnergyTimeClassifier) -> Result<(), MergeError> {
        self.check_merge(other)?;
        for (mine, theirs) in self.global.iter_mut().zip(&other.global) {
            mine.merge(theirs)?;
        }
        for (mine_row, their_row) in self.region.iter_mut().zip(&other.region) {
            for (mine, theirs) in mine_row.iter_mut().zip(their_row) {
                mine.merge(theirs)?;
            }
        }
        Ok(())
    }

    pub fn export(&self) -> Vec<HistogramEntry> {
        let mut entries = Vec::new();

        for window in TimingWindow::all() {
            let name = format!("hCheckEnergy{}", window.as_str());
            entries.push(HistogramEntry::h1(name.clone(), name, self.global_spectrum(window)));
        }

        for (region, iphi) in REGION_IPHIS.iter().enumerate() {
            for window in TimingWindow::all() {
                let name = format!("hCheckEnergy{}ip{}", window.as_str(), iphi);
                entries.push(HistogramEntry::h1(
                    name.clone(),
                    name,
                    &self.region[region][window.slot()],
                ));
            }
        }

        entries
    }
}

impl Default for EnergyTimeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(ieta: i32, iphi: i32, energy: f64, time: f64) -> Measurement {
        Measurement::new(DetectorChannel::new(1, ieta, iphi), energy, time)
    }

    #[test]
    fn test_window_boundaries_are_open() {
        assert_eq!(EnergyTimeClassifier::classify(0.0), Some(TimingWindow::InTime));
        assert_eq!(EnergyTimeClassifier::classify(-4.99), Some(TimingWindow::InTime));
        assert_eq!(EnergyTimeClassifier::classify(5.0), None);
        assert_eq!(EnergyTimeClassifier::classify(-5.0), None);
        assert_eq!(EnergyTimeClassifier::classify(5.5), None);
        assert_eq!(EnergyTimeClassifier::classify(6.0), None);
        assert_eq!(EnergyTimeClassifier::classify(6.1), Some(TimingWindow::OutOfTime1));
        assert_eq!(EnergyTimeClassifier::classify(12.0), None);
        assert_eq!(EnergyTimeClassifier::classify(12.5), Some(TimingWindow::OutOfTime2));
        assert_eq!(EnergyTimeClassifier::classify(20.0), None);
        assert_eq!(EnergyTimeClassifier::classify(-40.0), None);
        assert_eq!(EnergyTimeClassifier::classify(f64::NAN), None);
    }

    #[test]
    fn test_region_membership() {
        assert_eq!(EnergyTimeClassifier::region_slot(&DetectorChannel::new(1, -1, 51)), Some(0));
        assert_eq!(EnergyTimeClassifier::region_slot(&DetectorChannel::new(2, -15, 54)), Some(1));
        assert_eq!(EnergyTimeClassifier::region_slot(&DetectorChannel::new(1, -16, 51)), None);
        assert_eq!(EnergyTimeClassifier::region_slot(&DetectorChannel::new(1, 3, 51)), None);
        assert_eq!(EnergyTimeClassifier::region_slot(&DetectorChannel::new(1, -3, 52)), None);
    }

    #[test]
    fn test_region_fill_fans_out_to_global() {
        let mut classifier = EnergyTimeClassifier::new();

        assert_eq!(classifier.record(&hit(-4, 51, 42.0, 1.0)), Some(TimingWindow::InTime));
        assert_eq!(classifier.record(&hit(-4, 54, 17.0, 8.0)), Some(TimingWindow::OutOfTime1));
        assert_eq!(classifier.record(&hit(10, 51, 5.0, 15.0)), Some(TimingWindow::OutOfTime2));

        assert_eq!(classifier.global_spectrum(TimingWindow::InTime).entries, 1);
        assert_eq!(classifier.global_spectrum(TimingWindow::OutOfTime1).entries, 1);
        assert_eq!(classifier.global_spectrum(TimingWindow::OutOfTime2).entries, 1);

        let ip51 = classifier.region_spectrum(51, TimingWindow::InTime).unwrap();
        assert_eq!(ip51.entries, 1);
        let ip54 = classifier.region_spectrum(54, TimingWindow::OutOfTime1).unwrap();
        assert_eq!(ip54.entries, 1);
        // ieta=10 is outside the monitored region
        assert_eq!(classifier.region_spectrum(51, TimingWindow::OutOfTime2).unwrap().entries, 0);
        assert!(classifier.region_spectrum(52, TimingWindow::InTime).is_none());
    }

    #[test]
    fn test_unclassified_time_records_nothing() {
        let mut classifier = EnergyTimeClassifier::new();
        assert_eq!(classifier.record(&hit(-4, 51, 42.0, 5.0)), None);

        for window in TimingWindow::all() {
            assert!(classifier.global_spectrum(window).is_empty());
        }
    }

    #[test]
    fn test_export_names() {
        let names: Vec<String> = EnergyTimeClassifier::new()
            .export()
            .into_iter()
            .map(|e| e.name)
            .collect();

        assert_eq!(names.len(), 9);
        assert!(names.contains(&"hCheckEnergyOOT2".to_string()));
        assert!(names.contains(&"hCheckEnergyITip54".to_string()));
        assert!(names.contains(&"hCheckEnergyOOT1ip51".to_string()));
    }
}
