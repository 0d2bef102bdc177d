//! Named, serialisable views of the accumulators handed to the output store

use super::histogram::{Axis, Hist1D, Hist2D, Profile2D};
use super::time_slices::PulseCapture;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCellSummary {
    pub x_bin: usize,
    pub y_bin: usize,
    pub x: f64,
    pub y: f64,
    pub n: u64,
    pub mean: f64,
    pub spread: f64,
}

/// Profile export: only populated cells, with their derived mean and spread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub value_low: f64,
    pub value_high: f64,
    pub entries: u64,
    pub cells: Vec<ProfileCellSummary>,
}

impl From<&Profile2D> for ProfileSnapshot {
    fn from(profile: &Profile2D) -> Self {
        let row = profile.x_axis.slots();
        let cells = profile
            .cells
            .iter()
            .enumerate()
            .filter_map(|(slot, cell)| {
                let mean = cell.mean()?;
                let (x_bin, y_bin) = (slot % row, slot / row);
                Some(ProfileCellSummary {
                    x_bin,
                    y_bin,
                    x: profile.x_axis.center(x_bin),
                    y: profile.y_axis.center(y_bin),
                    n: cell.n,
                    mean,
                    spread: cell.spread().unwrap_or(0.0),
                })
            })
            .collect();

        Self {
            x_axis: profile.x_axis,
            y_axis: profile.y_axis,
            value_low: profile.value_low,
            value_high: profile.value_high,
            entries: profile.entries,
            cells,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum HistogramPayload {
    H1(Hist1D),
    H2(Hist2D),
    Profile2D(ProfileSnapshot),
    /// Decoded pulse shapes of individual hits
    Pulses(Vec<PulseCapture>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramEntry {
    pub name: String,
    pub title: String,
    pub payload: HistogramPayload,
}

impl HistogramEntry {
    pub fn h1(name: impl Into<String>, title: impl Into<String>, hist: &Hist1D) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            payload: HistogramPayload::H1(hist.clone()),
        }
    }

    pub fn h2(name: impl Into<String>, title: impl Into<String>, hist: &Hist2D) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            payload: HistogramPayload::H2(hist.clone()),
        }
    }

    pub fn profile(name: impl Into<String>, title: impl Into<String>, profile: &Profile2D) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            payload: HistogramPayload::Profile2D(profile.into()),
        }
    }

    pub fn pulses(name: impl Into<String>, title: impl Into<String>, captures: &[PulseCapture]) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            payload: HistogramPayload::Pulses(captures.to_vec()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.payload {
            HistogramPayload::H1(_) => "H1",
            HistogramPayload::H2(_) => "H2",
            HistogramPayload::Profile2D(_) => "Profile2D",
            HistogramPayload::Pulses(_) => "Pulses",
        }
    }

    pub fn entries(&self) -> u64 {
        match &self.payload {
            HistogramPayload::H1(h) => h.entries,
            HistogramPayload::H2(h) => h.entries,
            HistogramPayload::Profile2D(p) => p.entries,
            HistogramPayload::Pulses(c) => c.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_snapshot_keeps_populated_cells() {
        let mut profile = Profile2D::new(
            Axis::new(59, -29.5, 29.5),
            Axis::new(72, 0.5, 72.5),
            -100.0,
            100.0,
        );
        profile.fill(-3.0, 12.0, 4.0);
        profile.fill(-3.0, 12.0, 8.0);

        let entry = HistogramEntry::profile("hHBHETiming_Depth1", "hHBHETiming_Depth1", &profile);
        assert_eq!(entry.kind(), "Profile2D");
        assert_eq!(entry.entries(), 2);

        match entry.payload {
            HistogramPayload::Profile2D(snapshot) => {
                assert_eq!(snapshot.cells.len(), 1);
                let cell = &snapshot.cells[0];
                assert!((cell.x - -3.0).abs() < 1e-9);
                assert!((cell.y - 12.0).abs() < 1e-9);
                assert_eq!(cell.mean, 6.0);
                assert_eq!(cell.spread, 2.0);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_entry_json_is_tagged() {
        let mut hist = Hist1D::new(4, 0.0, 4.0);
        hist.fill(1.5);
        let entry = HistogramEntry::h1("h", "title", &hist);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["payload"]["kind"], "H1");
        assert_eq!(json["payload"]["data"]["entries"], 1);

        let back: HistogramEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
