//! Fixed-binning histogram primitives: 1-D counts, 2-D counts, 2-D averaged profile
//!
//! Bin 0 of every axis is underflow and bin `n_bins + 1` is overflow, so a fill
//! is never dropped from the entry count.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub n_bins: usize,
    pub min: f64,
    pub max: f64,
}

impl Axis {
    pub fn new(n_bins: usize, min: f64, max: f64) -> Self {
        Self { n_bins, min, max }
    }

    /// Number of slots including underflow and overflow
    pub fn slots(&self) -> usize {
        self.n_bins + 2
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.n_bins as f64
    }

    /// Bin holding `x`; lower edges are inclusive, upper edges exclusive. NaN
    /// lands in overflow.
    pub fn bin(&self, x: f64) -> usize {
        if x.is_nan() || x >= self.max {
            return self.n_bins + 1;
        }
        if x < self.min {
            return 0;
        }
        let bin = ((x - self.min) / self.width()).floor() as usize + 1;
        bin.min(self.n_bins)
    }

    /// Centre of an in-range bin (1-based)
    pub fn center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 - 0.5) * self.width()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeError {
    AxisMismatch,
    ValueRangeMismatch,
}

impl std::fmt::Display for MergeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeError::AxisMismatch => write!(f, "Cannot merge histograms with different binning"),
            MergeError::ValueRangeMismatch => {
                write!(f, "Cannot merge profiles with different value ranges")
            }
        }
    }
}

impl std::error::Error for MergeError {}

/// 1-D count histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist1D {
    pub axis: Axis,
    /// Length `n_bins + 2`: underflow, bins, overflow
    pub counts: Vec<u64>,
    pub entries: u64,
    sum_x: f64,
    /// Fills that contributed to `sum_x`; NaN and infinite values do not
    #[serde(default)]
    finite_entries: u64,
}

impl Hist1D {
    pub fn new(n_bins: usize, min: f64, max: f64) -> Self {
        let axis = Axis::new(n_bins, min, max);
        Self {
            axis,
            counts: vec![0; axis.slots()],
            entries: 0,
            sum_x: 0.0,
            finite_entries: 0,
        }
    }

    pub fn fill(&mut self, x: f64) -> usize {
        let bin = self.axis.bin(x);
        self.counts[bin] += 1;
        self.entries += 1;
        if x.is_finite() {
            self.sum_x += x;
            self.finite_entries += 1;
        }
        bin
    }

    /// Overwrite one slot. Used for displaying raw ADC samples, not for
    /// accumulation; `entries` counts the number of writes.
    pub fn set_bin_content(&mut self, bin: usize, value: u64) {
        if let Some(slot) = self.counts.get_mut(bin) {
            *slot = value;
            self.entries += 1;
        }
    }

    pub fn count(&self, bin: usize) -> u64 {
        self.counts.get(bin).copied().unwrap_or(0)
    }

    pub fn underflow(&self) -> u64 {
        self.counts[0]
    }

    pub fn overflow(&self) -> u64 {
        self.counts[self.axis.n_bins + 1]
    }

    /// Sum over in-range bins only
    pub fn integral(&self) -> u64 {
        self.counts[1..=self.axis.n_bins].iter().sum()
    }

    /// Mean of the finite values filled so far
    pub fn mean(&self) -> Option<f64> {
        if self.finite_entries == 0 {
            None
        } else {
            Some(self.sum_x / self.finite_entries as f64)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn check_merge(&self, other: &Hist1D) -> Result<(), MergeError> {
        if self.axis != other.axis {
            return Err(MergeError::AxisMismatch);
        }
        Ok(())
    }

    pub fn merge(&mut self, other: &Hist1D) -> Result<(), MergeError> {
        self.check_merge(other)?;
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
        self.entries += other.entries;
        self.sum_x += other.sum_x;
        self.finite_entries += other.finite_entries;
        Ok(())
    }
}

/// 2-D count histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist2D {
    pub x_axis: Axis,
    pub y_axis: Axis,
    /// Row-major over y, each row `x_axis.slots()` wide
    pub counts: Vec<u64>,
    pub entries: u64,
}

impl Hist2D {
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            x_axis,
            y_axis,
            counts: vec![0; x_axis.slots() * y_axis.slots()],
            entries: 0,
        }
    }

    fn slot(&self, bx: usize, by: usize) -> usize {
        by * self.x_axis.slots() + bx
    }

    pub fn fill(&mut self, x: f64, y: f64) {
        let slot = self.slot(self.x_axis.bin(x), self.y_axis.bin(y));
        self.counts[slot] += 1;
        self.entries += 1;
    }

    /// Content of the bin containing `(x, y)`
    pub fn count_at(&self, x: f64, y: f64) -> u64 {
        self.counts[self.slot(self.x_axis.bin(x), self.y_axis.bin(y))]
    }

    pub fn count(&self, bx: usize, by: usize) -> u64 {
        if bx >= self.x_axis.slots() || by >= self.y_axis.slots() {
            return 0;
        }
        self.counts[self.slot(bx, by)]
    }

    pub fn check_merge(&self, other: &Hist2D) -> Result<(), MergeError> {
        if self.x_axis != other.x_axis || self.y_axis != other.y_axis {
            return Err(MergeError::AxisMismatch);
        }
        Ok(())
    }

    pub fn merge(&mut self, other: &Hist2D) -> Result<(), MergeError> {
        self.check_merge(other)?;
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
        self.entries += other.entries;
        Ok(())
    }
}

/// Running statistic of one profile cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileCell {
    pub n: u64,
    pub sum: f64,
    pub sum_sq: f64,
}

impl ProfileCell {
    pub fn add(&mut self, value: f64) {
        self.n += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.n == 0 {
            None
        } else {
            Some(self.sum / self.n as f64)
        }
    }

    /// Spread of the values in the cell (standard deviation over n), not the
    /// error on the mean
    pub fn spread(&self) -> Option<f64> {
        let mean = self.mean()?;
        let variance = self.sum_sq / self.n as f64 - mean * mean;
        Some(variance.max(0.0).sqrt())
    }

    fn merge(&mut self, other: &ProfileCell) {
        self.n += other.n;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }
}

/// 2-D profile: per (x, y) cell mean and spread of a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile2D {
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub value_low: f64,
    pub value_high: f64,
    pub cells: Vec<ProfileCell>,
    /// Every fill call, including values rejected by the value range
    pub entries: u64,
}

impl Profile2D {
    pub fn new(x_axis: Axis, y_axis: Axis, value_low: f64, value_high: f64) -> Self {
        Self {
            x_axis,
            y_axis,
            value_low,
            value_high,
            cells: vec![ProfileCell::default(); x_axis.slots() * y_axis.slots()],
            entries: 0,
        }
    }

    fn slot(&self, bx: usize, by: usize) -> usize {
        by * self.x_axis.slots() + bx
    }

    /// Returns false when `value` falls outside the value range and was only
    /// counted, not accumulated
    pub fn fill(&mut self, x: f64, y: f64, value: f64) -> bool {
        self.entries += 1;
        if !(value >= self.value_low && value <= self.value_high) {
            return false;
        }
        let slot = self.slot(self.x_axis.bin(x), self.y_axis.bin(y));
        self.cells[slot].add(value);
        true
    }

    pub fn cell_at(&self, x: f64, y: f64) -> &ProfileCell {
        &self.cells[self.slot(self.x_axis.bin(x), self.y_axis.bin(y))]
    }

    /// Number of values accumulated into cells
    pub fn accepted(&self) -> u64 {
        self.cells.iter().map(|c| c.n).sum()
    }

    pub fn check_merge(&self, other: &Profile2D) -> Result<(), MergeError> {
        if self.x_axis != other.x_axis || self.y_axis != other.y_axis {
            return Err(MergeError::AxisMismatch);
        }
        if self.value_low != other.value_low || self.value_high != other.value_high {
            return Err(MergeError::ValueRangeMismatch);
        }
        Ok(())
    }

    pub fn merge(&mut self, other: &Profile2D) -> Result<(), MergeError> {
        self.check_merge(other)?;
        for (mine, theirs) in self.cells.iter_mut().zip(&other.cells) {
            mine.merge(theirs);
        }
        self.entries += other.entries;
        Ok(())
    }
}
