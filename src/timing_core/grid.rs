//! Per-channel timing distributions plus per-depth timing profiles and occupancy maps

use super::channel::{ChannelIndexer, DetectorChannel, InvalidChannelError, StorageIndex, N_IETA_SLOTS, N_IPHI};
use super::histogram::{Axis, Hist1D, Hist2D, MergeError, Profile2D};
use super::snapshot::HistogramEntry;

pub const DISTRIBUTION_BINS: usize = 200;
pub const DISTRIBUTION_LOW: f64 = -100.0;
pub const DISTRIBUTION_HIGH: f64 = 100.0;

pub const DEPTHS: [u8; 3] = [1, 2, 3];

/// ieta axis shared by every 2-D map
pub fn ieta_axis() -> Axis {
    Axis::new(N_IETA_SLOTS, -29.5, 29.5)
}

/// iphi axis shared by every 2-D map
pub fn iphi_axis() -> Axis {
    Axis::new(N_IPHI, 0.5, 72.5)
}

pub struct AccumulatorGrid {
    /// Flat arena addressed by `StorageIndex::flat`; booked on first fill
    distributions: Vec<Option<Hist1D>>,
    profiles: Vec<Profile2D>,
    occupancy: Vec<Hist2D>,
}

impl AccumulatorGrid {
    /// `time_low`/`time_high` bound the value axis of the timing profiles
    pub fn new(time_low: f64, time_high: f64) -> Self {
        Self {
            distributions: vec![None; ChannelIndexer::arena_len()],
            profiles: DEPTHS
                .iter()
                .map(|_| Profile2D::new(ieta_axis(), iphi_axis(), time_low, time_high))
                .collect(),
            occupancy: DEPTHS
                .iter()
                .map(|_| Hist2D::new(ieta_axis(), iphi_axis()))
                .collect(),
        }
    }

    fn plane(depth: u8) -> usize {
        depth as usize - 1
    }

    fn distribution_slot(&mut self, index: &StorageIndex) -> &mut Hist1D {
        self.distributions[index.flat()]
            .get_or_insert_with(|| Hist1D::new(DISTRIBUTION_BINS, DISTRIBUTION_LOW, DISTRIBUTION_HIGH))
    }

    /// Add `time` to the channel's timing distribution
    pub fn fill_channel(&mut self, channel: &DetectorChannel, time: f64) -> Result<(), InvalidChannelError> {
        let index = ChannelIndexer::index(channel)?;
        self.distribution_slot(&index).fill(time);
        Ok(())
    }

    /// Add `time` to the profile cell of (ieta, iphi) at `depth`
    pub fn fill_profile(&mut self, depth: u8, ieta: i32, iphi: i32, time: f64) -> Result<(), InvalidChannelError> {
        let channel = DetectorChannel::new(depth, ieta, iphi);
        ChannelIndexer::index(&channel)?;
        self.profiles[Self::plane(depth)].fill(ieta as f64, iphi as f64, time);
        Ok(())
    }

    pub fn fill_occupancy(&mut self, depth: u8, ieta: i32, iphi: i32) -> Result<(), InvalidChannelError> {
        let channel = DetectorChannel::new(depth, ieta, iphi);
        ChannelIndexer::index(&channel)?;
        self.occupancy[Self::plane(depth)].fill(ieta as f64, iphi as f64);
        Ok(())
    }

    /// Energy-gated entry point: distribution, profile and occupancy together.
    /// The channel is validated once up front so a rejected channel leaves
    /// every accumulator untouched.
    pub fn fill_above_threshold(&mut self, channel: &DetectorChannel, time: f64) -> Result<(), InvalidChannelError> {
        let index = ChannelIndexer::index(channel)?;
        let plane = Self::plane(channel.depth);
        let (x, y) = (channel.ieta as f64, channel.iphi as f64);

        self.distribution_slot(&index).fill(time);
        self.profiles[plane].fill(x, y, time);
        self.occupancy[plane].fill(x, y);
        Ok(())
    }

    pub fn distribution(&self, channel: &DetectorChannel) -> Option<&Hist1D> {
        let index = ChannelIndexer::index(channel).ok()?;
        self.distributions[index.flat()].as_ref()
    }

    pub fn occupancy(&self, channel: &DetectorChannel) -> u64 {
        match ChannelIndexer::index(channel) {
            Ok(_) => self.occupancy[Self::plane(channel.depth)]
                .count_at(channel.ieta as f64, channel.iphi as f64),
            Err(_) => 0,
        }
    }

    pub fn profile(&self, depth: u8) -> Option<&Profile2D> {
        DEPTHS
            .contains(&depth)
            .then(|| &self.profiles[Self::plane(depth)])
    }

    pub fn occupancy_map(&self, depth: u8) -> Option<&Hist2D> {
        DEPTHS
            .contains(&depth)
            .then(|| &self.occupancy[Self::plane(depth)])
    }

    /// Sum of distribution entries over every channel of `depth`
    pub fn distribution_entries(&self, depth: u8) -> u64 {
        self.distributions
            .iter()
            .enumerate()
            .filter_map(|(flat, hist)| Some((ChannelIndexer::channel_at(flat)?, hist.as_ref()?)))
            .filter(|(channel, _)| channel.depth == depth)
            .map(|(_, hist)| hist.entries)
            .sum()
    }

    /// Number of channels whose distribution has been booked
    pub fn booked_channels(&self) -> usize {
        self.distributions.iter().filter(|h| h.is_some()).count()
    }

    /// Fails if any profile or map of `other` is laid out differently
    pub fn check_merge(&self, other: &AccumulatorGrid) -> Result<(), MergeError> {
        for (mine, theirs) in self.profiles.iter().zip(&other.profiles) {
            mine.check_merge(theirs)?;
        }
        for (mine, theirs) in self.occupancy.iter().zip(&other.occupancy) {
            mine.check_merge(theirs)?;
        }
        for (mine, theirs) in self.distributions.iter().zip(&other.distributions) {
            if let (Some(mine), Some(theirs)) = (mine, theirs) {
                mine.check_merge(theirs)?;
            }
        }
        Ok(())
    }

    /// All-or-nothing: on error the grid is left as it was
    pub fn merge(&mut self, other: &AccumulatorGrid) -> Result<(), MergeError> {
        self.check_merge(other)?;

        for (mine, theirs) in self.distributions.iter_mut().zip(&other.distributions) {
            let Some(other_hist) = theirs else {
                continue;
            };
            if let Some(hist) = mine.as_mut() {
                hist.merge(other_hist)?;
            } else {
                *mine = Some(other_hist.clone());
            }
        }
        for (mine, theirs) in self.profiles.iter_mut().zip(&other.profiles) {
            mine.merge(theirs)?;
        }
        for (mine, theirs) in self.occupancy.iter_mut().zip(&other.occupancy) {
            mine.merge(theirs)?;
        }
        Ok(())
    }

    /// Profiles and occupancy maps for every depth, plus each booked channel
    /// distribution
    pub fn export(&self) -> Vec<HistogramEntry> {
        let mut entries = Vec::with_capacity(2 * DEPTHS.len() + self.booked_channels());

        for depth in DEPTHS {
            let plane = Self::plane(depth);
            let profile_name = format!("hHBHETiming_Depth{}", depth);
            entries.push(HistogramEntry::profile(
                profile_name.clone(),
                profile_name,
                &self.profiles[plane],
            ));
            entries.push(HistogramEntry::h2(
                format!("occupancy_d{}", depth),
                format!("occupancy_depth{}", depth),
                &self.occupancy[plane],
            ));
        }

        for (flat, hist) in self.distributions.iter().enumerate() {
            let (Some(hist), Some(channel)) = (hist, ChannelIndexer::channel_at(flat)) else {
                continue;
            };
            let name = channel.distribution_name();
            entries.push(HistogramEntry::h1(name.clone(), name, hist));
        }

        entries
    }
}
