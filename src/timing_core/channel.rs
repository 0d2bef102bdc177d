//! Detector channel geometry and dense storage indexing
//!
//! Depth 1 and 2 cover the full ieta x iphi plane. Depth 3 only exists on six
//! ieta strips (merged towers near the barrel/endcap transition), so it gets its
//! own compact slot table instead of sharing the 59-row layout.

use serde::{Deserialize, Serialize};

pub const MAX_IETA: i32 = 29;
pub const N_IPHI: usize = 72;
/// ieta rows for depth 1/2, including the never-filled ieta=0 row
pub const N_IETA_SLOTS: usize = 59;
/// The only ieta values carrying a depth-3 readout, in slot order
pub const DEPTH3_IETAS: [i32; 6] = [-28, -27, -16, 16, 27, 28];

const FULL_PLANE: usize = N_IETA_SLOTS * N_IPHI;
const DEPTH3_PLANE: usize = DEPTH3_IETAS.len() * N_IPHI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectorChannel {
    pub depth: u8,
    pub ieta: i32,
    pub iphi: i32,
}

impl DetectorChannel {
    pub fn new(depth: u8, ieta: i32, iphi: i32) -> Self {
        Self { depth, ieta, iphi }
    }

    /// Histogram name used for the per-channel timing distribution
    pub fn distribution_name(&self) -> String {
        format!("Depth{}_ieta{}_iphi{}", self.depth, self.ieta, self.iphi)
    }
}

impl std::fmt::Display for DetectorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(depth={}, ieta={}, iphi={})",
            self.depth, self.ieta, self.iphi
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidChannelReason {
    UnknownDepth,
    ZeroIeta,
    IetaOutOfRange,
    IphiOutOfRange,
    NoDepth3Tower,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidChannelError {
    pub channel: DetectorChannel,
    pub reason: InvalidChannelReason,
}

impl std::fmt::Display for InvalidChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self.reason {
            InvalidChannelReason::UnknownDepth => "depth must be 1, 2 or 3",
            InvalidChannelReason::ZeroIeta => "ieta=0 is not a tower",
            InvalidChannelReason::IetaOutOfRange => "|ieta| exceeds 29",
            InvalidChannelReason::IphiOutOfRange => "iphi outside [1,72]",
            InvalidChannelReason::NoDepth3Tower => "no depth-3 readout at this ieta",
        };
        write!(f, "Invalid channel {}: {}", self.channel, reason)
    }
}

impl std::error::Error for InvalidChannelError {}

/// Position of a channel inside the flat accumulator arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageIndex {
    pub depth: u8,
    pub eta_slot: usize,
    pub phi_slot: usize,
}

impl StorageIndex {
    pub fn flat(&self) -> usize {
        let plane_offset = match self.depth {
            1 => 0,
            2 => FULL_PLANE,
            _ => 2 * FULL_PLANE,
        };
        plane_offset + self.eta_slot * N_IPHI + self.phi_slot
    }
}

/// Maps physical channel coordinates onto the flat storage arena
pub struct ChannelIndexer;

impl ChannelIndexer {
    /// Total number of arena slots across all three depths
    pub const fn arena_len() -> usize {
        2 * FULL_PLANE + DEPTH3_PLANE
    }

    pub fn index(channel: &DetectorChannel) -> Result<StorageIndex, InvalidChannelError> {
        let reject = |reason| InvalidChannelError {
            channel: *channel,
            reason,
        };

        if !(1..=3).contains(&channel.depth) {
            return Err(reject(InvalidChannelReason::UnknownDepth));
        }
        if channel.ieta == 0 {
            return Err(reject(InvalidChannelReason::ZeroIeta));
        }
        if channel.ieta.abs() > MAX_IETA {
            return Err(reject(InvalidChannelReason::IetaOutOfRange));
        }
        if channel.iphi < 1 || channel.iphi > N_IPHI as i32 {
            return Err(reject(InvalidChannelReason::IphiOutOfRange));
        }

        let eta_slot = if channel.depth == 3 {
            Self::depth3_slot(channel.ieta).ok_or_else(|| reject(InvalidChannelReason::NoDepth3Tower))?
        } else {
            (channel.ieta + MAX_IETA) as usize
        };

        Ok(StorageIndex {
            depth: channel.depth,
            eta_slot,
            phi_slot: (channel.iphi - 1) as usize,
        })
    }

    /// Depth-3 slot for one of the six instrumented ieta strips
    pub fn depth3_slot(ieta: i32) -> Option<usize> {
        DEPTH3_IETAS.iter().position(|&e| e == ieta)
    }

    /// Inverse of `StorageIndex::flat`. Returns `None` for the unpopulated
    /// ieta=0 row and for positions past the end of the arena.
    pub fn channel_at(flat: usize) -> Option<DetectorChannel> {
        if flat >= Self::arena_len() {
            return None;
        }

        let (depth, offset) = if flat < FULL_PLANE {
            (1u8, flat)
        } else if flat < 2 * FULL_PLANE {
            (2u8, flat - FULL_PLANE)
        } else {
            (3u8, flat - 2 * FULL_PLANE)
        };

        let eta_slot = offset / N_IPHI;
        let iphi = (offset % N_IPHI) as i32 + 1;

        let ieta = if depth == 3 {
            DEPTH3_IETAS[eta_slot]
        } else {
            eta_slot as i32 - MAX_IETA
        };

        if ieta == 0 {
            return None;
        }

        Some(DetectorChannel::new(depth, ieta, iphi))
    }

    /// Every valid channel of the fixed geometry, in arena order
    pub fn all_channels() -> impl Iterator<Item = DetectorChannel> {
        (0..Self::arena_len()).filter_map(Self::channel_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth1_index_layout() {
        let idx = ChannelIndexer::index(&DetectorChannel::new(1, -29, 1)).unwrap();
        assert_eq!(idx.eta_slot, 0);
        assert_eq!(idx.phi_slot, 0);
        assert_eq!(idx.flat(), 0);

        let idx = ChannelIndexer::index(&DetectorChannel::new(2, 29, 72)).unwrap();
        assert_eq!(idx.eta_slot, 58);
        assert_eq!(idx.phi_slot, 71);
    }

    #[test]
    fn test_depth3_table_is_bijection() {
        let mut seen = Vec::new();
        for ieta in DEPTH3_IETAS {
            let idx = ChannelIndexer::index(&DetectorChannel::new(3, ieta, 10)).unwrap();
            assert!(!seen.contains(&idx.eta_slot));
            seen.push(idx.eta_slot);
        }
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);

        assert_eq!(ChannelIndexer::depth3_slot(-28), Some(0));
        assert_eq!(ChannelIndexer::depth3_slot(16), Some(3));
        assert_eq!(ChannelIndexer::depth3_slot(28), Some(5));
    }

    #[test]
    fn test_depth3_rejects_other_ieta() {
        for ieta in (-29..=29).filter(|e| *e != 0 && !DEPTH3_IETAS.contains(e)) {
            let err = ChannelIndexer::index(&DetectorChannel::new(3, ieta, 1)).unwrap_err();
            assert_eq!(err.reason, InvalidChannelReason::NoDepth3Tower);
        }
    }

    #[test]
    fn test_rejects_out_of_geometry() {
        let cases = [
            (DetectorChannel::new(1, 0, 5), InvalidChannelReason::ZeroIeta),
            (DetectorChannel::new(2, 30, 5), InvalidChannelReason::IetaOutOfRange),
            (DetectorChannel::new(1, -30, 5), InvalidChannelReason::IetaOutOfRange),
            (DetectorChannel::new(1, 5, 0), InvalidChannelReason::IphiOutOfRange),
            (DetectorChannel::new(1, 5, 73), InvalidChannelReason::IphiOutOfRange),
            (DetectorChannel::new(4, 5, 5), InvalidChannelReason::UnknownDepth),
            (DetectorChannel::new(0, 5, 5), InvalidChannelReason::UnknownDepth),
        ];

        for (channel, reason) in cases {
            let err = ChannelIndexer::index(&channel).unwrap_err();
            assert_eq!(err.reason, reason, "{}", channel);
        }
    }

    #[test]
    fn test_flat_index_roundtrip_and_count() {
        let channels: Vec<_> = ChannelIndexer::all_channels().collect();
        // 58 populated ieta rows at depth 1 and 2, six strips at depth 3
        assert_eq!(channels.len(), 2 * 58 * 72 + 6 * 72);

        for channel in channels.iter().step_by(97) {
            let flat = ChannelIndexer::index(channel).unwrap().flat();
            assert_eq!(ChannelIndexer::channel_at(flat), Some(*channel));
        }
    }

    #[test]
    fn test_ieta_zero_row_is_unpopulated() {
        let flat = StorageIndex {
            depth: 1,
            eta_slot: 29,
            phi_slot: 3,
        }
        .flat();
        assert_eq!(ChannelIndexer::channel_at(flat), None);
        assert_eq!(ChannelIndexer::channel_at(ChannelIndexer::arena_len()), None);
    }

    #[test]
    fn test_distribution_name() {
        let channel = DetectorChannel::new(3, -16, 7);
        assert_eq!(channel.distribution_name(), "Depth3_ieta-16_iphi7");
    }
}
