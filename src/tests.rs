//! Cross-module scenarios for the timing processor

use crate::timing_core::grid::DEPTHS;
use crate::timing_core::{
    ChannelIndexer, DetectorChannel, EnergyTimeClassifier, EventId, EventProcessor, Measurement, TimingWindow,
};

fn event(n: u64) -> EventId {
    EventId {
        run: 254833,
        lumi: 12,
        event: n,
    }
}

fn hit(depth: u8, ieta: i32, iphi: i32, energy: f64, time: f64) -> Measurement {
    Measurement::new(DetectorChannel::new(depth, ieta, iphi), energy, time)
}

/// Deterministic pseudo-random hits spread over all depths, including some
/// invalid channels and energies on both sides of the threshold
fn scrambled_hits(seed: u64, count: usize) -> Vec<Measurement> {
    let mut state = seed;
    let mut next = move |modulus: u64| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) % modulus
    };

    (0..count)
        .map(|_| {
            let depth = 1 + next(3) as u8;
            let ieta = next(61) as i32 - 30;
            let iphi = 1 + next(72) as i32;
            let energy = next(40) as f64 * 0.5;
            let time = next(300) as f64 * 0.5 - 75.0;
            hit(depth, ieta, iphi, energy, time)
        })
        .collect()
}

#[test]
fn test_end_to_end_phi_pair() {
    let mut processor = EventProcessor::new(1.0, -50.0, 50.0);

    processor.process(&event(1), &[hit(1, 5, 67, 10.0, 3.0), hit(1, 5, 66, 10.0, 1.0)]);

    let correlator = processor.correlator();
    assert_eq!(correlator.within_difference().entries, 0);
    assert_eq!(correlator.within_correlation().entries, 0);

    let cross = correlator.cross_difference();
    assert_eq!(cross.entries, 1);
    assert_eq!(cross.count(cross.axis.bin(2.0)), 1);
    assert_eq!(correlator.cross_correlation().count_at(3.0, 1.0), 1);

    assert_eq!(processor.stats().cross_pairs, 1);
    assert_eq!(processor.stats().in_time, 2);
}

#[test]
fn test_occupancy_matches_distribution_entries() {
    let mut processor = EventProcessor::new(8.0, -30.0, 30.0);
    for n in 0..20 {
        processor.process(&event(n), &scrambled_hits(n + 1, 200));
    }

    let grid = processor.grid();
    let mut checked = 0;
    for channel in ChannelIndexer::all_channels() {
        let occupancy = grid.occupancy(&channel);
        let entries = grid.distribution(&channel).map_or(0, |h| h.entries);
        assert_eq!(occupancy, entries, "channel {}", channel);
        if occupancy > 0 {
            checked += 1;
        }
    }
    assert_eq!(checked, grid.booked_channels());
    assert!(checked > 0);
}

#[test]
fn test_depth_sums_match_profile_entries() {
    let mut processor = EventProcessor::new(8.0, -30.0, 30.0);
    for n in 0..20 {
        processor.process(&event(n), &scrambled_hits(n + 100, 200));
    }

    let grid = processor.grid();
    let mut total = 0;
    for depth in DEPTHS {
        let profile = grid.profile(depth).unwrap();
        let occupancy = grid.occupancy_map(depth).unwrap();
        assert_eq!(grid.distribution_entries(depth), profile.entries);
        assert_eq!(occupancy.entries, profile.entries);
        // values outside [-30, 30] are counted but not averaged
        assert!(profile.accepted() <= profile.entries);
        total += profile.entries;
    }

    let stats = processor.stats();
    assert_eq!(total, stats.above_threshold);
    assert_eq!(stats.measurements, 20 * 200);
}

#[test]
fn test_boundary_values() {
    let mut processor = EventProcessor::new(5.0, -50.0, 50.0);
    let channel = DetectorChannel::new(1, 7, 20);

    processor.process(
        &event(1),
        &[hit(1, 7, 20, 5.0, 0.0), hit(1, 7, 20, 9.0, 5.0), hit(1, 7, 20, 9.0, 12.0)],
    );

    // energy equal to the threshold stays out of the maps
    assert_eq!(processor.grid().occupancy(&channel), 2);

    let stats = processor.stats();
    assert_eq!(stats.in_time, 1);
    assert_eq!(stats.out_of_time_1, 0);
    assert_eq!(stats.out_of_time_2, 0);
    assert_eq!(EnergyTimeClassifier::classify(5.0), None);
    assert_eq!(EnergyTimeClassifier::classify(12.0), None);
    assert_eq!(EnergyTimeClassifier::classify(12.5), Some(TimingWindow::OutOfTime2));
}

#[test]
fn test_pair_counts_per_event() {
    let mut processor = EventProcessor::new(1.0, -50.0, 50.0);
    let mut expected_within = 0;
    let mut expected_cross = 0;

    for (n, (primary, neighbour)) in [(0u64, 3u64), (1, 0), (4, 2), (6, 6)].into_iter().enumerate() {
        let mut hits = Vec::new();
        for i in 0..primary {
            hits.push(hit(1, 1 + i as i32, 67, 10.0, i as f64));
        }
        for i in 0..neighbour {
            hits.push(hit(1, 1 + i as i32, 66, 10.0, -(i as f64)));
        }
        processor.process(&event(n as u64), &hits);

        expected_within += primary * primary.saturating_sub(1) / 2;
        expected_cross += primary * neighbour;
    }

    let stats = processor.stats();
    assert_eq!(stats.within_pairs, expected_within);
    assert_eq!(stats.cross_pairs, expected_cross);
    assert_eq!(processor.correlator().within_difference().entries, expected_within);
    assert_eq!(processor.correlator().cross_correlation().entries, expected_cross);
}

#[test]
fn test_region_spectrum_fan_out() {
    let mut processor = EventProcessor::new(100.0, -50.0, 50.0);

    processor.process(
        &event(1),
        &[
            hit(1, -5, 51, 40.0, 0.0),
            hit(2, -15, 54, 40.0, 8.0),
            hit(1, -16, 51, 40.0, 0.0),
            hit(1, 5, 51, 40.0, 0.0),
        ],
    );

    let classifier = processor.classifier();
    assert_eq!(classifier.global_spectrum(TimingWindow::InTime).entries, 3);
    assert_eq!(classifier.global_spectrum(TimingWindow::OutOfTime1).entries, 1);
    assert_eq!(classifier.region_spectrum(51, TimingWindow::InTime).unwrap().entries, 1);
    assert_eq!(classifier.region_spectrum(54, TimingWindow::OutOfTime1).unwrap().entries, 1);
    assert!(classifier.region_spectrum(52, TimingWindow::InTime).is_none());
}

#[test]
fn test_sharded_merge_equals_single_pass() {
    let events: Vec<Vec<Measurement>> = (0..10).map(|n| scrambled_hits(n + 500, 100)).collect();

    let mut single = EventProcessor::new(8.0, -30.0, 30.0);
    for (n, hits) in events.iter().enumerate() {
        single.process(&event(n as u64), hits);
    }

    let mut left = EventProcessor::new(8.0, -30.0, 30.0);
    let mut right = EventProcessor::new(8.0, -30.0, 30.0);
    for (n, hits) in events.iter().enumerate() {
        let shard = if n % 2 == 0 { &mut left } else { &mut right };
        shard.process(&event(n as u64), hits);
    }
    left.merge(&right).unwrap();

    assert_eq!(left.stats(), single.stats());
    for depth in DEPTHS {
        assert_eq!(left.grid().occupancy_map(depth), single.grid().occupancy_map(depth));
        assert_eq!(
            left.grid().profile(depth).unwrap().entries,
            single.grid().profile(depth).unwrap().entries
        );
    }
    assert_eq!(left.grid().booked_channels(), single.grid().booked_channels());
    assert_eq!(
        left.correlator().cross_correlation(),
        single.correlator().cross_correlation()
    );
}
