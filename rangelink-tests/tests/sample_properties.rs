//! Property-based tests for the sample codec and stream analysis
//!
//! These tests use proptest to generate random samples and streams and check
//! the behavior the monitors rely on for all valid inputs.

use proptest::prelude::*;
use rangelink::protocol::{
    checksum, CalibrationPolicy, ClockOffsetCalibrator, DecodeError, DelayMonitor, GapReport,
    IntegrityScheme, Sample, SequenceTracker, WallTime, SAMPLE_SIZE,
};

// Property test strategies

fn scheme_strategy() -> impl Strategy<Value = IntegrityScheme> {
    prop_oneof![Just(IntegrityScheme::Xor), Just(IntegrityScheme::Digest)]
}

fn wall_time_strategy() -> impl Strategy<Value = WallTime> {
    (0i64..=4_102_444_800, 0u32..1_000_000).prop_map(|(secs, micros)| WallTime::new(secs, micros))
}

fn sample_strategy() -> impl Strategy<Value = Sample> {
    (
        any::<bool>(),
        any::<u32>(),
        any::<u32>(),
        wall_time_strategy(),
        scheme_strategy(),
    )
        .prop_map(|(sync, sequence, distance, send_time, scheme)| {
            if sync {
                Sample::sync(send_time, scheme)
            } else {
                Sample::data(sequence, distance, send_time, scheme)
            }
        })
}

/// Odd-sized delay bursts, in milliseconds
fn burst_strategy() -> impl Strategy<Value = Vec<f64>> {
    (0usize..6).prop_flat_map(|half| prop::collection::vec(-500.0f64..500.0, half * 2 + 1))
}

// Property tests

proptest! {
    #[test]
    fn prop_sample_roundtrip(sample in sample_strategy()) {
        let bytes = sample.encode();
        prop_assert_eq!(bytes.len(), SAMPLE_SIZE);

        let decoded = Sample::decode(&bytes).unwrap();
        prop_assert_eq!(decoded, sample);
        prop_assert!(decoded.is_valid());
    }

    #[test]
    fn prop_wrong_length_rejected(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assume!(bytes.len() != SAMPLE_SIZE);
        prop_assert_eq!(
            Sample::decode(&bytes),
            Err(DecodeError::Length { expected: SAMPLE_SIZE, actual: bytes.len() })
        );
    }

    #[test]
    fn prop_distance_corruption_detected(
        sample in sample_strategy(),
        flip in 1u32..,
    ) {
        let mut corrupted = sample;
        corrupted.distance ^= flip;

        // XOR is injective in each operand; a truncated digest can collide
        if sample.scheme == IntegrityScheme::Digest {
            prop_assume!(corrupted.expected_integrity() != sample.integrity);
        }
        prop_assert!(!Sample::decode(&corrupted.encode()).unwrap().is_valid());
    }

    #[test]
    fn prop_xor_misses_matching_flips(
        sequence in any::<u32>(),
        distance in any::<u32>(),
        flip in 1u32..,
    ) {
        // Flipping the same bits in both fields leaves the XOR unchanged
        let original = checksum(IntegrityScheme::Xor, sequence, distance);
        prop_assert_eq!(
            checksum(IntegrityScheme::Xor, sequence ^ flip, distance ^ flip),
            original
        );
    }

    #[test]
    fn prop_consecutive_stream_has_no_gaps(start in any::<u32>(), len in 1usize..300) {
        let mut tracker = SequenceTracker::new();
        for i in 0..len {
            let gap = tracker.observe(start.wrapping_add(i as u32));
            prop_assert!(!gap.is_gap(), "unexpected {:?}", gap);
        }

        let stats = tracker.stats();
        prop_assert_eq!(stats.observed, len as u64);
        prop_assert_eq!(stats.lost + stats.reordered + stats.duplicates, 0);
    }

    #[test]
    fn prop_lost_count_matches_dropped(
        start in any::<u32>(),
        keep in prop::collection::vec(any::<bool>(), 2..300),
    ) {
        let last = keep.len() - 1;
        let mut tracker = SequenceTracker::new();
        let mut dropped = 0u64;
        for (i, &kept) in keep.iter().enumerate() {
            if kept || i == 0 || i == last {
                tracker.observe(start.wrapping_add(i as u32));
            } else {
                dropped += 1;
            }
        }

        let stats = tracker.stats();
        prop_assert_eq!(stats.lost, dropped);
        prop_assert_eq!(stats.reordered, 0);
    }

    #[test]
    fn prop_step_back_is_reorder(start in any::<u32>(), behind in 1u32..=i32::MAX as u32) {
        let mut tracker = SequenceTracker::new();
        tracker.observe(start);
        let to = start.wrapping_sub(behind);
        prop_assert_eq!(
            tracker.observe(to),
            GapReport::Reordered { from: start, to, behind }
        );
    }

    #[test]
    fn prop_median_ignores_arrival_order(
        (burst, shuffled) in burst_strategy()
            .prop_flat_map(|b| (Just(b.clone()), Just(b).prop_shuffle()))
    ) {
        let calibrate = |delays: &[f64]| {
            let mut calibrator = ClockOffsetCalibrator::new(delays.len(), CalibrationPolicy::OneShot);
            for &d in delays {
                calibrator.submit(d);
            }
            calibrator.offset()
        };

        let offset = calibrate(&burst);
        prop_assert_eq!(offset, calibrate(&shuffled));

        let offset = offset.unwrap();
        let below = burst.iter().filter(|&&d| d < offset).count();
        let above = burst.iter().filter(|&&d| d > offset).count();
        prop_assert!(below <= burst.len() / 2);
        prop_assert!(above <= burst.len() / 2);
    }

    #[test]
    fn prop_delay_anomaly_is_strict(
        raw in -1_000.0f64..1_000.0,
        offset in -1_000.0f64..1_000.0,
        threshold in 0.0f64..10.0,
    ) {
        let report = DelayMonitor::new(threshold).check(raw, offset);
        prop_assert_eq!(report.raw, raw);
        prop_assert_eq!(report.anomaly, report.adjusted.abs() > threshold);
    }
}
