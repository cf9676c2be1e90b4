//! Property-based tests for the nested smoother and the filter bank.

use proptest::prelude::*;
use simmotion_telemetry_filters::{FilterSettings, NestedSmooth, RecordFilterBank};
use simmotion_telemetry_record::{DataKey, KeyMask, TelemetryRecord};

proptest! {
    #[test]
    fn smoother_output_always_finite(
        inputs in proptest::collection::vec(-1.0e4f32..1.0e4, 1..200),
        depth in 1usize..=8,
        tc in 0.0f32..1.0,
        dt in 0.0f32..0.1,
    ) {
        let mut smooth = NestedSmooth::new(depth, tc);
        for &x in &inputs {
            prop_assert!(smooth.step(x, dt).is_finite());
        }
    }

    #[test]
    fn smoother_stays_in_input_hull(
        inputs in proptest::collection::vec(-100.0f32..100.0, 1..100),
        depth in 1usize..=4,
    ) {
        // A convex smoother can never leave the hull of its inputs.
        let lo = inputs.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = inputs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut smooth = NestedSmooth::new(depth, 0.05);
        for &x in &inputs {
            let y = smooth.step(x, 0.01);
            prop_assert!(y >= lo - 1e-4 && y <= hi + 1e-4, "{y} outside [{lo}, {hi}]");
        }
    }

    #[test]
    fn smoother_deterministic(
        inputs in proptest::collection::vec(-10.0f32..10.0, 1..50),
    ) {
        let mut a = NestedSmooth::new(3, 0.05);
        let mut b = NestedSmooth::new(3, 0.05);
        for &x in &inputs {
            prop_assert_eq!(a.step(x, 0.01), b.step(x, 0.01));
        }
    }

    #[test]
    fn bank_respects_mask(value in -100.0f32..100.0) {
        let mut bank = RecordFilterBank::new(FilterSettings::default());
        let mut raw = TelemetryRecord::zeroed();
        for &key in DataKey::ALL {
            raw.set(key, value);
        }
        let mut out = TelemetryRecord::zeroed();
        let mask = KeyMask::of(&[DataKey::Speed, DataKey::Yaw]);
        bank.filter(&raw, &mut out, mask, true, 0.01);

        for &key in DataKey::ALL {
            if mask.contains(key) {
                continue;
            }
            prop_assert_eq!(out.get(key), 0.0, "unmasked {:?} was written", key);
        }
    }
}
