//! Property-based tests for the telemetry record contract.

use proptest::prelude::*;
use simmotion_telemetry_record::{DataKey, KeyMask, TelemetryRecord, RECORD_SIZE};

fn arb_record() -> impl Strategy<Value = TelemetryRecord> {
    (
        proptest::collection::vec(-1.0e6f32..1.0e6, DataKey::ALL.len()),
        -100i32..100,
        0i32..2,
    )
        .prop_map(|(floats, gear, paused)| {
            let mut record = TelemetryRecord::zeroed();
            for (i, &key) in DataKey::ALL.iter().enumerate() {
                record.set(key, floats[i]);
            }
            record.gear = gear;
            record.paused = paused;
            record
        })
}

fn arb_key_set() -> impl Strategy<Value = Vec<DataKey>> {
    proptest::collection::vec(0..DataKey::ALL.len(), 0..16)
        .prop_map(|indices| indices.into_iter().map(|i| DataKey::ALL[i]).collect())
}

proptest! {
    #[test]
    fn bytes_round_trip(record in arb_record()) {
        let bytes = record.to_bytes();
        prop_assert_eq!(bytes.len(), RECORD_SIZE);
        let decoded = TelemetryRecord::from_bytes(&bytes).map_err(|e| {
            TestCaseError::fail(format!("decode failed: {e}"))
        })?;
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn lerp_is_bounded(record in arb_record(), t in 0.0f32..=1.0) {
        let mut faded = record;
        faded.lerp_all_from_zero(t);
        for &key in DataKey::ALL {
            let original = record.get(key).abs();
            let bound = original * t + 1e-3;
            match key {
                DataKey::MaxRpm | DataKey::IdleRpm | DataKey::Gear | DataKey::MaxGears => {
                    // Integer state channels are exempt from the fade.
                    prop_assert_eq!(faded.get(key), record.get(key));
                }
                _ => prop_assert!(
                    faded.get(key).abs() <= bound,
                    "channel {:?}: |{}| > |{}| * {}",
                    key,
                    faded.get(key),
                    record.get(key),
                    t
                ),
            }
        }
    }

    #[test]
    fn mask_union_and_intersection(a in arb_key_set(), b in arb_key_set()) {
        let mask_a = KeyMask::of(&a);
        let mask_b = KeyMask::of(&b);

        let mut union_keys = a.clone();
        union_keys.extend(b.iter().copied());
        prop_assert_eq!(KeyMask::of(&union_keys), mask_a | mask_b);

        let inter: Vec<DataKey> = a
            .iter()
            .copied()
            .filter(|k| mask_b.contains(*k))
            .collect();
        prop_assert_eq!(KeyMask::of(&inter), mask_a & mask_b);
    }
}
