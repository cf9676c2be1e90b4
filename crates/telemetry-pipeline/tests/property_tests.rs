//! Property-based checks over the pipeline's guard rails.

use glam::{Mat4, Vec3};
use proptest::prelude::*;
use simmotion_telemetry_filters::FilterSettings;
use simmotion_telemetry_pipeline::{loop_angle_rad, MotionPipeline, NullControls};

proptest! {
    #[test]
    fn loop_angle_lands_in_range(x in -100.0f32..100.0, half in 0.01f32..10.0) {
        let wrapped = loop_angle_rad(x, half);
        prop_assert!(wrapped >= -half - 1e-3 && wrapped <= half + 1e-3);
    }

    #[test]
    fn degenerate_bases_never_consume(scale in 0.0f32..0.89) {
        let mut pipeline =
            MotionPipeline::new(FilterSettings::default(), Box::new(NullControls));
        let garbage = Mat4::from_scale(Vec3::splat(scale));
        prop_assert!(!pipeline.process_transform(garbage, 0.01));
        prop_assert_eq!(pipeline.dropped_sample_count(), u32::MAX);
    }

    #[test]
    fn derived_channels_stay_finite(
        steps in proptest::collection::vec((-10.0f32..10.0, -10.0f32..10.0, -10.0f32..10.0), 2..60),
        dt in 0.001f32..0.1,
    ) {
        let mut pipeline =
            MotionPipeline::new(FilterSettings::default(), Box::new(NullControls));
        for (x, y, z) in steps {
            pipeline.process_transform(Mat4::from_translation(Vec3::new(x, y, z)), dt);
            pipeline.send_filtered_data();
        }
        let out = pipeline.output();
        for &key in simmotion_telemetry_record::DataKey::ALL {
            prop_assert!(out.get(key).is_finite(), "channel {:?} not finite", key);
        }
    }
}
