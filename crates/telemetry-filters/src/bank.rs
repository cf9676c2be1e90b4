//! Mask-gated smoothing over a whole telemetry record.

use simmotion_telemetry_record::{ChannelKind, DataKey, KeyMask, TelemetryRecord, CHANNEL_COUNT};

use crate::settings::FilterSettings;
use crate::smooth::NestedSmooth;

/// One [`NestedSmooth`] per channel, applied under a key mask.
///
/// `filter` copies a smoothed value from `raw` into `out` for every float
/// channel whose bit is set in the mask; unmasked channels in `out` are
/// left untouched. Integer channels in the mask are copied verbatim (there
/// is nothing meaningful to smooth in a gear number). When `reset` is
/// true, the per-channel history of the masked channels is cleared first,
/// so they seed from the current raw values.
#[derive(Debug, Clone)]
pub struct RecordFilterBank {
    smoothers: Vec<NestedSmooth>,
    settings: FilterSettings,
}

impl RecordFilterBank {
    /// Build a bank from per-group tuning. All allocation happens here;
    /// `filter` itself is allocation-free.
    pub fn new(settings: FilterSettings) -> Self {
        let smoothers = DataKey::ALL
            .iter()
            .map(|&key| {
                let group = settings.for_key(key);
                NestedSmooth::new(group.stages, group.time_constant_s)
            })
            .collect();
        Self { smoothers, settings }
    }

    /// The tuning this bank was built with.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Clear the history of every channel.
    pub fn reset_all(&mut self) {
        for smoother in &mut self.smoothers {
            smoother.reset();
        }
    }

    /// Smooth the masked channels of `raw` into `out`.
    pub fn filter(
        &mut self,
        raw: &TelemetryRecord,
        out: &mut TelemetryRecord,
        mask: KeyMask,
        reset: bool,
        dt: f32,
    ) {
        debug_assert_eq!(self.smoothers.len(), CHANNEL_COUNT);
        for (i, &key) in DataKey::ALL.iter().enumerate() {
            if !mask.contains(key) {
                continue;
            }
            match key.kind() {
                ChannelKind::Float => {
                    let smoother = &mut self.smoothers[i];
                    if reset {
                        smoother.reset();
                    }
                    let smoothed = smoother.step(raw.get(key), dt);
                    out.set(key, smoothed);
                }
                ChannelKind::Int => {
                    out.set_channel(key, raw.channel(key));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> RecordFilterBank {
        RecordFilterBank::new(FilterSettings::default())
    }

    #[test]
    fn test_unmasked_channels_untouched() {
        let mut bank = bank();
        let mut raw = TelemetryRecord::zeroed();
        raw.speed = 50.0;
        raw.position_x = 9.0;

        let mut out = TelemetryRecord::zeroed();
        out.position_x = -1.0;

        let mask = KeyMask::single(DataKey::Speed);
        bank.filter(&raw, &mut out, mask, true, 0.01);

        assert_eq!(out.position_x, -1.0);
        assert_eq!(out.speed, 50.0);
    }

    #[test]
    fn test_reset_seeds_from_raw() {
        let mut bank = bank();
        let mut raw = TelemetryRecord::zeroed();
        raw.local_velocity_z = 20.0;
        let mut out = TelemetryRecord::zeroed();

        let mask = KeyMask::single(DataKey::LocalVelocityZ);
        bank.filter(&raw, &mut out, mask, true, 0.01);
        assert_eq!(out.local_velocity_z, 20.0);

        // A second immediate call without reset barely moves the output.
        bank.filter(&raw, &mut out, mask, false, 0.01);
        assert!((out.local_velocity_z - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_integer_channels_copy_verbatim() {
        let mut bank = bank();
        let mut raw = TelemetryRecord::zeroed();
        raw.gear = 4;
        raw.paused = 1;
        let mut out = TelemetryRecord::zeroed();

        let mask = KeyMask::of(&[DataKey::Gear, DataKey::Paused]);
        bank.filter(&raw, &mut out, mask, false, 0.01);
        assert_eq!(out.gear, 4);
        assert_eq!(out.paused, 1);
    }

    #[test]
    fn test_smoothing_converges_to_step() {
        let mut bank = bank();
        let mut raw = TelemetryRecord::zeroed();
        let mut out = TelemetryRecord::zeroed();
        let mask = KeyMask::single(DataKey::GforceLateral);

        bank.filter(&raw, &mut out, mask, true, 0.01);
        raw.gforce_lateral = 2.0;
        let mut last = 0.0;
        for _ in 0..400 {
            bank.filter(&raw, &mut out, mask, false, 0.01);
            let next = out.gforce_lateral;
            assert!(next >= last - 1e-6, "non-monotone attack");
            assert!(next <= 2.0 + 1e-5, "overshoot");
            last = next;
        }
        assert!((last - 2.0).abs() < 1e-2);
    }
}
