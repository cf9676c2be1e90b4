//! Two-phase start-up fade.
//!
//! A freshly (re)connected stream is untrustworthy: the first records may
//! carry a mid-corner pose or a filter still winding up. The fade holds
//! the output at zero while the stream settles, then ramps it in so the
//! platform never steps.

use simmotion_telemetry_record::TelemetryRecord;

/// Seconds of forced-zero output after (re)connecting.
pub const START_WAIT_TIME: f32 = 2.0;

/// Seconds of linear ramp from zero to pass-through.
pub const SMOOTH_IN_TIME: f32 = 3.0;

/// The fade state machine: zero hold, linear ramp, pass-through.
#[derive(Debug, Clone, Copy)]
pub struct StartupFade {
    start_wait: f32,
    smooth_in: f32,
}

impl Default for StartupFade {
    fn default() -> Self {
        Self::new()
    }
}

impl StartupFade {
    /// A fade at the beginning of its zero-hold phase.
    pub fn new() -> Self {
        Self {
            start_wait: START_WAIT_TIME,
            smooth_in: 0.0,
        }
    }

    /// Restart the fade from the zero-hold phase; called on reconnect.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether the fade still attenuates the output.
    pub fn is_active(&self) -> bool {
        self.start_wait > 0.0 || self.smooth_in > 0.0
    }

    /// Scale `record` for the current phase and advance the clock by
    /// `dt` seconds.
    pub fn apply(&mut self, record: &mut TelemetryRecord, dt: f32) {
        if self.start_wait > 0.0 {
            record.lerp_all_from_zero(0.0);
            self.start_wait -= dt;
            if self.start_wait <= 0.0 {
                self.smooth_in = SMOOTH_IN_TIME;
            }
        } else if self.smooth_in > 0.0 {
            let lerp = 1.0 - self.smooth_in / SMOOTH_IN_TIME;
            record.lerp_all_from_zero(lerp);
            self.smooth_in = (self.smooth_in - dt).max(0.0);
        }
    }
}
