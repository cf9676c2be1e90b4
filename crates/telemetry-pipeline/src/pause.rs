//! Pause gate: fades the published record toward zero on user-requested
//! pause, with hysteresis so a re-toggle picks up mid-fade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use simmotion_telemetry_record::TelemetryRecord;

/// Full fade duration in seconds.
pub const PAUSE_FADE_TIME: f32 = 3.0;

/// Cloneable pause request shared between the pipeline and whatever input
/// source drives the toggle (hotkey adapter, UI, tests).
#[derive(Debug, Clone, Default)]
pub struct PauseHandle {
    requested: Arc<AtomicBool>,
}

impl PauseHandle {
    /// Request or clear the pause.
    pub fn set(&self, paused: bool) {
        self.requested.store(paused, Ordering::Relaxed);
    }

    /// Flip the request and return the new state.
    pub fn toggle(&self) -> bool {
        // fetch_xor returns the previous value.
        !self.requested.fetch_xor(true, Ordering::Relaxed)
    }

    /// Currently requested state.
    pub fn is_paused(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }
}

/// The fade state machine.
///
/// Toggling sets `timer = PAUSE_FADE_TIME - timer`, so a re-toggle before
/// the previous fade finished resumes from the same amplitude instead of
/// jumping. While paused the output is the latest published record scaled
/// by `timer / PAUSE_FADE_TIME` (fade out); after unpausing with time left
/// on the clock the live output is scaled by the complement (fade in).
#[derive(Debug, Clone, Copy)]
pub struct PauseGate {
    paused: bool,
    timer: f32,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    /// A gate that starts unpaused and fully faded in.
    pub fn new() -> Self {
        Self {
            paused: false,
            timer: 0.0,
        }
    }

    /// Whether the gate is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Seconds left on the active fade, zero when idle.
    pub fn timer(&self) -> f32 {
        self.timer
    }

    /// Track the requested state, flipping the timer on a change.
    pub fn request(&mut self, paused: bool) {
        if paused != self.paused {
            self.paused = paused;
            self.timer = PAUSE_FADE_TIME - self.timer;
        }
    }

    /// Produce the gated output for one frame.
    ///
    /// `filtered` is the live derived record, `last_published` the most
    /// recently published one. Advances the fade clock by `dt`.
    pub fn apply(
        &mut self,
        filtered: &TelemetryRecord,
        last_published: &TelemetryRecord,
        dt: f32,
    ) -> TelemetryRecord {
        let mut output;
        if self.paused {
            let lerp = self.timer / PAUSE_FADE_TIME;
            output = *last_published;
            output.lerp_all_from_zero(lerp);
            self.timer = (self.timer - dt).max(0.0);
        } else if self.timer > 0.0 {
            let lerp = self.timer / PAUSE_FADE_TIME;
            output = *filtered;
            output.lerp_all_from_zero(1.0 - lerp);
            self.timer = (self.timer - dt).max(0.0);
        } else {
            output = *filtered;
        }
        output.paused = i32::from(self.paused);
        output
    }
}
