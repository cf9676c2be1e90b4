//! Nested low-pass smoother: a cascade of first-order exponential stages.

/// Upper bound on cascade depth. Deeper cascades add attack latency
/// without buying noticeable extra rejection at 100 Hz.
pub const MAX_STAGES: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
struct Stage {
    primed: bool,
    value: f32,
}

impl Stage {
    #[inline]
    fn step(&mut self, input: f32, alpha: f32) -> f32 {
        if !self.primed {
            self.primed = true;
            self.value = input;
        } else {
            self.value += alpha * (input - self.value);
        }
        self.value
    }
}

/// A cascade of first-order exponential low-pass stages.
///
/// Each stage computes `y += alpha * (x - y)` with
/// `alpha = dt / (time_constant + dt)`, which is bounded to `[0, 1)` for
/// any non-negative `dt`, so the cascade is unconditionally stable and its
/// step response is monotone: the output never overshoots the input.
///
/// Unprimed stages seed with their first sample instead of attacking from
/// zero. That makes a reset followed by a step land on the input directly,
/// and a second identical sample moves the output by at most one attack
/// step.
#[derive(Debug, Clone, Copy)]
pub struct NestedSmooth {
    stages: [Stage; MAX_STAGES],
    depth: usize,
    time_constant: f32,
}

impl NestedSmooth {
    /// Create a cascade of `depth` stages (clamped to `1..=MAX_STAGES`)
    /// with the given time constant in seconds.
    pub fn new(depth: usize, time_constant: f32) -> Self {
        Self {
            stages: [Stage::default(); MAX_STAGES],
            depth: depth.clamp(1, MAX_STAGES),
            time_constant: time_constant.max(0.0),
        }
    }

    /// Number of cascaded stages.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Clear all per-stage history; the next sample seeds the cascade.
    #[inline]
    pub fn reset(&mut self) {
        self.stages = [Stage::default(); MAX_STAGES];
    }

    /// Feed one sample through the cascade and return the smoothed value.
    ///
    /// Non-finite input resets the cascade and yields 0.0 so a single bad
    /// sample cannot poison the history.
    #[inline]
    pub fn step(&mut self, input: f32, dt: f32) -> f32 {
        if !input.is_finite() {
            self.reset();
            return 0.0;
        }
        let dt = dt.max(0.0);
        let alpha = if self.time_constant <= 0.0 {
            1.0
        } else {
            dt / (self.time_constant + dt)
        };
        let mut value = input;
        for stage in self.stages.iter_mut().take(self.depth) {
            value = stage.step(value, alpha);
        }
        value
    }

    /// Current output without feeding a sample; 0.0 before the first one.
    pub fn value(&self) -> f32 {
        let last = self.stages[self.depth - 1];
        if last.primed { last.value } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_seeds() {
        let mut smooth = NestedSmooth::new(3, 0.1);
        assert_eq!(smooth.step(5.0, 0.01), 5.0);
    }

    #[test]
    fn test_step_response_is_monotone() {
        let mut smooth = NestedSmooth::new(2, 0.05);
        smooth.step(0.0, 0.01);
        let mut prev = smooth.step(1.0, 0.01);
        for _ in 0..500 {
            let next = smooth.step(1.0, 0.01);
            assert!(next >= prev - 1e-7, "overshoot or regression: {next} < {prev}");
            assert!(next <= 1.0 + 1e-6, "overshoot past target: {next}");
            prev = next;
        }
        assert!((prev - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_then_identical_sample_is_stable() {
        let mut smooth = NestedSmooth::new(2, 0.1);
        for _ in 0..50 {
            smooth.step(3.0, 0.01);
        }
        smooth.reset();
        let seeded = smooth.step(7.0, 0.01);
        assert_eq!(seeded, 7.0);
        let again = smooth.step(7.0, 0.01);
        assert!((again - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_saturated_input_is_idempotent() {
        let mut smooth = NestedSmooth::new(3, 0.05);
        for _ in 0..1000 {
            smooth.step(2.5, 0.01);
        }
        let settled = smooth.step(2.5, 0.01);
        assert!((settled - 2.5).abs() < 1e-4);
    }

    #[test]
    fn test_zero_dt_holds_output() {
        let mut smooth = NestedSmooth::new(1, 0.1);
        smooth.step(0.0, 0.01);
        let before = smooth.step(10.0, 0.01);
        let held = smooth.step(100.0, 0.0);
        assert!((held - before).abs() < 1e-6);
    }

    #[test]
    fn test_huge_dt_tracks_input() {
        let mut smooth = NestedSmooth::new(2, 0.05);
        smooth.step(0.0, 0.01);
        let out = smooth.step(1.0, 1.0e6);
        assert!(out > 0.99 && out <= 1.0);
    }

    #[test]
    fn test_non_finite_input_resets() {
        let mut smooth = NestedSmooth::new(2, 0.05);
        smooth.step(5.0, 0.01);
        assert_eq!(smooth.step(f32::NAN, 0.01), 0.0);
        // Cascade reseeds from the next good sample.
        assert_eq!(smooth.step(2.0, 0.01), 2.0);
    }

    #[test]
    fn test_zero_time_constant_passes_through() {
        let mut smooth = NestedSmooth::new(4, 0.0);
        smooth.step(0.0, 0.01);
        assert_eq!(smooth.step(42.0, 0.01), 42.0);
    }
}
