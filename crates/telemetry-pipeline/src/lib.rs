//! Per-frame derivation pipeline for motion telemetry.
//!
//! The producer feeds rigid-body world transforms into
//! [`MotionPipeline::process_transform`] at ~100 Hz. Each frame runs a
//! fixed sequence of derivation stages - axis validation, local velocity,
//! g-forces, Euler angles, suspension synthesis, projection-based angular
//! velocity, engine and input proxies - smooths every channel through the
//! filter bank, applies the pause gate, and publishes the result over the
//! configured transports.
//!
//! The math is deterministic: given the same transform/dt sequence the
//! pipeline produces the same records. Nothing in the per-frame path
//! reads a clock, allocates, or blocks.
//!
//! ## Modules
//! - `pipeline` - the derivation pipeline itself
//! - `source` - the transform source seam and the worker-thread driver
//! - `controls` - driver-input snapshot seam
//! - `pause` - pause gate with hysteretic fade
//! - `math` - small vector/angle helpers shared by the stages

#![deny(static_mut_refs)]

mod controls;
mod error;
mod math;
mod pause;
mod pipeline;
mod source;

pub use controls::{ControlsProvider, ControlsSnapshot, NullControls};
pub use error::PipelineError;
pub use math::loop_angle_rad;
pub use pause::{PauseGate, PauseHandle, PAUSE_FADE_TIME};
pub use pipeline::{FrameOutcome, MotionPipeline};
pub use source::{PipelineDriver, TransformFrame, TransformSource};
