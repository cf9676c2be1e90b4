//! Consumer side of the telemetry relay.
//!
//! The consumer polls the producer's output - UDP datagrams or the shared
//! memory mapping, per configuration - applies the start-up fade, and
//! dispatches each record as a [`TelemetryEvent`] to the motion-platform
//! host over an mpsc channel.
//!
//! Reconnect behavior is deliberately quiet: while the producer is absent
//! the worker retries every second without log spam, and a producer that
//! goes silent for more than half a second only downgrades `is_running`.
//!
//! ## Modules
//! - `consumer` - the polling worker and its service surface
//! - `event` - `TelemetryInfo`, the per-frame event payload
//! - `fade` - two-phase start-up fade

#![deny(static_mut_refs)]

mod consumer;
mod error;
mod event;
mod fade;

pub use consumer::{MotionConsumer, TelemetryReceiver, TelemetrySource};
pub use error::ConsumerError;
pub use event::{TelemetryEvent, TelemetryInfo};
pub use fade::{StartupFade, SMOOTH_IN_TIME, START_WAIT_TIME};
