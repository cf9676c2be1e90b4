//! Noise filters for the motion telemetry pipeline.
//!
//! Every derived channel passes through a nested low-pass smoother before
//! it reaches the motion platform. The smoother runs inside the ~100 Hz
//! producer loop, so the same rules apply as in any RT path: no heap
//! allocation after construction, O(1) per-sample work, bounded execution
//! time, and stability under arbitrary non-negative `dt`.
//!
//! ## Modules
//! - `smooth` - `NestedSmooth`, a cascade of first-order exponential stages
//! - `settings` - per-channel-group tuning (`FilterSettings`)
//! - `bank` - `RecordFilterBank`, mask-gated smoothing over a whole record
//!
//! # Example
//!
//! ```
//! use simmotion_telemetry_filters::NestedSmooth;
//!
//! let mut smooth = NestedSmooth::new(2, 0.05);
//! let mut last = 0.0;
//! for _ in 0..200 {
//!     last = smooth.step(1.0, 0.01);
//! }
//! assert!((last - 1.0).abs() < 1e-3);
//! ```

#![deny(static_mut_refs)]
#![warn(missing_docs)]

mod bank;
mod settings;
mod smooth;

pub use bank::RecordFilterBank;
pub use settings::{FilterGroup, FilterSettings, GroupSettings};
pub use smooth::NestedSmooth;
