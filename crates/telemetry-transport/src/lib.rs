//! Transport coupling the telemetry producer to its consumers.
//!
//! Two independent channels carry the serialized record:
//!
//! - a named shared-memory region ([`SharedTelemetryRegion`]) guarded by a
//!   cross-process lock, where the producer rewrites the first
//!   `RECORD_SIZE` bytes every frame and readers copy them out under the
//!   same lock;
//! - UDP datagrams ([`UdpTelemetrySender`] / [`UdpTelemetryReceiver`]),
//!   one record per datagram, no framing header, loss tolerated.
//!
//! The platform split lives in `platform/`: Windows uses the named
//! file-mapping and mutex objects, Unix uses `shm_open` plus an advisory
//! byte-range lock on the region's first byte.
//!
//! ## Modules
//! - `region` - shared-memory region API
//! - `udp` - datagram sender/receiver
//! - `error` - transport error type
//! - `platform` - OS-specific region implementations

#![deny(static_mut_refs)]

mod error;
mod platform;
mod region;
mod udp;

pub use error::TransportError;
pub use region::SharedTelemetryRegion;
pub use udp::{UdpTelemetryReceiver, UdpTelemetrySender};

/// Name of the shared mapping both processes open.
pub const MAPPING_NAME: &str = "GenericTelemetryProviderFiltered";

/// Name of the cross-process lock guarding the mapping.
pub const MUTEX_NAME: &str = "GenericTelemetryProviderMutex";

/// Size of the shared mapping in bytes. The record occupies the first
/// `RECORD_SIZE` bytes; the remainder is reserved.
pub const MAPPING_SIZE: usize = 10_000;
