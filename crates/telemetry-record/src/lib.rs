//! Fixed-layout motion telemetry record shared by producer and consumer.
//!
//! The record layout is a cross-process contract: both sides of the relay
//! link this crate, and the byte image written to shared memory or a UDP
//! datagram is exactly [`RECORD_SIZE`] bytes in channel-declaration order,
//! little-endian, packed.
//!
//! ## Modules
//! - `channels` - `DataKey` enumeration, `TelemetryRecord`, keyed access,
//!   byte (de)serialization, and the zero-lerp used for fades
//! - `mask` - `KeyMask` bitset over `DataKey`
//! - `schema` - `PacketSchema`, the ordered field table with name lookup
//! - `error` - record and schema error types

#![deny(static_mut_refs)]

mod channels;
mod error;
mod mask;
mod schema;

pub use channels::{ChannelKind, ChannelValue, DataKey, TelemetryRecord, CHANNEL_COUNT, RECORD_SIZE};
pub use error::RecordError;
pub use mask::KeyMask;
pub use schema::{PacketField, PacketSchema};
