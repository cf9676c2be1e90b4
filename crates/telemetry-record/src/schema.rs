//! Packet schema: the ordered field table behind the wire layout.
//!
//! The original layout ships as an external file loaded once per process.
//! Its runtime product is what matters to the relay: an ordered list of
//! named fields with byte offsets, storage kinds, and mask bits, plus a
//! name lookup used by the consumer's event surface. The file itself is an
//! injected dependency; nothing here hard-codes a path.

use std::collections::HashMap;
use std::io::Read;
use std::sync::OnceLock;

#[cfg(test)]
use crate::channels::RECORD_SIZE;
use crate::channels::{ChannelKind, DataKey, TelemetryRecord, CHANNEL_COUNT};
use crate::error::RecordError;
use crate::mask::KeyMask;

/// One entry of the packet layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketField {
    /// The channel this field carries.
    pub key: DataKey,
    /// Canonical channel name.
    pub name: &'static str,
    /// Byte offset of the field in the serialized record.
    pub offset: usize,
    /// Storage class.
    pub kind: ChannelKind,
}

/// Ordered field table describing the serialized record.
///
/// Producer and consumer build the same table once per process (see
/// [`PacketSchema::shared`]); encode/decode walk it in order, so the table
/// ordering is the wire ordering.
#[derive(Debug, Clone)]
pub struct PacketSchema {
    fields: Vec<PacketField>,
    by_name: HashMap<&'static str, usize>,
}

impl PacketSchema {
    /// The canonical layout in channel-declaration order.
    pub fn canonical() -> PacketSchema {
        let mut fields = Vec::with_capacity(CHANNEL_COUNT);
        let mut by_name = HashMap::with_capacity(CHANNEL_COUNT);
        for (index, &key) in DataKey::ALL.iter().enumerate() {
            fields.push(PacketField {
                key,
                name: key.name(),
                offset: index * 4,
                kind: key.kind(),
            });
            by_name.insert(key.name(), index);
        }
        PacketSchema { fields, by_name }
    }

    /// Process-wide shared canonical schema, built on first use.
    pub fn shared() -> &'static PacketSchema {
        static SHARED: OnceLock<PacketSchema> = OnceLock::new();
        SHARED.get_or_init(PacketSchema::canonical)
    }

    /// Build a layout from an injected channel-name list, JSON array of
    /// strings. The list must name every declared channel exactly once;
    /// its order becomes the wire order.
    pub fn from_layout_reader(reader: impl Read) -> Result<PacketSchema, RecordError> {
        let names: Vec<String> = serde_json::from_reader(reader)?;
        let mut keys = Vec::with_capacity(names.len());
        for name in &names {
            let key = DataKey::ALL
                .iter()
                .copied()
                .find(|k| k.name() == name)
                .ok_or_else(|| RecordError::UnknownChannel(name.clone()))?;
            keys.push(key);
        }
        Self::from_keys(keys.into_iter())
    }

    fn from_keys(keys: impl Iterator<Item = DataKey>) -> Result<PacketSchema, RecordError> {
        let mut fields = Vec::with_capacity(CHANNEL_COUNT);
        let mut by_name = HashMap::with_capacity(CHANNEL_COUNT);
        let mut seen = KeyMask::EMPTY;
        for key in keys {
            if seen.contains(key) {
                return Err(RecordError::DuplicateChannel(key.name().to_string()));
            }
            seen.insert(key);
            let index = fields.len();
            fields.push(PacketField {
                key,
                name: key.name(),
                offset: index * 4,
                kind: key.kind(),
            });
            by_name.insert(key.name(), index);
        }
        if fields.len() != CHANNEL_COUNT {
            return Err(RecordError::IncompleteLayout {
                missing: CHANNEL_COUNT - fields.len(),
                total: CHANNEL_COUNT,
            });
        }
        Ok(PacketSchema { fields, by_name })
    }

    /// Fields in wire order.
    pub fn fields(&self) -> &[PacketField] {
        &self.fields
    }

    /// Serialized record size described by this schema.
    pub fn record_size(&self) -> usize {
        self.fields.len() * 4
    }

    /// Look up a field by channel name.
    pub fn field_by_name(&self, name: &str) -> Option<&PacketField> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Mask for the named channels; unknown names are reported.
    pub fn key_mask(&self, names: &[&str]) -> Result<KeyMask, RecordError> {
        let mut mask = KeyMask::EMPTY;
        for name in names {
            let field = self
                .field_by_name(name)
                .ok_or_else(|| RecordError::UnknownChannel((*name).to_string()))?;
            mask.insert(field.key);
        }
        Ok(mask)
    }

    /// Encode a record into `buf` following the schema's field order.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [`PacketSchema::record_size`].
    pub fn encode(&self, record: &TelemetryRecord, buf: &mut [u8]) -> usize {
        for field in &self.fields {
            let raw = record.channel(field.key).to_le_bytes();
            buf[field.offset..field.offset + 4].copy_from_slice(&raw);
        }
        self.record_size()
    }

    /// Decode a record from a buffer of exactly
    /// [`PacketSchema::record_size`] bytes, following field order.
    pub fn decode(&self, bytes: &[u8]) -> Result<TelemetryRecord, RecordError> {
        if bytes.len() != self.record_size() {
            return Err(RecordError::WrongSize {
                expected: self.record_size(),
                actual: bytes.len(),
            });
        }
        let mut record = TelemetryRecord::zeroed();
        for field in &self.fields {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[field.offset..field.offset + 4]);
            let value = match field.kind {
                ChannelKind::Float => {
                    crate::channels::ChannelValue::Float(f32::from_le_bytes(raw))
                }
                ChannelKind::Int => crate::channels::ChannelValue::Int(i32::from_le_bytes(raw)),
            };
            record.set_channel(field.key, value);
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_canonical_matches_declaration() {
        let schema = PacketSchema::canonical();
        assert_eq!(schema.record_size(), RECORD_SIZE);
        assert_eq!(schema.fields().len(), CHANNEL_COUNT);
        for (i, field) in schema.fields().iter().enumerate() {
            assert_eq!(field.key, DataKey::ALL[i]);
            assert_eq!(field.offset, i * 4);
        }
    }

    #[test]
    fn test_shared_is_canonical() {
        let shared = PacketSchema::shared();
        assert_eq!(shared.fields().len(), CHANNEL_COUNT);
        assert!(std::ptr::eq(shared, PacketSchema::shared()));
    }

    #[test]
    fn test_name_lookup() {
        let schema = PacketSchema::canonical();
        let field = schema.field_by_name("gforce_lateral").ok_or("missing");
        assert!(field.is_ok());
        assert!(schema.field_by_name("no_such_channel").is_none());
    }

    #[test]
    fn test_encode_matches_record_bytes() -> TestResult {
        let mut record = TelemetryRecord::zeroed();
        record.speed = 31.5;
        record.gear = 2;
        let schema = PacketSchema::canonical();
        let mut buf = vec![0u8; schema.record_size()];
        schema.encode(&record, &mut buf);
        assert_eq!(&buf[..], &record.to_bytes()[..]);
        let decoded = schema.decode(&buf)?;
        assert_eq!(decoded, record);
        Ok(())
    }

    #[test]
    fn test_layout_reader_reorders_wire_format() -> TestResult {
        // Reverse the canonical order; offsets must follow the file order.
        let names: Vec<&str> = DataKey::ALL.iter().rev().map(|k| k.name()).collect();
        let json = serde_json::to_string(&names)?;
        let schema = PacketSchema::from_layout_reader(json.as_bytes())?;
        assert_eq!(schema.fields()[0].key, DataKey::Paused);
        assert_eq!(schema.fields()[0].offset, 0);
        Ok(())
    }

    #[test]
    fn test_layout_reader_rejects_unknown_and_missing() -> TestResult {
        let bad = serde_json::to_string(&["position_x", "warp_drive"])?;
        assert!(matches!(
            PacketSchema::from_layout_reader(bad.as_bytes()),
            Err(RecordError::UnknownChannel(_))
        ));

        let partial = serde_json::to_string(&["position_x", "position_y"])?;
        assert!(matches!(
            PacketSchema::from_layout_reader(partial.as_bytes()),
            Err(RecordError::IncompleteLayout { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_key_mask_by_name() -> TestResult {
        let schema = PacketSchema::canonical();
        let mask = schema.key_mask(&["position_x", "speed"])?;
        assert!(mask.contains(DataKey::PositionX));
        assert!(mask.contains(DataKey::Speed));
        assert!(!mask.contains(DataKey::Yaw));
        Ok(())
    }
}
