//! Per-frame event payload handed to the motion platform.

use simmotion_telemetry_record::{PacketSchema, TelemetryRecord};

/// One telemetry update, with channel lookup by name.
///
/// Name resolution goes through the packet schema table built once per
/// process; no reflection, no per-lookup allocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryInfo {
    record: TelemetryRecord,
}

impl TelemetryInfo {
    /// Wrap a decoded record.
    pub fn new(record: TelemetryRecord) -> Self {
        Self { record }
    }

    /// Channel value by canonical name, widened to `f32`; `None` for
    /// unknown names.
    pub fn get(&self, name: &str) -> Option<f32> {
        PacketSchema::shared()
            .field_by_name(name)
            .map(|field| self.record.get(field.key))
    }

    /// The underlying record.
    pub fn record(&self) -> &TelemetryRecord {
        &self.record
    }

    /// Every channel name, in wire order.
    pub fn channel_names() -> impl Iterator<Item = &'static str> {
        PacketSchema::shared().fields().iter().map(|f| f.name)
    }
}

/// Event stream element dispatched to the platform host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    /// A fresh (post-fade) telemetry record.
    Updated(TelemetryInfo),
}

#[cfg(test)]
mod tests {
    use super::*;
    use simmotion_telemetry_record::DataKey;

    #[test]
    fn test_lookup_by_name() {
        let mut record = TelemetryRecord::zeroed();
        record.set(DataKey::Speed, 33.0);
        record.gear = 4;

        let info = TelemetryInfo::new(record);
        assert_eq!(info.get("speed"), Some(33.0));
        assert_eq!(info.get("gear"), Some(4.0));
        assert_eq!(info.get("flux_capacitor"), None);
    }

    #[test]
    fn test_channel_names_cover_record() {
        let names: Vec<&str> = TelemetryInfo::channel_names().collect();
        assert_eq!(names.len(), DataKey::ALL.len());
        assert!(names.contains(&"gforce_longitudinal"));
        assert!(names.contains(&"paused"));
    }
}
