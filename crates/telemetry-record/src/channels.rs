//! Channel declarations and the flat telemetry record.
//!
//! `declare_channels!` is the single source of truth for channel order.
//! Everything downstream (byte layout, key masks, the schema table, the
//! filter bank) derives from `DataKey::ALL`, so reordering an entry here
//! changes the wire format for both processes at once.

use crate::error::RecordError;

/// Storage class of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Single-precision float channel.
    Float,
    /// Little-endian `i32` state channel.
    Int,
}

/// Exact value of one channel, preserving its storage class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    /// Value of a [`ChannelKind::Float`] channel.
    Float(f32),
    /// Value of a [`ChannelKind::Int`] channel.
    Int(i32),
}

impl ChannelValue {
    /// Widen to `f32`, casting integer channels.
    #[inline]
    pub fn as_f32(self) -> f32 {
        match self {
            ChannelValue::Float(v) => v,
            ChannelValue::Int(v) => v as f32,
        }
    }

    /// Little-endian byte image of the channel, 4 bytes either way.
    #[inline]
    pub fn to_le_bytes(self) -> [u8; 4] {
        match self {
            ChannelValue::Float(v) => v.to_le_bytes(),
            ChannelValue::Int(v) => v.to_le_bytes(),
        }
    }
}

macro_rules! declare_channels {
    (@ty f32) => { f32 };
    (@ty i32) => { i32 };
    (@kind f32) => { ChannelKind::Float };
    (@kind i32) => { ChannelKind::Int };
    (@read f32 $e:expr) => { ChannelValue::Float($e) };
    (@read i32 $e:expr) => { ChannelValue::Int($e) };
    (@write f32 $slot:expr, $v:expr) => {
        $slot = match $v {
            ChannelValue::Float(x) => x,
            ChannelValue::Int(x) => x as f32,
        }
    };
    (@write i32 $slot:expr, $v:expr) => {
        $slot = match $v {
            ChannelValue::Float(x) => x as i32,
            ChannelValue::Int(x) => x,
        }
    };
    ($( $variant:ident => $field:ident : $kind:tt ;)+) => {
        /// Ordered enumeration of every telemetry channel.
        ///
        /// Declaration order is authoritative: it fixes the byte offset of
        /// each channel in the serialized record and the channel's bit in a
        /// [`KeyMask`](crate::KeyMask).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum DataKey {
            $( $variant, )+
        }

        impl DataKey {
            /// Every channel, in declaration (wire) order.
            pub const ALL: &'static [DataKey] = &[ $( DataKey::$variant, )+ ];

            /// Canonical channel name, equal to the record field name.
            pub const fn name(self) -> &'static str {
                match self {
                    $( DataKey::$variant => stringify!($field), )+
                }
            }

            /// Storage class of the channel.
            pub const fn kind(self) -> ChannelKind {
                match self {
                    $( DataKey::$variant => declare_channels!(@kind $kind), )+
                }
            }

            /// Bit position of the channel in a key mask.
            #[inline]
            pub const fn bit(self) -> u64 {
                1u64 << (self as u8)
            }
        }

        /// One frame of motion telemetry: a flat, fixed-offset record.
        ///
        /// All channels default to zero. The struct is `Copy`, so frame
        /// snapshots (`last_filtered` and friends) are plain assignments.
        #[derive(Debug, Clone, Copy, PartialEq, Default)]
        pub struct TelemetryRecord {
            $( pub $field: declare_channels!(@ty $kind), )+
        }

        impl TelemetryRecord {
            /// Exact value of a channel.
            #[inline]
            pub fn channel(&self, key: DataKey) -> ChannelValue {
                match key {
                    $( DataKey::$variant => declare_channels!(@read $kind self.$field), )+
                }
            }

            /// Store a channel value, coercing across storage classes.
            #[inline]
            pub fn set_channel(&mut self, key: DataKey, value: ChannelValue) {
                match key {
                    $( DataKey::$variant => declare_channels!(@write $kind self.$field, value), )+
                }
            }
        }
    };
}

declare_channels! {
    // Pose
    PositionX => position_x: f32;
    PositionY => position_y: f32;
    PositionZ => position_z: f32;
    Pitch => pitch: f32;
    Yaw => yaw: f32;
    Roll => roll: f32;
    // Linear motion
    LocalVelocityX => local_velocity_x: f32;
    LocalVelocityY => local_velocity_y: f32;
    LocalVelocityZ => local_velocity_z: f32;
    GforceLateral => gforce_lateral: f32;
    GforceVertical => gforce_vertical: f32;
    GforceLongitudinal => gforce_longitudinal: f32;
    Speed => speed: f32;
    // Angular motion
    YawVelocity => yaw_velocity: f32;
    PitchVelocity => pitch_velocity: f32;
    RollVelocity => roll_velocity: f32;
    YawAcceleration => yaw_acceleration: f32;
    PitchAcceleration => pitch_acceleration: f32;
    RollAcceleration => roll_acceleration: f32;
    // Per-corner suspension
    SuspensionPositionBl => suspension_position_bl: f32;
    SuspensionPositionBr => suspension_position_br: f32;
    SuspensionPositionFl => suspension_position_fl: f32;
    SuspensionPositionFr => suspension_position_fr: f32;
    SuspensionVelocityBl => suspension_velocity_bl: f32;
    SuspensionVelocityBr => suspension_velocity_br: f32;
    SuspensionVelocityFl => suspension_velocity_fl: f32;
    SuspensionVelocityFr => suspension_velocity_fr: f32;
    SuspensionAccelerationBl => suspension_acceleration_bl: f32;
    SuspensionAccelerationBr => suspension_acceleration_br: f32;
    SuspensionAccelerationFl => suspension_acceleration_fl: f32;
    SuspensionAccelerationFr => suspension_acceleration_fr: f32;
    WheelPatchSpeedBl => wheel_patch_speed_bl: f32;
    WheelPatchSpeedBr => wheel_patch_speed_br: f32;
    WheelPatchSpeedFl => wheel_patch_speed_fl: f32;
    WheelPatchSpeedFr => wheel_patch_speed_fr: f32;
    // Engine and driver inputs
    EngineRate => engine_rate: f32;
    MaxRpm => max_rpm: i32;
    IdleRpm => idle_rpm: i32;
    Gear => gear: i32;
    MaxGears => max_gears: i32;
    SteeringInput => steering_input: f32;
    ThrottleInput => throttle_input: f32;
    BrakeInput => brake_input: f32;
    // State
    Paused => paused: i32;
}

/// Number of declared channels.
pub const CHANNEL_COUNT: usize = DataKey::ALL.len();

/// Serialized record size in bytes: every channel is 4 bytes, packed.
pub const RECORD_SIZE: usize = CHANNEL_COUNT * 4;

impl TelemetryRecord {
    /// A record with every channel zeroed.
    #[inline]
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Overwrite every channel from `other`.
    #[inline]
    pub fn copy_from(&mut self, other: &TelemetryRecord) {
        *self = *other;
    }

    /// Widened `f32` view of a channel.
    #[inline]
    pub fn get(&self, key: DataKey) -> f32 {
        self.channel(key).as_f32()
    }

    /// Store an `f32` into a channel, truncating into integer channels.
    #[inline]
    pub fn set(&mut self, key: DataKey, value: f32) {
        self.set_channel(key, ChannelValue::Float(value));
    }

    /// Serialize into the packed little-endian wire image.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        self.write_bytes(&mut buf);
        buf
    }

    /// Serialize into a caller-provided buffer of at least [`RECORD_SIZE`]
    /// bytes; returns the number of bytes written.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [`RECORD_SIZE`].
    pub fn write_bytes(&self, buf: &mut [u8]) -> usize {
        for (i, &key) in DataKey::ALL.iter().enumerate() {
            let off = i * 4;
            buf[off..off + 4].copy_from_slice(&self.channel(key).to_le_bytes());
        }
        RECORD_SIZE
    }

    /// Deserialize from a wire image of exactly [`RECORD_SIZE`] bytes.
    ///
    /// Total over any exact-size buffer: undefined bytes become channel
    /// values without interpretation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() != RECORD_SIZE {
            return Err(RecordError::WrongSize {
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        let mut record = TelemetryRecord::zeroed();
        for (i, &key) in DataKey::ALL.iter().enumerate() {
            let off = i * 4;
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&bytes[off..off + 4]);
            let value = match key.kind() {
                ChannelKind::Float => ChannelValue::Float(f32::from_le_bytes(raw)),
                ChannelKind::Int => ChannelValue::Int(i32::from_le_bytes(raw)),
            };
            record.set_channel(key, value);
        }
        Ok(record)
    }

    /// Linear interpolation from an all-zero record toward the current
    /// values: every float channel is scaled by `t`.
    ///
    /// Integer state channels keep their values, except `paused`, which is
    /// scaled toward zero so a fade cannot hold a stale pause flag at 1.
    pub fn lerp_all_from_zero(&mut self, t: f32) {
        for &key in DataKey::ALL {
            match key.kind() {
                ChannelKind::Float => {
                    let v = self.get(key);
                    self.set(key, v * t);
                }
                ChannelKind::Int if key == DataKey::Paused => {
                    self.paused = (self.paused as f32 * t) as i32;
                }
                ChannelKind::Int => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_channel_count_and_size() {
        assert_eq!(CHANNEL_COUNT, 44);
        assert_eq!(RECORD_SIZE, 176);
    }

    #[test]
    fn test_declaration_order_is_wire_order() {
        assert_eq!(DataKey::ALL[0], DataKey::PositionX);
        assert_eq!(DataKey::ALL[CHANNEL_COUNT - 1], DataKey::Paused);
        for (i, &key) in DataKey::ALL.iter().enumerate() {
            assert_eq!(key as usize, i, "discriminant out of order for {key:?}");
        }
    }

    #[test]
    fn test_names_match_fields() {
        assert_eq!(DataKey::PositionX.name(), "position_x");
        assert_eq!(DataKey::GforceLongitudinal.name(), "gforce_longitudinal");
        assert_eq!(DataKey::SuspensionPositionFr.name(), "suspension_position_fr");
        assert_eq!(DataKey::Paused.name(), "paused");
    }

    #[test]
    fn test_integer_channels() {
        for key in [
            DataKey::MaxRpm,
            DataKey::IdleRpm,
            DataKey::Gear,
            DataKey::MaxGears,
            DataKey::Paused,
        ] {
            assert_eq!(key.kind(), ChannelKind::Int, "{key:?} must be integer");
        }
        assert_eq!(DataKey::Speed.kind(), ChannelKind::Float);
    }

    #[test]
    fn test_keyed_access_round_trip() {
        let mut record = TelemetryRecord::zeroed();
        record.set(DataKey::LocalVelocityZ, 12.5);
        record.set_channel(DataKey::Gear, ChannelValue::Int(3));
        assert_eq!(record.local_velocity_z, 12.5);
        assert_eq!(record.gear, 3);
        assert_eq!(record.get(DataKey::LocalVelocityZ), 12.5);
        assert_eq!(record.channel(DataKey::Gear), ChannelValue::Int(3));
    }

    #[test]
    fn test_bytes_round_trip() -> TestResult {
        let mut record = TelemetryRecord::zeroed();
        record.position_x = 1.25;
        record.yaw = -0.5;
        record.speed = 42.0;
        record.gear = 4;
        record.max_rpm = 6000;
        record.paused = 1;
        let bytes = record.to_bytes();
        let decoded = TelemetryRecord::from_bytes(&bytes)?;
        assert_eq!(decoded, record);
        Ok(())
    }

    #[test]
    fn test_from_bytes_rejects_wrong_size() {
        let short = [0u8; RECORD_SIZE - 1];
        assert!(matches!(
            TelemetryRecord::from_bytes(&short),
            Err(RecordError::WrongSize { .. })
        ));
    }

    #[test]
    fn test_lerp_scales_floats_only() {
        let mut record = TelemetryRecord::zeroed();
        record.speed = 10.0;
        record.gforce_lateral = -2.0;
        record.gear = 4;
        record.max_gears = 6;
        record.paused = 1;
        record.lerp_all_from_zero(0.5);
        assert_eq!(record.speed, 5.0);
        assert_eq!(record.gforce_lateral, -1.0);
        assert_eq!(record.gear, 4);
        assert_eq!(record.max_gears, 6);
        assert_eq!(record.paused, 0);
    }

    #[test]
    fn test_lerp_identity_at_one() {
        let mut record = TelemetryRecord::zeroed();
        record.speed = 10.0;
        record.paused = 1;
        let before = record;
        record.lerp_all_from_zero(1.0);
        assert_eq!(record, before);
    }
}
