//! Per-channel-group filter tuning.

use serde::{Deserialize, Serialize};
use simmotion_telemetry_record::DataKey;

/// Channel groups that share smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterGroup {
    /// World position channels.
    Position,
    /// Local velocity channels.
    Velocity,
    /// G-force channels.
    Acceleration,
    /// Angular velocity and acceleration channels.
    Angular,
    /// Suspension position/velocity/acceleration channels.
    Suspension,
    /// Everything else (pose angles, speed, engine, inputs).
    Default,
}

impl FilterGroup {
    /// The group a channel belongs to.
    pub fn of(key: DataKey) -> FilterGroup {
        use DataKey::*;
        match key {
            PositionX | PositionY | PositionZ => FilterGroup::Position,
            LocalVelocityX | LocalVelocityY | LocalVelocityZ => FilterGroup::Velocity,
            GforceLateral | GforceVertical | GforceLongitudinal => FilterGroup::Acceleration,
            YawVelocity | PitchVelocity | RollVelocity | YawAcceleration | PitchAcceleration
            | RollAcceleration => FilterGroup::Angular,
            SuspensionPositionBl | SuspensionPositionBr | SuspensionPositionFl
            | SuspensionPositionFr | SuspensionVelocityBl | SuspensionVelocityBr
            | SuspensionVelocityFl | SuspensionVelocityFr | SuspensionAccelerationBl
            | SuspensionAccelerationBr | SuspensionAccelerationFl | SuspensionAccelerationFr => {
                FilterGroup::Suspension
            }
            _ => FilterGroup::Default,
        }
    }
}

/// Smoothing parameters for one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSettings {
    /// Cascaded first-order stages.
    pub stages: usize,
    /// Time constant per stage, seconds.
    pub time_constant_s: f32,
}

impl GroupSettings {
    /// Settings for `stages` stages at `time_constant_s` seconds.
    pub fn new(stages: usize, time_constant_s: f32) -> Self {
        Self {
            stages,
            time_constant_s,
        }
    }
}

/// Full filter tuning: one [`GroupSettings`] per group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// World position smoothing.
    pub position: GroupSettings,
    /// Local velocity smoothing.
    pub velocity: GroupSettings,
    /// G-force smoothing.
    pub acceleration: GroupSettings,
    /// Angular channel smoothing.
    pub angular: GroupSettings,
    /// Suspension channel smoothing.
    pub suspension: GroupSettings,
    /// Smoothing for the remaining channels.
    pub default: GroupSettings,
}

impl FilterSettings {
    /// Settings for a group.
    pub fn group(&self, group: FilterGroup) -> GroupSettings {
        match group {
            FilterGroup::Position => self.position,
            FilterGroup::Velocity => self.velocity,
            FilterGroup::Acceleration => self.acceleration,
            FilterGroup::Angular => self.angular,
            FilterGroup::Suspension => self.suspension,
            FilterGroup::Default => self.default,
        }
    }

    /// Settings for the group of a channel.
    pub fn for_key(&self, key: DataKey) -> GroupSettings {
        self.group(FilterGroup::of(key))
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            position: GroupSettings::new(2, 0.02),
            velocity: GroupSettings::new(2, 0.04),
            acceleration: GroupSettings::new(3, 0.06),
            angular: GroupSettings::new(2, 0.05),
            suspension: GroupSettings::new(2, 0.04),
            default: GroupSettings::new(1, 0.02),
        }
    }
}
