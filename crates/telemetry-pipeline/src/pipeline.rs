//! The derivation pipeline: world transforms in, filtered records out.

use glam::{Mat4, Vec2, Vec3};
use tracing::{info, warn};

use simmotion_telemetry_config::ProducerConfig;
use simmotion_telemetry_filters::{FilterSettings, RecordFilterBank};
use simmotion_telemetry_record::{DataKey, KeyMask, PacketSchema, TelemetryRecord, RECORD_SIZE};
use simmotion_telemetry_transport::{SharedTelemetryRegion, UdpTelemetrySender};

use crate::controls::ControlsProvider;
use crate::error::PipelineError;
use crate::math::{acos_clamped, finite_or_zero, loop_angle_rad, rotation_only, rotation_quat, sign};
use crate::pause::{PauseGate, PauseHandle};

/// Standard gravity, m/s².
const G: f32 = 9.806_65;

/// Rotation axes shorter than this mark a frame as garbage.
const MIN_AXIS_LENGTH: f32 = 0.9;

/// Substitute frame delta when the caller hands us a non-positive one.
const FALLBACK_DT: f32 = 0.015;

/// Planar acceleration (m/s²) that drives the suspension proxy to full
/// deflection.
const MAX_SUSPENSION_ACCEL: f32 = 3.0;

/// Suspension travel at rest, millimeters.
const TRAVEL_CENTER: f32 = -20.0;
/// Full-compression offset from center (8 - TRAVEL_CENTER).
const TRAVEL_MAX: f32 = 28.0;
/// Full-droop offset from center (-80 - TRAVEL_CENTER).
const TRAVEL_MIN: f32 = -60.0;

/// Engine proxy constants: the relay has no real drivetrain data.
const PROXY_MAX_RPM: i32 = 6000;
const PROXY_IDLE_RPM: i32 = 700;
const PROXY_GEAR: i32 = 1;
const PROXY_MAX_GEARS: i32 = 6;
const PROXY_RPM_SPAN: f32 = 5500.0;

struct Corner {
    /// Direction from the chassis center toward the corner, unnormalized.
    direction: Vec2,
    position: DataKey,
    velocity: DataKey,
    acceleration: DataKey,
    patch: DataKey,
}

/// Corner layout: x is right-positive, y is forward-positive.
static CORNERS: [Corner; 4] = [
    Corner {
        direction: Vec2::new(-0.5, -1.0),
        position: DataKey::SuspensionPositionBl,
        velocity: DataKey::SuspensionVelocityBl,
        acceleration: DataKey::SuspensionAccelerationBl,
        patch: DataKey::WheelPatchSpeedBl,
    },
    Corner {
        direction: Vec2::new(0.5, -1.0),
        position: DataKey::SuspensionPositionBr,
        velocity: DataKey::SuspensionVelocityBr,
        acceleration: DataKey::SuspensionAccelerationBr,
        patch: DataKey::WheelPatchSpeedBr,
    },
    Corner {
        direction: Vec2::new(-0.5, 1.0),
        position: DataKey::SuspensionPositionFl,
        velocity: DataKey::SuspensionVelocityFl,
        acceleration: DataKey::SuspensionAccelerationFl,
        patch: DataKey::WheelPatchSpeedFl,
    },
    Corner {
        direction: Vec2::new(0.5, 1.0),
        position: DataKey::SuspensionPositionFr,
        velocity: DataKey::SuspensionVelocityFr,
        acceleration: DataKey::SuspensionAccelerationFr,
        patch: DataKey::WheelPatchSpeedFr,
    },
];

/// What `process_transform` did with the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No frame processed yet.
    Idle,
    /// First valid frame: state seeded, nothing derived.
    Seeded,
    /// Rotation basis was degenerate; frame rejected.
    Garbage,
    /// Transform identical to the previous frame; output echoes it.
    Stale,
    /// Full derivation ran; the output is ready to publish.
    Derived,
}

/// Per-instance derivation state. Exclusively owned by the producer's
/// worker; nothing here is shared except the pause request flag.
pub struct MotionPipeline {
    raw: TelemetryRecord,
    filtered: TelemetryRecord,
    output: TelemetryRecord,
    last_filtered: TelemetryRecord,

    last_transform: Mat4,
    last_position: Vec3,
    last_velocity: Vec3,
    last_world_velocity: Vec3,
    last_raw_position: Vec3,
    rot_inv: Mat4,
    last_frame_valid: bool,
    position_primed: bool,
    dropped_samples: u32,
    outcome: FrameOutcome,

    bank: RecordFilterBank,
    pause: PauseGate,
    pause_handle: PauseHandle,
    controls: Box<dyn ControlsProvider>,

    position_mask: KeyMask,
    velocity_mask: KeyMask,
    accel_mask: KeyMask,
    angular_velocity_mask: KeyMask,
    suspension_velocity_mask: KeyMask,
    residual_mask: KeyMask,

    region: Option<SharedTelemetryRegion>,
    udp: Option<UdpTelemetrySender>,
}

impl std::fmt::Debug for MotionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionPipeline")
            .field("outcome", &self.outcome)
            .field("dropped_samples", &self.dropped_samples)
            .field("last_frame_valid", &self.last_frame_valid)
            .field("mmf", &self.region.is_some())
            .field("udp", &self.udp.is_some())
            .finish()
    }
}

impl MotionPipeline {
    /// A pipeline with no publish sinks attached; used directly by tests
    /// and embedded hosts that only want the derived records.
    pub fn new(settings: FilterSettings, controls: Box<dyn ControlsProvider>) -> Self {
        let position_mask =
            KeyMask::of(&[DataKey::PositionX, DataKey::PositionY, DataKey::PositionZ]);
        let velocity_mask = KeyMask::of(&[
            DataKey::LocalVelocityX,
            DataKey::LocalVelocityY,
            DataKey::LocalVelocityZ,
        ]);
        let accel_mask = KeyMask::of(&[
            DataKey::GforceLateral,
            DataKey::GforceVertical,
            DataKey::GforceLongitudinal,
        ]);
        let angular_velocity_mask = KeyMask::of(&[
            DataKey::YawVelocity,
            DataKey::PitchVelocity,
            DataKey::RollVelocity,
        ]);
        let suspension_velocity_mask = KeyMask::of(&[
            DataKey::SuspensionVelocityBl,
            DataKey::SuspensionVelocityBr,
            DataKey::SuspensionVelocityFl,
            DataKey::SuspensionVelocityFr,
        ]);
        let residual_mask = (position_mask
            | velocity_mask
            | accel_mask
            | angular_velocity_mask
            | suspension_velocity_mask)
            .complement();

        Self {
            raw: TelemetryRecord::zeroed(),
            filtered: TelemetryRecord::zeroed(),
            output: TelemetryRecord::zeroed(),
            last_filtered: TelemetryRecord::zeroed(),
            last_transform: Mat4::IDENTITY,
            last_position: Vec3::ZERO,
            last_velocity: Vec3::ZERO,
            last_world_velocity: Vec3::ZERO,
            last_raw_position: Vec3::ZERO,
            rot_inv: Mat4::IDENTITY,
            last_frame_valid: false,
            position_primed: false,
            dropped_samples: 0,
            outcome: FrameOutcome::Idle,
            bank: RecordFilterBank::new(settings),
            pause: PauseGate::new(),
            pause_handle: PauseHandle::default(),
            controls,
            position_mask,
            velocity_mask,
            accel_mask,
            angular_velocity_mask,
            suspension_velocity_mask,
            residual_mask,
            region: None,
            udp: None,
        }
    }

    /// Build a pipeline with publish sinks attached per `config`.
    pub fn start_sending(
        config: &ProducerConfig,
        settings: FilterSettings,
        controls: Box<dyn ControlsProvider>,
    ) -> Result<Self, PipelineError> {
        let mut pipeline = Self::new(settings, controls);
        if config.fill_mmf {
            pipeline.region = Some(SharedTelemetryRegion::create()?);
        }
        if config.send_udp {
            let target = format!("{}:{}", config.udp_ip, config.udp_port);
            let target = target
                .parse()
                .map_err(|source| PipelineError::InvalidTarget {
                    target: target.clone(),
                    source,
                })?;
            pipeline.udp = Some(UdpTelemetrySender::new(target)?);
        }
        info!(
            mmf = config.fill_mmf,
            udp = config.send_udp,
            "telemetry pipeline started"
        );
        Ok(pipeline)
    }

    /// Drop the publish sinks and reset all derivation state. The next
    /// frame seeds from scratch.
    pub fn stop_sending(&mut self) {
        self.region = None;
        self.udp = None;
        self.raw = TelemetryRecord::zeroed();
        self.filtered = TelemetryRecord::zeroed();
        self.output = TelemetryRecord::zeroed();
        self.last_filtered = TelemetryRecord::zeroed();
        self.last_transform = Mat4::IDENTITY;
        self.last_position = Vec3::ZERO;
        self.last_velocity = Vec3::ZERO;
        self.last_world_velocity = Vec3::ZERO;
        self.last_raw_position = Vec3::ZERO;
        self.rot_inv = Mat4::IDENTITY;
        self.last_frame_valid = false;
        self.position_primed = false;
        self.dropped_samples = 0;
        self.outcome = FrameOutcome::Idle;
        self.bank.reset_all();
        self.pause = PauseGate::new();
        info!("telemetry pipeline stopped");
    }

    /// Handle for toggling the pause fade from another thread.
    pub fn pause_handle(&self) -> PauseHandle {
        self.pause_handle.clone()
    }

    /// The record as derived this frame, before filtering.
    pub fn raw(&self) -> &TelemetryRecord {
        &self.raw
    }

    /// The smoothed record for the current frame.
    pub fn filtered(&self) -> &TelemetryRecord {
        &self.filtered
    }

    /// The pause-gated record that `send_filtered_data` publishes.
    pub fn output(&self) -> &TelemetryRecord {
        &self.output
    }

    /// Consecutive non-derived frames; `u32::MAX` after a garbage frame.
    pub fn dropped_sample_count(&self) -> u32 {
        self.dropped_samples
    }

    /// What the most recent `process_transform` call did.
    pub fn last_outcome(&self) -> FrameOutcome {
        self.outcome
    }

    /// Run one frame through the derivation stages.
    ///
    /// Returns `true` when the frame was consumed (derived, stale, or the
    /// seeding frame) and `false` only when the rotation basis was
    /// degenerate. Callers publish via [`send_filtered_data`] after a
    /// consumed, non-stale frame.
    ///
    /// [`send_filtered_data`]: MotionPipeline::send_filtered_data
    pub fn process_transform(&mut self, transform: Mat4, dt: f32) -> bool {
        let rht = transform.x_axis.truncate();
        let up = transform.y_axis.truncate();
        let fwd = transform.z_axis.truncate();
        if rht.length() < MIN_AXIS_LENGTH
            || up.length() < MIN_AXIS_LENGTH
            || fwd.length() < MIN_AXIS_LENGTH
        {
            self.dropped_samples = u32::MAX;
            self.outcome = FrameOutcome::Garbage;
            return false;
        }

        if !self.last_frame_valid {
            let translation = transform.w_axis.truncate();
            self.last_position = translation;
            self.last_raw_position = translation;
            self.last_transform = transform;
            self.last_velocity = Vec3::ZERO;
            self.last_world_velocity = Vec3::ZERO;
            self.last_frame_valid = true;
            self.outcome = FrameOutcome::Seeded;
            return true;
        }

        let dt = if dt <= 0.0 { FALLBACK_DT } else { dt };

        if transform == self.last_transform {
            self.filtered = self.last_filtered;
            self.output = self.pause_gated(dt);
            self.dropped_samples = self.dropped_samples.saturating_add(1);
            self.outcome = FrameOutcome::Stale;
            return true;
        }
        self.dropped_samples = 0;

        let world_position = self.calc_position(&transform, dt);
        let filtered_velocity = self.calc_local_velocity(&transform, world_position, dt);
        self.calc_acceleration(filtered_velocity, dt);
        self.calc_orientation(&transform);
        self.calc_suspension(filtered_velocity, dt);
        self.calc_angular_velocity(dt);
        self.apply_engine_proxy(filtered_velocity);
        self.apply_driver_inputs();
        self.bank
            .filter(&self.raw, &mut self.filtered, self.residual_mask, false, dt);
        self.output = self.pause_gated(dt);

        self.last_transform = transform;
        self.outcome = FrameOutcome::Derived;
        true
    }

    /// Publish the gated output record and roll the frame history.
    ///
    /// Publish failures are absorbed: the stream is lossy by contract and
    /// the worker must never die mid-session.
    pub fn send_filtered_data(&mut self) {
        let mut packet = [0u8; RECORD_SIZE];
        PacketSchema::shared().encode(&self.output, &mut packet);
        if let Some(region) = &self.region {
            if let Err(e) = region.write_record(&packet) {
                warn!("shared-memory publish failed: {e}");
            }
        }
        if let Some(udp) = &self.udp {
            udp.send_record(&packet);
        }
        self.last_filtered = self.filtered;
    }

    /// Stage 4: raw position, position filtering, change bookkeeping.
    fn calc_position(&mut self, transform: &Mat4, dt: f32) -> Vec3 {
        let raw_position = transform.w_axis.truncate();
        self.raw.position_x = raw_position.x;
        self.raw.position_y = raw_position.y;
        self.raw.position_z = raw_position.z;

        let reset = !self.position_primed;
        self.position_primed = true;
        self.bank
            .filter(&self.raw, &mut self.filtered, self.position_mask, reset, dt);
        self.last_raw_position = raw_position;

        Vec3::new(
            self.filtered.position_x,
            self.filtered.position_y,
            self.filtered.position_z,
        )
    }

    /// Stages 5-6: world velocity into the local frame, then filtered.
    fn calc_local_velocity(&mut self, transform: &Mat4, world_position: Vec3, dt: f32) -> Vec3 {
        let world_velocity = (world_position - self.last_position) / dt;
        let rotation = rotation_only(transform);
        self.rot_inv = rotation.inverse();

        let mut local_velocity = self.rot_inv.transform_vector3(world_velocity);
        // The platform expects a left-handed lateral axis.
        local_velocity.x = -local_velocity.x;

        self.raw.local_velocity_x = finite_or_zero(local_velocity.x);
        self.raw.local_velocity_y = finite_or_zero(local_velocity.y);
        self.raw.local_velocity_z = finite_or_zero(local_velocity.z);

        self.last_position = world_position;
        self.last_world_velocity = world_velocity;

        self.bank
            .filter(&self.raw, &mut self.filtered, self.velocity_mask, false, dt);
        Vec3::new(
            self.filtered.local_velocity_x,
            self.filtered.local_velocity_y,
            self.filtered.local_velocity_z,
        )
    }

    /// Stage 7: finite-difference acceleration in g.
    fn calc_acceleration(&mut self, filtered_velocity: Vec3, dt: f32) {
        let accel = (filtered_velocity - self.last_velocity) / dt / G;
        self.raw.gforce_lateral = finite_or_zero(accel.x);
        self.raw.gforce_vertical = finite_or_zero(accel.y);
        self.raw.gforce_longitudinal = finite_or_zero(accel.z);
        self.last_velocity = filtered_velocity;
        self.bank
            .filter(&self.raw, &mut self.filtered, self.accel_mask, false, dt);
    }

    /// Stage 8: Euler angles from the rotation block.
    fn calc_orientation(&mut self, transform: &Mat4) {
        let quat = rotation_quat(&rotation_only(transform));
        let (yaw, pitch, rz) = quat.to_euler(glam::EulerRot::YXZ);
        self.raw.pitch = finite_or_zero(pitch);
        self.raw.yaw = finite_or_zero(yaw);
        self.raw.roll = loop_angle_rad(-rz, std::f32::consts::FRAC_PI_2);
    }

    /// Stage 9: suspension proxy from planar load transfer.
    ///
    /// The g-force vector points along the acceleration; the chassis load
    /// shifts the opposite way (braking plants the nose), so corner travel
    /// follows the negated planar acceleration.
    fn calc_suspension(&mut self, filtered_velocity: Vec3, dt: f32) {
        let planar = Vec2::new(
            self.filtered.gforce_lateral * G,
            self.filtered.gforce_longitudinal * G,
        );
        let magnitude = planar.length();
        let scaled_magnitude = magnitude.min(MAX_SUSPENSION_ACCEL) / MAX_SUSPENSION_ACCEL;
        let load_direction = if magnitude > f32::EPSILON {
            -planar / magnitude
        } else {
            Vec2::ZERO
        };

        for corner in &CORNERS {
            let dot = finite_or_zero(load_direction.dot(corner.direction.normalize()));
            let span = if dot > 0.0 {
                TRAVEL_MAX
            } else if dot < 0.0 {
                TRAVEL_MIN
            } else {
                0.0
            };
            let travel = TRAVEL_CENTER + span * dot.abs() * scaled_magnitude;
            self.raw.set(corner.position, travel);
            self.filtered.set(corner.position, travel);
        }

        for corner in &CORNERS {
            let position = self.filtered.get(corner.position);
            let previous = self.last_filtered.get(corner.position);
            self.raw
                .set(corner.velocity, finite_or_zero((position - previous) / dt));
        }
        self.bank.filter(
            &self.raw,
            &mut self.filtered,
            self.suspension_velocity_mask,
            false,
            dt,
        );

        for corner in &CORNERS {
            let velocity = self.filtered.get(corner.velocity);
            let previous = self.last_filtered.get(corner.velocity);
            self.raw.set(
                corner.acceleration,
                finite_or_zero((velocity - previous) / dt),
            );
            self.raw.set(corner.patch, filtered_velocity.z);
        }
    }

    /// Stage 10: angular velocity by projecting the previous orientation
    /// into the current local frame, then angular acceleration.
    fn calc_angular_velocity(&mut self, dt: f32) {
        let last_local = self.rot_inv * self.last_transform;
        let last_rht = last_local.x_axis.truncate();
        let last_up = last_local.y_axis.truncate();
        let last_fwd = last_local.z_axis.truncate();

        let fwd_proj_x = Vec3::new(0.0, last_fwd.y, last_fwd.z).normalize_or_zero();
        let fwd_proj_y = Vec3::new(last_fwd.x, 0.0, last_fwd.z).normalize_or_zero();
        let rht_proj_z = Vec3::new(last_rht.x, last_rht.y, 0.0).normalize_or_zero();

        let yaw_angle = -acos_clamped(fwd_proj_y.dot(Vec3::Z)) * sign(last_fwd.y);
        let pitch_angle = -acos_clamped(fwd_proj_x.dot(Vec3::Z)) * sign(last_up.z);
        let roll_angle = -acos_clamped(rht_proj_z.dot(Vec3::X)) * sign(last_up.x);

        self.raw.yaw_velocity = finite_or_zero(yaw_angle / dt);
        self.raw.pitch_velocity = finite_or_zero(pitch_angle / dt);
        self.raw.roll_velocity = finite_or_zero(roll_angle / dt);

        self.bank.filter(
            &self.raw,
            &mut self.filtered,
            self.angular_velocity_mask,
            false,
            dt,
        );

        self.raw.yaw_acceleration =
            finite_or_zero((self.filtered.yaw_velocity - self.last_filtered.yaw_velocity) / dt);
        self.raw.pitch_acceleration =
            finite_or_zero((self.filtered.pitch_velocity - self.last_filtered.pitch_velocity) / dt);
        self.raw.roll_acceleration =
            finite_or_zero((self.filtered.roll_velocity - self.last_filtered.roll_velocity) / dt);
    }

    /// Stage 11: hard-coded drivetrain proxies.
    fn apply_engine_proxy(&mut self, filtered_velocity: Vec3) {
        self.raw.max_rpm = PROXY_MAX_RPM;
        self.raw.idle_rpm = PROXY_IDLE_RPM;
        self.raw.gear = PROXY_GEAR;
        self.raw.max_gears = PROXY_MAX_GEARS;
        self.raw.speed = filtered_velocity.length();
    }

    /// Stage 12: controller snapshot into the input channels.
    fn apply_driver_inputs(&mut self) {
        let snapshot = self.controls.snapshot();
        self.raw.engine_rate =
            snapshot.right_trigger * PROXY_RPM_SPAN + PROXY_IDLE_RPM as f32;
        self.raw.steering_input = snapshot.left_thumb_x;
        self.raw.throttle_input = snapshot.right_trigger;
        self.raw.brake_input = snapshot.left_trigger;
    }

    /// Stage 14: sample the pause request and gate the output.
    fn pause_gated(&mut self, dt: f32) -> TelemetryRecord {
        let requested = self.pause_handle.is_paused();
        self.pause.request(requested);
        self.raw.paused = i32::from(self.pause.is_paused());
        self.filtered.paused = self.raw.paused;
        self.pause.apply(&self.filtered, &self.last_filtered, dt)
    }
}
