//! [`LocalPilot`] – operator-driven pose producer.
//!
//! Stick-style input accelerates a persistent velocity in the vehicle frame;
//! linear and angular drag bleed it off when the input is released, so the
//! vehicle drifts to a stop.  The planar stick is rotated 90° clockwise
//! before use: `(x, y) → (y, −x)`.
//!
//! Velocity is kept across pause/resume.

use rovlink_perception::{Pose, Quaternion, Vec3, lerp};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::producer::{PoseProducer, TickFrame};

/// Raw operator input, each axis in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocalInput {
    pub move_x: f32,
    pub move_y: f32,
    pub vertical: f32,
    pub rotation: f32,
}

impl LocalInput {
    /// Direction in the vehicle frame after the stick remap.
    fn local_direction(&self) -> Vec3 {
        let (right, forward) = (self.move_y, -self.move_x);
        Vec3::new(right, self.vertical, forward)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPilotConfig {
    /// Acceleration per unit of input.
    pub move_speed: f32,
    /// Degrees per second squared per unit of input.
    pub rotation_speed: f32,
    pub drag: f32,
    pub angular_drag: f32,
}

impl Default for LocalPilotConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            rotation_speed: 90.0,
            drag: 2.0,
            angular_drag: 2.0,
        }
    }
}

/// Yaw is only applied above this angular speed (degrees per second).
const MIN_ANGULAR_VELOCITY: f32 = 0.01;

#[derive(Debug, Clone, Default)]
pub struct LocalPilot {
    config: LocalPilotConfig,
    input: LocalInput,
    velocity: Vec3,
    /// Degrees per second about the vertical axis.
    angular_velocity: f32,
    paused: bool,
}

impl LocalPilot {
    pub fn new(config: LocalPilotConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn set_input(&mut self, input: LocalInput) {
        self.input = input;
    }

    pub fn input(&self) -> LocalInput {
        self.input
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Stop all motion and clear input.
    pub fn reset(&mut self) {
        self.input = LocalInput::default();
        self.velocity = Vec3::zero();
        self.angular_velocity = 0.0;
    }
}

impl PoseProducer for LocalPilot {
    fn name(&self) -> &str {
        "local"
    }

    fn produce(&mut self, frame: &TickFrame<'_>) -> Pose {
        if self.paused {
            return frame.current;
        }
        let dt = frame.dt;
        let cfg = &self.config;

        let accel = frame
            .current
            .rotation
            .rotate(self.input.local_direction())
            .scale(cfg.move_speed);
        self.velocity = self
            .velocity
            .add(accel.scale(dt))
            .lerp(Vec3::zero(), cfg.drag * dt);
        let position = frame.current.position.add(self.velocity.scale(dt));

        self.angular_velocity += self.input.rotation * cfg.rotation_speed * dt;
        self.angular_velocity = lerp(self.angular_velocity, 0.0, cfg.angular_drag * dt);
        let mut rotation = frame.current.rotation;
        if self.angular_velocity.abs() > MIN_ANGULAR_VELOCITY {
            let delta = Quaternion::from_euler_deg(0.0, self.angular_velocity * dt, 0.0);
            rotation = rotation.mul(delta).normalize();
        }

        Pose::new(position, rotation)
    }

    fn pause(&mut self) {
        self.paused = true;
        info!(producer = "local", "producer paused");
    }

    fn resume(&mut self, _current: &Pose) {
        self.paused = false;
        info!(producer = "local", "producer resumed");
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
