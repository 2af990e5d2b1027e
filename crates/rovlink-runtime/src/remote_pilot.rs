//! [`RemotePilot`] – pose producer driven by received telemetry.
//!
//! Per tick: smooth distance and angle, compose the target pose, then move
//! the output a `k_smooth · dt` fraction toward it.

use rovlink_perception::{
    ChannelSmoother, ComposerInput, Pose, PoseConstants, approach_output, compose_target,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::producer::{PoseProducer, TickFrame};

/// Per-channel lerp rate of the distance smoother.
pub const DISTANCE_LERP_RATE: f32 = 5.0;
/// Per-channel lerp rate of the angle smoother.
pub const ANGLE_LERP_RATE: f32 = 5.0;

/// Filtered channel values and the target they produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothedPose {
    pub smoothed_distance: f32,
    pub smoothed_angle: f32,
    pub target: Pose,
}

#[derive(Debug, Clone)]
pub struct RemotePilot {
    constants: PoseConstants,
    distance: ChannelSmoother,
    angle: ChannelSmoother,
    target: Pose,
    paused: bool,
}

impl Default for RemotePilot {
    fn default() -> Self {
        Self::new(PoseConstants::default(), Pose::identity())
    }
}

impl RemotePilot {
    /// A pilot whose target starts at `initial` (usually the vehicle's pose
    /// at session start).
    pub fn new(constants: PoseConstants, initial: Pose) -> Self {
        Self {
            constants,
            distance: ChannelSmoother::new(DISTANCE_LERP_RATE),
            angle: ChannelSmoother::new(ANGLE_LERP_RATE),
            target: initial,
            paused: false,
        }
    }

    pub fn constants(&self) -> &PoseConstants {
        &self.constants
    }

    pub fn smoothed(&self) -> SmoothedPose {
        SmoothedPose {
            smoothed_distance: self.distance.value(),
            smoothed_angle: self.angle.value(),
            target: self.target,
        }
    }

    /// Re-seed the target from a host pose.
    pub fn sync_target(&mut self, pose: Pose) {
        self.target = pose;
    }

    /// Zero both smoothers and re-seed the target.
    pub fn reset(&mut self, pose: Pose) {
        self.distance.reset(0.0);
        self.angle.reset(0.0);
        self.target = pose;
    }
}

impl PoseProducer for RemotePilot {
    fn name(&self) -> &str {
        "remote"
    }

    fn produce(&mut self, frame: &TickFrame<'_>) -> Pose {
        if self.paused {
            return frame.current;
        }
        let t = frame.telemetry;
        let input = ComposerInput {
            smoothed_distance: self.distance.step(t.distance, frame.dt),
            smoothed_angle: self.angle.step(t.angle, frame.dt),
            altitude: t.altitude,
            roll: t.roll,
            pitch: t.pitch,
            follow_speed: frame.follow_speed,
            dt: frame.dt,
        };
        self.target = compose_target(&input, &self.target, &self.constants);
        debug!(
            smoothed_distance = input.smoothed_distance,
            smoothed_angle = input.smoothed_angle,
            follow_speed = input.follow_speed,
            "remote target composed"
        );
        approach_output(&frame.current, &self.target, frame.dt, self.constants.k_smooth)
    }

    fn pause(&mut self) {
        self.paused = true;
        info!(producer = "remote", "producer paused");
    }

    fn resume(&mut self, _current: &Pose) {
        self.paused = false;
        info!(producer = "remote", "producer resumed");
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}
