//! The [`PoseProducer`] seam.
//!
//! Exactly one producer is active per tick; the [`ControlLoop`] pauses the
//! other.  Pausing freezes a producer's internal state without resetting it,
//! so reactivation continues where it left off.
//!
//! [`ControlLoop`]: crate::control_loop::ControlLoop

use rovlink_perception::Pose;

use crate::telemetry_state::TelemetryState;

/// Inputs shared by every producer for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickFrame<'a> {
    pub telemetry: &'a TelemetryState,
    /// Follow speed after the dead-man's switch.
    pub follow_speed: f32,
    /// Seconds since the previous tick.
    pub dt: f32,
    /// Output pose of the previous tick.
    pub current: Pose,
}

pub trait PoseProducer: Send {
    fn name(&self) -> &str;

    /// Compute this tick's output pose.  A paused producer returns
    /// `frame.current` and leaves its state untouched.
    fn produce(&mut self, frame: &TickFrame<'_>) -> Pose;

    fn pause(&mut self);

    /// Reactivate, with `current` the output pose at the switch.
    fn resume(&mut self, current: &Pose);

    fn is_paused(&self) -> bool;
}
