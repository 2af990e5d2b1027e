//! [`TelemetryState`] – last-known value per telemetry channel.
//!
//! Owned and mutated by the tick consumer only.  Every dequeued
//! [`RawMessage`] overwrites the fields of its channel (last write wins);
//! fields of other channels keep whatever value they had, so the composed
//! pose may mix samples taken at different instants.
//!
//! | Payload                    | Fields written                        |
//! |----------------------------|---------------------------------------|
//! | `Pipe`                     | `distance`, `angle`                   |
//! | `Odometry`                 | `altitude` (position.z), `roll`, `pitch` |
//! | `FollowSpeed`              | `follow_speed` + dead-man feed        |
//! | `Pair` / `DistanceAngle`   | `distance`, `angle`                   |
//! | `Pair` / `OffsetHeading`   | `offset_heading`                      |

use std::time::Duration;

use rovlink_kernel::DeadMansSwitch;
use rovlink_types::{Channel, PairLayout, Payload, RawMessage};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryState {
    pub distance: f32,
    pub angle: f32,
    pub altitude: f32,
    /// Radians.
    pub roll: f32,
    /// Radians.
    pub pitch: f32,
    /// Raw value; read it through [`gated_follow_speed`][Self::gated_follow_speed].
    pub follow_speed: f32,
    /// Lateral offset and heading (degrees) from a client-mode socket.
    pub offset_heading: Option<(f32, f32)>,
    follow_speed_switch: DeadMansSwitch,
}

impl TelemetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose follow-speed channel goes stale after `timeout`.
    pub fn with_staleness_timeout(timeout: Duration) -> Self {
        Self {
            follow_speed_switch: DeadMansSwitch::new(timeout),
            ..Self::default()
        }
    }

    /// Merge one message.  `now` is the session clock of the current tick.
    pub fn apply(&mut self, message: &RawMessage, now: Duration) -> Channel {
        match *message.payload() {
            Payload::Pipe(p) => {
                self.distance = p.distance;
                self.angle = p.angle;
            }
            Payload::Odometry(o) => {
                self.altitude = o.position.z;
                self.roll = o.orientation.roll;
                self.pitch = o.orientation.pitch;
            }
            Payload::FollowSpeed(s) => {
                self.follow_speed = s.speed;
                self.follow_speed_switch.feed(now);
            }
            Payload::Pair {
                layout: PairLayout::DistanceAngle,
                first,
                second,
            } => {
                self.distance = first;
                self.angle = second;
            }
            Payload::Pair {
                layout: PairLayout::OffsetHeading,
                first,
                second,
            } => {
                self.offset_heading = Some((first, second));
            }
        }
        debug!(
            channel = %message.channel(),
            source = message.source(),
            "telemetry updated"
        );
        message.channel()
    }

    /// Session time of the last follow-speed message.
    pub fn last_follow_speed_update(&self) -> Option<Duration> {
        self.follow_speed_switch.last_fed()
    }

    /// `follow_speed`, or `0.0` when no follow-speed message arrived within
    /// the staleness window.
    pub fn gated_follow_speed(&self, now: Duration) -> f32 {
        self.follow_speed_switch.gate(self.follow_speed, now)
    }

    pub fn follow_speed_is_stale(&self, now: Duration) -> bool {
        self.follow_speed_switch.is_stale(now)
    }

    /// Forget every channel, keeping the staleness timeout.
    pub fn reset(&mut self) {
        let timeout = self.follow_speed_switch.timeout();
        *self = Self::with_staleness_timeout(timeout);
    }
}
