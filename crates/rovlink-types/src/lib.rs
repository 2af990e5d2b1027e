use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logical telemetry channel a message was received on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Pipe tracker output: distance to the pipe and relative angle.
    Pipe,
    /// Vehicle odometry: position, velocity, orientation.
    Odometry,
    /// Forward speed command from the pipe-following controller.
    FollowSpeed,
    /// Two-float ASCII pair from a raw socket link.
    DistanceAngle,
}

impl Channel {
    /// Stable lowercase label used in log fields.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Pipe => "pipe",
            Channel::Odometry => "odometry",
            Channel::FollowSpeed => "follow_speed",
            Channel::DistanceAngle => "distance_angle",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire payloads
// ────────────────────────────────────────────────────────────────────────────

/// `/pipe` topic body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipePayload {
    pub distance: f32,
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OdometryPosition {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub zu: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OdometryVelocity {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub speed: f32,
}

/// Orientation in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OdometryOrientation {
    pub roll: f32,
    pub pitch: f32,
    #[serde(default)]
    pub yaw: f32,
}

/// `/odom` topic body. Only `position.z`, `orientation.roll` and
/// `orientation.pitch` drive the pose; the rest is carried for logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OdometryPayload {
    pub position: OdometryPosition,
    #[serde(default)]
    pub velocity: OdometryVelocity,
    pub orientation: OdometryOrientation,
}

/// `/pipefollowspeed` topic body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FollowSpeedPayload {
    pub speed: f32,
}

/// How the two floats of an ASCII `"a;b"` frame are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairLayout {
    /// `distance;angle` – same meaning as the pipe topic.
    #[default]
    DistanceAngle,
    /// `y_offset;phi_deg` – lateral offset and heading in degrees.
    OffsetHeading,
}

/// A decoded, typed message body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Pipe(PipePayload),
    Odometry(OdometryPayload),
    FollowSpeed(FollowSpeedPayload),
    Pair {
        layout: PairLayout,
        first: f32,
        second: f32,
    },
}

impl Payload {
    /// The channel this payload belongs to.
    pub fn channel(&self) -> Channel {
        match self {
            Payload::Pipe(_) => Channel::Pipe,
            Payload::Odometry(_) => Channel::Odometry,
            Payload::FollowSpeed(_) => Channel::FollowSpeed,
            Payload::Pair { .. } => Channel::DistanceAngle,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RawMessage
// ────────────────────────────────────────────────────────────────────────────

/// One decoded network message on its way from an ingestor to the tick
/// consumer. Produced once, queued once, consumed once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    channel: Channel,
    payload: Payload,
    /// e.g. `"rovlink-middleware::topic/pipe"`
    source: String,
    received_at: DateTime<Utc>,
}

impl RawMessage {
    /// Wrap `payload`, stamping it with the current wall-clock time.
    pub fn new(payload: Payload, source: impl Into<String>) -> Self {
        Self {
            channel: payload.channel(),
            payload,
            source: source.into(),
            received_at: Utc::now(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Control mode
// ────────────────────────────────────────────────────────────────────────────

/// Which producer drives the output pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Locally generated operator input.
    #[default]
    Local,
    /// Remotely received telemetry.
    Remote,
}

impl ControlMode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            ControlMode::Local => ControlMode::Remote,
            ControlMode::Remote => ControlMode::Local,
        }
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlMode::Local => f.write_str("local"),
            ControlMode::Remote => f.write_str("remote"),
        }
    }
}

/// Global error type spanning payload decoding, transport failures and
/// teardown problems.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RovError {
    #[error("Decode Error on {channel}: {reason}")]
    Decode { channel: Channel, reason: String },

    #[error("Connection Error for {endpoint}: {details}")]
    Connection { endpoint: String, details: String },

    #[error("Shutdown Error in {component}: {details}")]
    Shutdown { component: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl RovError {
    /// Shorthand for a [`RovError::Decode`].
    pub fn decode(channel: Channel, reason: impl Into<String>) -> Self {
        RovError::Decode {
            channel,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`RovError::Connection`].
    pub fn connection(endpoint: impl Into<String>, details: impl std::fmt::Display) -> Self {
        RovError::Connection {
            endpoint: endpoint.into(),
            details: details.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_reports_its_channel() {
        let pipe = Payload::Pipe(PipePayload {
            distance: 1.0,
            angle: 2.0,
        });
        assert_eq!(pipe.channel(), Channel::Pipe);

        let pair = Payload::Pair {
            layout: PairLayout::OffsetHeading,
            first: 0.1,
            second: 12.0,
        };
        assert_eq!(pair.channel(), Channel::DistanceAngle);
    }

    #[test]
    fn raw_message_channel_follows_payload() {
        let msg = RawMessage::new(
            Payload::FollowSpeed(FollowSpeedPayload { speed: 3.0 }),
            "rovlink-middleware::test",
        );
        assert_eq!(msg.channel(), Channel::FollowSpeed);
        assert_eq!(msg.source(), "rovlink-middleware::test");
        assert!(msg.received_at() <= Utc::now());
    }

    #[test]
    fn odometry_defaults_unconsumed_fields() {
        let json = r#"{"position":{"x":1,"y":2,"z":12.0},"orientation":{"roll":0.5,"pitch":0.25}}"#;
        let odom: OdometryPayload = serde_json::from_str(json).unwrap();
        assert!((odom.position.z - 12.0).abs() < f32::EPSILON);
        assert_eq!(odom.position.zu, 0.0);
        assert_eq!(odom.velocity, OdometryVelocity::default());
        assert_eq!(odom.orientation.yaw, 0.0);
    }

    #[test]
    fn odometry_position_needs_only_depth() {
        let json = r#"{"position":{"z":7.5},"orientation":{"roll":0.0,"pitch":0.0}}"#;
        let odom: OdometryPayload = serde_json::from_str(json).unwrap();
        assert_eq!((odom.position.x, odom.position.y), (0.0, 0.0));
        assert!((odom.position.z - 7.5).abs() < f32::EPSILON);
    }

    #[test]
    fn odometry_requires_consumed_fields() {
        let json = r#"{"position":{"x":1,"y":2,"z":3}}"#;
        assert!(serde_json::from_str::<OdometryPayload>(json).is_err());
    }

    #[test]
    fn control_mode_toggles_between_both_states() {
        assert_eq!(ControlMode::Local.toggled(), ControlMode::Remote);
        assert_eq!(ControlMode::Remote.toggled(), ControlMode::Local);
        assert_eq!(ControlMode::default(), ControlMode::Local);
    }

    #[test]
    fn pair_layout_serializes_snake_case() {
        let json = serde_json::to_string(&PairLayout::OffsetHeading).unwrap();
        assert_eq!(json, "\"offset_heading\"");
    }

    #[test]
    fn rov_error_display() {
        let err = RovError::decode(Channel::Pipe, "missing field `angle`");
        assert!(err.to_string().contains("Decode Error on pipe"));

        let err2 = RovError::connection("ws://localhost:9090", "refused");
        assert!(err2.to_string().contains("ws://localhost:9090"));
    }
}
