//! Wire codec for telemetry payloads.
//!
//! Two formats reach the ingestors:
//!
//! | Format | Example | Decoder |
//! |---|---|---|
//! | JSON object per topic message | `{"distance": 100, "angle": 30}` | [`decode_topic_payload`] |
//! | ASCII pair, newline terminated | `"0.42;-12.5\n"` | [`decode_pair`] |
//!
//! Every decoder is total: a malformed body yields [`RovError::Decode`] and
//! never panics.  Non-finite numbers are rejected on every channel so that a
//! single bad sample cannot poison the smoothers downstream.

use rovlink_types::{
    Channel, FollowSpeedPayload, OdometryPayload, PairLayout, Payload, PipePayload, RovError,
};
use serde::de::DeserializeOwned;

/// Decode a JSON topic body into the typed payload for `channel`.
///
/// # Errors
///
/// Returns [`RovError::Decode`] when the body is not valid JSON, lacks a
/// consumed field, or carries a non-finite value.  `Channel::DistanceAngle`
/// has no JSON form and is always rejected.
pub fn decode_topic_payload(channel: Channel, body: &str) -> Result<Payload, RovError> {
    let payload = match channel {
        Channel::Pipe => Payload::Pipe(parse_json::<PipePayload>(channel, body)?),
        Channel::Odometry => Payload::Odometry(parse_json::<OdometryPayload>(channel, body)?),
        Channel::FollowSpeed => {
            Payload::FollowSpeed(parse_json::<FollowSpeedPayload>(channel, body)?)
        }
        Channel::DistanceAngle => {
            return Err(RovError::decode(
                channel,
                "distance/angle pairs are only carried as ASCII frames",
            ));
        }
    };
    ensure_finite(&payload)?;
    Ok(payload)
}

/// Decode an already-parsed JSON value (e.g. the `msg` field of a rosbridge
/// frame) into the typed payload for `channel`.
///
/// # Errors
///
/// Same as [`decode_topic_payload`].
pub fn decode_topic_value(channel: Channel, value: serde_json::Value) -> Result<Payload, RovError> {
    let payload = match channel {
        Channel::Pipe => Payload::Pipe(from_value::<PipePayload>(channel, value)?),
        Channel::Odometry => Payload::Odometry(from_value::<OdometryPayload>(channel, value)?),
        Channel::FollowSpeed => {
            Payload::FollowSpeed(from_value::<FollowSpeedPayload>(channel, value)?)
        }
        Channel::DistanceAngle => {
            return Err(RovError::decode(
                channel,
                "distance/angle pairs are only carried as ASCII frames",
            ));
        }
    };
    ensure_finite(&payload)?;
    Ok(payload)
}

/// Decode an ASCII `"<float>;<float>"` frame.
///
/// Surrounding whitespace (including the trailing newline) is ignored, and
/// so are any fields after the second.
///
/// # Errors
///
/// Returns [`RovError::Decode`] on fewer than two fields, an unparsable
/// float, or a non-finite value.
pub fn decode_pair(layout: PairLayout, frame: &str) -> Result<Payload, RovError> {
    let trimmed = frame.trim();
    let mut parts = trimmed.split(';');
    let (Some(a), Some(b)) = (parts.next(), parts.next()) else {
        return Err(RovError::decode(
            Channel::DistanceAngle,
            format!("expected two ';'-separated fields, got {trimmed:?}"),
        ));
    };
    let first = parse_float(a)?;
    let second = parse_float(b)?;
    let payload = Payload::Pair {
        layout,
        first,
        second,
    };
    ensure_finite(&payload)?;
    Ok(payload)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_json<T: DeserializeOwned>(channel: Channel, body: &str) -> Result<T, RovError> {
    serde_json::from_str(body.trim()).map_err(|e| RovError::decode(channel, e.to_string()))
}

fn from_value<T: DeserializeOwned>(channel: Channel, value: serde_json::Value) -> Result<T, RovError> {
    serde_json::from_value(value).map_err(|e| RovError::decode(channel, e.to_string()))
}

fn parse_float(field: &str) -> Result<f32, RovError> {
    field.trim().parse::<f32>().map_err(|e| {
        RovError::decode(Channel::DistanceAngle, format!("invalid float {field:?}: {e}"))
    })
}

fn ensure_finite(payload: &Payload) -> Result<(), RovError> {
    let values: &[f32] = match payload {
        Payload::Pipe(p) => &[p.distance, p.angle],
        Payload::Odometry(o) => &[
            o.position.x,
            o.position.y,
            o.position.z,
            o.position.zu,
            o.velocity.x,
            o.velocity.y,
            o.velocity.z,
            o.velocity.speed,
            o.orientation.roll,
            o.orientation.pitch,
            o.orientation.yaw,
        ],
        Payload::FollowSpeed(s) => &[s.speed],
        Payload::Pair { first, second, .. } => &[*first, *second],
    };
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(RovError::decode(payload.channel(), "non-finite value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pipe_body() {
        let payload = decode_topic_payload(Channel::Pipe, r#"{"distance": 100, "angle": 30}"#)
            .expect("valid pipe body");
        assert_eq!(
            payload,
            Payload::Pipe(PipePayload {
                distance: 100.0,
                angle: 30.0
            })
        );
    }

    #[test]
    fn decodes_full_odometry_body() {
        let body = r#"{
            "position": {"x": 1.0, "y": 2.0, "z": 12.0, "zu": 0.3},
            "velocity": {"x": 0.1, "y": 0.0, "z": 0.0, "speed": 0.1},
            "orientation": {"roll": 0.96, "pitch": 0.38, "yaw": 1.57}
        }"#;
        let Payload::Odometry(odom) = decode_topic_payload(Channel::Odometry, body).unwrap() else {
            panic!("expected odometry payload");
        };
        assert!((odom.position.z - 12.0).abs() < f32::EPSILON);
        assert!((odom.orientation.roll - 0.96).abs() < f32::EPSILON);
        assert!((odom.velocity.speed - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn decodes_follow_speed_body() {
        let payload = decode_topic_payload(Channel::FollowSpeed, " {\"speed\": -4.5}\n").unwrap();
        assert_eq!(payload, Payload::FollowSpeed(FollowSpeedPayload { speed: -4.5 }));
    }

    #[test]
    fn rejects_malformed_json_on_every_topic_channel() {
        for channel in [Channel::Pipe, Channel::Odometry, Channel::FollowSpeed] {
            for body in ["", "not json", "{", "[]", r#"{"unrelated": 1}"#, r#"{"speed": "fast"}"#] {
                let err = decode_topic_payload(channel, body)
                    .expect_err("malformed body must not decode");
                assert!(matches!(err, RovError::Decode { channel: c, .. } if c == channel));
            }
        }
    }

    #[test]
    fn rejects_values_that_overflow_to_infinity() {
        let err = decode_topic_payload(Channel::FollowSpeed, r#"{"speed": 1e300}"#);
        assert!(err.is_err());
    }

    #[test]
    fn distance_angle_has_no_json_form() {
        assert!(decode_topic_payload(Channel::DistanceAngle, r#"{"distance":1,"angle":2}"#).is_err());
    }

    #[test]
    fn decodes_topic_value() {
        let value = serde_json::json!({"distance": 4.0, "angle": -2.0});
        let payload = decode_topic_value(Channel::Pipe, value).unwrap();
        assert_eq!(payload.channel(), Channel::Pipe);
    }

    #[test]
    fn decodes_ascii_pair() {
        let payload = decode_pair(PairLayout::DistanceAngle, "100;30\n").unwrap();
        assert_eq!(
            payload,
            Payload::Pair {
                layout: PairLayout::DistanceAngle,
                first: 100.0,
                second: 30.0
            }
        );
    }

    #[test]
    fn ascii_pair_ignores_extra_fields_and_whitespace() {
        let payload = decode_pair(PairLayout::OffsetHeading, "  -0.25 ; 12.5 ;extra\r\n").unwrap();
        assert_eq!(
            payload,
            Payload::Pair {
                layout: PairLayout::OffsetHeading,
                first: -0.25,
                second: 12.5
            }
        );
    }

    #[test]
    fn rejects_malformed_ascii_pairs() {
        for frame in ["", "\n", "42", "a;b", "1;", ";2", "1,2", "NaN;1", "1;inf"] {
            assert!(
                decode_pair(PairLayout::DistanceAngle, frame).is_err(),
                "frame {frame:?} must be rejected"
            );
        }
    }
}
