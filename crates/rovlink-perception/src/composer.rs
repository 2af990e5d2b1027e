//! Pose composition.
//!
//! Two stages, kept separate:
//!
//! 1. [`compose_target`] maps smoothed channel values onto a target pose.
//!    Forward motion is open-loop: the follow speed is integrated into
//!    `target.x` every tick.  Depth and heading come straight from the
//!    smoothed pipe channel; altitude from odometry.
//! 2. [`approach_output`] moves the previous output pose toward that target
//!    at `k_smooth · dt`.
//!
//! | Axis        | Source                                   |
//! |-------------|------------------------------------------|
//! | `x`         | `previous.x + follow_speed · k_speed · dt` |
//! | `y`         | `altitude + y_offset`                    |
//! | `z`         | `smoothed_distance · k_dist_scale`       |
//! | roll (X°)   | `(deg(roll) − roll_bias) · roll_scale`   |
//! | yaw (Y°)    | `smoothed_angle · k_angle_scale`         |
//! | pitch (Z°)  | `(deg(pitch) − pitch_bias) · pitch_scale` |

use serde::{Deserialize, Serialize};

use crate::math::{Pose, Quaternion, Vec3, clamp01};

/// Fixed scale and offset constants of the composer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseConstants {
    pub k_speed: f32,
    pub k_dist_scale: f32,
    pub y_offset: f32,
    pub k_angle_scale: f32,
    pub k_smooth: f32,
    pub roll_bias_deg: f32,
    pub roll_scale: f32,
    pub pitch_bias_deg: f32,
    pub pitch_scale: f32,
}

impl Default for PoseConstants {
    fn default() -> Self {
        Self {
            k_speed: 0.00035,
            k_dist_scale: 0.0025,
            y_offset: 5.77,
            k_angle_scale: -0.15,
            k_smooth: 2.0,
            roll_bias_deg: 55.0,
            roll_scale: -0.025,
            pitch_bias_deg: 22.0,
            pitch_scale: 0.025,
        }
    }
}

impl PoseConstants {
    /// Roll remap: raw radians to the X Euler angle in degrees.
    pub fn remap_roll(&self, roll_rad: f32) -> f32 {
        (roll_rad.to_degrees() - self.roll_bias_deg) * self.roll_scale
    }

    /// Pitch remap: raw radians to the Z Euler angle in degrees.
    pub fn remap_pitch(&self, pitch_rad: f32) -> f32 {
        (pitch_rad.to_degrees() - self.pitch_bias_deg) * self.pitch_scale
    }
}

/// Everything [`compose_target`] reads for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComposerInput {
    pub smoothed_distance: f32,
    pub smoothed_angle: f32,
    pub altitude: f32,
    /// Radians.
    pub roll: f32,
    /// Radians.
    pub pitch: f32,
    /// Already gated by the dead-man's switch.
    pub follow_speed: f32,
    /// Seconds.
    pub dt: f32,
}

/// Compute the new target pose.  Pure.
pub fn compose_target(input: &ComposerInput, previous_target: &Pose, k: &PoseConstants) -> Pose {
    let position = Vec3::new(
        previous_target.position.x + input.follow_speed * k.k_speed * input.dt,
        input.altitude + k.y_offset,
        input.smoothed_distance * k.k_dist_scale,
    );
    let rotation = Quaternion::from_euler_deg(
        k.remap_roll(input.roll),
        input.smoothed_angle * k.k_angle_scale,
        k.remap_pitch(input.pitch),
    );
    Pose::new(position, rotation)
}

/// Second-stage approach of the output pose toward `target`.
pub fn approach_output(current: &Pose, target: &Pose, dt: f32, k_smooth: f32) -> Pose {
    current.approach(target, clamp01(dt * k_smooth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ComposerInput {
        ComposerInput {
            dt: 1.0 / 60.0,
            ..Default::default()
        }
    }

    #[test]
    fn altitude_plus_offset_regardless_of_other_channels() {
        let k = PoseConstants::default();
        let mut prev = Pose::identity();
        for (d, a, s) in [(0.0, 0.0, 0.0), (100.0, 30.0, 2.0), (-7.0, 180.0, 5000.0)] {
            let inp = ComposerInput {
                smoothed_distance: d,
                smoothed_angle: a,
                altitude: 12.0,
                follow_speed: s,
                ..input()
            };
            prev = compose_target(&inp, &prev, &k);
            assert!((prev.position.y - 17.77).abs() < 1e-5);
        }
    }

    #[test]
    fn follow_speed_integrates_into_x() {
        let k = PoseConstants::default();
        let inp = ComposerInput {
            follow_speed: 1000.0,
            dt: 0.5,
            ..input()
        };
        let first = compose_target(&inp, &Pose::identity(), &k);
        assert!((first.position.x - 0.175).abs() < 1e-6);
        let second = compose_target(&inp, &first, &k);
        assert!((second.position.x - 0.35).abs() < 1e-6);
    }

    #[test]
    fn distance_scales_into_z() {
        let k = PoseConstants::default();
        let inp = ComposerInput {
            smoothed_distance: 400.0,
            ..input()
        };
        let t = compose_target(&inp, &Pose::identity(), &k);
        assert!((t.position.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_uses_remapped_angles() {
        let k = PoseConstants::default();
        let inp = ComposerInput {
            smoothed_angle: 20.0,
            roll: 55.0_f32.to_radians(),
            pitch: 22.0_f32.to_radians(),
            ..input()
        };
        let t = compose_target(&inp, &Pose::identity(), &k);
        // Biases cancel; only yaw = 20 · -0.15 = -3 degrees remains.
        let expected = Quaternion::from_euler_deg(0.0, -3.0, 0.0);
        assert!(t.rotation.angle_to_deg(expected) < 1e-2);
    }

    #[test]
    fn roll_and_pitch_remaps() {
        let k = PoseConstants::default();
        assert!((k.remap_roll(0.0) - 1.375).abs() < 1e-5);
        assert!((k.remap_pitch(0.0) + 0.55).abs() < 1e-5);
    }

    #[test]
    fn output_approaches_target_in_second_stage() {
        let target = Pose::new(Vec3::new(0.0, 10.0, 0.0), Quaternion::identity());
        let out = approach_output(&Pose::identity(), &target, 0.1, 2.0);
        assert!((out.position.y - 2.0).abs() < 1e-5);
        let out = approach_output(&out, &target, 0.1, 2.0);
        assert!((out.position.y - 3.6).abs() < 1e-5);
    }
}
