//! Vector, rotation and pose primitives.
//!
//! Conventions follow the host engine the pose is applied to: Y is up, Z is
//! forward, and Euler angles are applied Z first, then X, then Y.
//!
//! # Example
//!
//! ```rust
//! use rovlink_perception::math::{Pose, Quaternion, Vec3};
//!
//! let current = Pose::identity();
//! let target = Pose::new(Vec3::new(0.0, 10.0, 0.0), Quaternion::from_euler_deg(0.0, 90.0, 0.0));
//!
//! // Halfway in one step.
//! let next = current.approach(&target, 0.5);
//! assert!((next.position.y - 5.0).abs() < 1e-5);
//! ```

use serde::{Deserialize, Serialize};

/// Clamp `t` to `[0, 1]`.  NaN maps to 0.
pub fn clamp01(t: f32) -> f32 {
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

/// Linear interpolation with `t` clamped to `[0, 1]`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * clamp01(t)
}

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Component-wise [`lerp`] with clamped `t`.
    pub fn lerp(self, to: Self, t: f32) -> Self {
        Self::new(lerp(self.x, to.x, t), lerp(self.y, to.y, t), lerp(self.z, to.z, t))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `deg` degrees about a principal axis.
    fn axis_deg(axis: Vec3, deg: f32) -> Self {
        let half = deg.to_radians() * 0.5;
        let (s, c) = half.sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Build a rotation from Euler angles in degrees, applied Z, then X,
    /// then Y.
    pub fn from_euler_deg(x: f32, y: f32, z: f32) -> Self {
        let qx = Self::axis_deg(Vec3::new(1.0, 0.0, 0.0), x);
        let qy = Self::axis_deg(Vec3::new(0.0, 1.0, 0.0), y);
        let qz = Self::axis_deg(Vec3::new(0.0, 0.0, 1.0), z);
        qy.mul(qx).mul(qz)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.w * rhs.w + self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Scale to unit length.  A degenerate quaternion becomes the identity.
    pub fn normalize(self) -> Self {
        let n = self.dot(self).sqrt();
        if n <= f32::EPSILON || !n.is_finite() {
            return Self::identity();
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    /// Normalised linear interpolation along the shortest arc, `t` clamped.
    pub fn nlerp(self, to: Self, t: f32) -> Self {
        let t = clamp01(t);
        let to = if self.dot(to) < 0.0 {
            Self::new(-to.w, -to.x, -to.y, -to.z)
        } else {
            to
        };
        Self::new(
            self.w + (to.w - self.w) * t,
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.z + (to.z - self.z) * t,
        )
        .normalize()
    }

    /// Angle between two rotations in degrees.
    pub fn angle_to_deg(self, other: Self) -> f32 {
        let d = self.dot(other).abs().min(1.0);
        (2.0 * d.acos()).to_degrees()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body pose: world position plus rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }

    /// Origin, no rotation.
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Move a fraction `t` of the way toward `target` (position lerp,
    /// rotation nlerp).
    pub fn approach(&self, target: &Pose, t: f32) -> Pose {
        Pose::new(
            self.position.lerp(target.position, t),
            self.rotation.nlerp(target.rotation, t),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.sub(b).length() < 1e-5
    }

    #[test]
    fn clamp01_handles_out_of_range_and_nan() {
        assert_eq!(clamp01(-1.0), 0.0);
        assert_eq!(clamp01(0.25), 0.25);
        assert_eq!(clamp01(7.0), 1.0);
        assert_eq!(clamp01(f32::NAN), 0.0);
    }

    #[test]
    fn lerp_clamps_t() {
        assert!((lerp(0.0, 10.0, 0.5) - 5.0).abs() < 1e-6);
        assert!((lerp(0.0, 10.0, 3.0) - 10.0).abs() < 1e-6);
        assert!((lerp(0.0, 10.0, -3.0)).abs() < 1e-6);
    }

    #[test]
    fn identity_rotation_leaves_vector_unchanged() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!(approx(Quaternion::identity().rotate(v), v));
    }

    #[test]
    fn yaw_ninety_turns_forward_into_right() {
        let q = Quaternion::from_euler_deg(0.0, 90.0, 0.0);
        let r = q.rotate(Vec3::new(0.0, 0.0, 1.0));
        assert!(approx(r, Vec3::new(1.0, 0.0, 0.0)), "got {r:?}");
    }

    #[test]
    fn pitch_ninety_turns_forward_into_down() {
        let q = Quaternion::from_euler_deg(90.0, 0.0, 0.0);
        let r = q.rotate(Vec3::new(0.0, 0.0, 1.0));
        assert!(approx(r, Vec3::new(0.0, -1.0, 0.0)), "got {r:?}");
    }

    #[test]
    fn euler_applies_z_before_x_before_y() {
        let composed = Quaternion::from_euler_deg(30.0, 45.0, 60.0);
        let manual = Quaternion::from_euler_deg(0.0, 45.0, 0.0)
            .mul(Quaternion::from_euler_deg(30.0, 0.0, 0.0))
            .mul(Quaternion::from_euler_deg(0.0, 0.0, 60.0));
        assert!(composed.angle_to_deg(manual) < 1e-3);
    }

    #[test]
    fn nlerp_endpoints_and_midpoint() {
        let a = Quaternion::identity();
        let b = Quaternion::from_euler_deg(0.0, 90.0, 0.0);
        assert!(a.nlerp(b, 0.0).angle_to_deg(a) < 1e-3);
        assert!(a.nlerp(b, 1.0).angle_to_deg(b) < 1e-3);
        let mid = a.nlerp(b, 0.5);
        assert!((mid.angle_to_deg(a) - 45.0).abs() < 1e-2);
    }

    #[test]
    fn nlerp_takes_shortest_arc() {
        let a = Quaternion::identity();
        let b = Quaternion::from_euler_deg(0.0, 10.0, 0.0);
        let flipped = Quaternion::new(-b.w, -b.x, -b.y, -b.z);
        let via_flip = a.nlerp(flipped, 0.5);
        assert!((via_flip.angle_to_deg(a) - 5.0).abs() < 1e-2);
    }

    #[test]
    fn normalize_degenerate_is_identity() {
        assert_eq!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalize(), Quaternion::identity());
    }

    #[test]
    fn pose_approach_moves_fraction_of_the_way() {
        let current = Pose::identity();
        let target = Pose::new(Vec3::new(2.0, 4.0, -8.0), Quaternion::identity());
        let next = current.approach(&target, 0.25);
        assert!(approx(next.position, Vec3::new(0.5, 1.0, -2.0)));
    }
}
