//! `rovlink-perception` – Smoothing and pose composition.
//!
//! Turns noisy per-channel telemetry into a stable target pose.  Everything
//! here is pure: no I/O, no clocks, no shared state.
//!
//! # Modules
//!
//! - [`math`] – [`Vec3`][math::Vec3], [`Quaternion`][math::Quaternion] and
//!   [`Pose`][math::Pose] with the interpolation helpers the smoothers need.
//! - [`smoother`] – [`ChannelSmoother`][smoother::ChannelSmoother]: per-channel
//!   exponential interpolation toward the latest raw value.
//! - [`composer`] – [`compose_target`][composer::compose_target] and
//!   [`approach_output`][composer::approach_output]: the two pose-level
//!   stages that map smoothed channel values onto a vehicle pose.

pub mod composer;
pub mod math;
pub mod smoother;

pub use composer::{ComposerInput, PoseConstants, approach_output, compose_target};
pub use math::{Pose, Quaternion, Vec3, clamp01, lerp};
pub use smoother::ChannelSmoother;
