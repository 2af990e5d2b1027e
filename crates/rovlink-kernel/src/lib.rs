//! `rovlink-kernel` – Safety and arbitration primitives of the tick loop.
//!
//! # Modules
//!
//! - [`deadman`] – [`DeadMansSwitch`][deadman::DeadMansSwitch]: zeroes a
//!   control signal after a bounded silence interval so a lost link fails
//!   safe.
//! - [`arbiter`] – [`ControlArbiter`][arbiter::ControlArbiter]: the two-state
//!   machine selecting which pose producer drives the output.  Toggles may
//!   arrive from any thread through a [`ToggleHandle`][arbiter::ToggleHandle]
//!   and take effect only at the next tick boundary.

pub mod arbiter;
pub mod deadman;

pub use arbiter::{ControlArbiter, ToggleHandle, Transition};
pub use deadman::{DeadMansSwitch, LinkHealth};
