//! `rovlink-runtime` – The tick engine.
//!
//! Wires the inbox, telemetry cache, smoothing, composition and arbitration
//! into one single-threaded loop.
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: the only
//!   consumer of the message inbox.  Each tick arbitrates, drains, gates and
//!   produces the output pose.
//! - [`telemetry_state`] – [`TelemetryState`][telemetry_state::TelemetryState]:
//!   last-known value per channel, plus the follow-speed dead-man's switch.
//! - [`producer`] – the [`PoseProducer`][producer::PoseProducer] trait shared
//!   by both pilots.
//! - [`remote_pilot`] – [`RemotePilot`][remote_pilot::RemotePilot]: smoothed
//!   telemetry to target pose to output pose.
//! - [`local_pilot`] – [`LocalPilot`][local_pilot::LocalPilot]: operator
//!   input with persistent, drag-damped velocity.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP span export.

pub mod control_loop;
pub mod local_pilot;
pub mod producer;
pub mod remote_pilot;
pub mod telemetry;
pub mod telemetry_state;

pub use control_loop::{ControlLoop, ControlLoopConfig, TickOutput};
pub use local_pilot::{LocalInput, LocalPilot, LocalPilotConfig};
pub use producer::{PoseProducer, TickFrame};
pub use remote_pilot::{RemotePilot, SmoothedPose};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use telemetry_state::TelemetryState;
