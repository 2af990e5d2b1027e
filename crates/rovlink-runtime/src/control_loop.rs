//! [`ControlLoop`] – the single tick consumer.
//!
//! Everything downstream of the inbox belongs to this struct and is touched
//! from one thread only.  Each call to [`ControlLoop::tick`]:
//!
//! 1. **Clock** – advance the session clock by `dt`.
//! 2. **Arbitrate** – fold pending toggles into the mode.  On a net change
//!    the old producer is paused and the new one resumed, before either
//!    produces.
//! 3. **Drain** – take every queued message and merge it into
//!    [`TelemetryState`].  Happens in both modes so the remote producer never
//!    resumes on a backlog.
//! 4. **Gate** – apply the dead-man's switch to the follow speed.
//! 5. **Produce** – the active producer computes the output pose.
//!
//! The tick never blocks and never fails: decode and connection problems
//! stay inside the ingestors.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use rovlink_middleware::MessageInbox;
//! use rovlink_runtime::control_loop::{ControlLoop, ControlLoopConfig};
//!
//! let (_tx, rx) = MessageInbox::channel();
//! let mut control = ControlLoop::new(ControlLoopConfig::default(), rx);
//! let out = control.tick(Duration::from_millis(16));
//! assert_eq!(out.drained, 0);
//! ```

use std::time::Duration;

use rovlink_kernel::{ControlArbiter, ToggleHandle, Transition};
use rovlink_kernel::deadman::DEFAULT_TIMEOUT;
use rovlink_middleware::InboxReceiver;
use rovlink_perception::{Pose, PoseConstants};
use rovlink_types::ControlMode;
use tracing::{debug, info, warn};

use crate::local_pilot::{LocalInput, LocalPilot, LocalPilotConfig};
use crate::producer::{PoseProducer, TickFrame};
use crate::remote_pilot::{RemotePilot, SmoothedPose};
use crate::telemetry_state::TelemetryState;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`ControlLoop`].
#[derive(Debug, Clone)]
pub struct ControlLoopConfig {
    /// Producer active on the first tick.
    pub start_mode: ControlMode,
    /// Output and remote target pose at session start.
    pub initial_pose: Pose,
    pub constants: PoseConstants,
    pub local: LocalPilotConfig,
    /// Follow-speed silence before the dead-man's switch trips.
    pub staleness_timeout: Duration,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            start_mode: ControlMode::Local,
            initial_pose: Pose::identity(),
            constants: PoseConstants::default(),
            local: LocalPilotConfig::default(),
            staleness_timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Result of one [`ControlLoop::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    pub pose: Pose,
    pub mode: ControlMode,
    /// Set when this tick switched producers.
    pub transition: Option<Transition>,
    /// Messages merged this tick.
    pub drained: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// ControlLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct ControlLoop {
    inbox: InboxReceiver,
    telemetry: TelemetryState,
    arbiter: ControlArbiter,
    local: LocalPilot,
    remote: RemotePilot,
    pose: Pose,
    /// Session clock.
    clock: Duration,
    follow_speed_stale: bool,
}

impl ControlLoop {
    pub fn new(config: ControlLoopConfig, inbox: InboxReceiver) -> Self {
        let mut control = Self {
            inbox,
            telemetry: TelemetryState::with_staleness_timeout(config.staleness_timeout),
            arbiter: ControlArbiter::new(config.start_mode),
            local: LocalPilot::new(config.local),
            remote: RemotePilot::new(config.constants, config.initial_pose),
            pose: config.initial_pose,
            clock: Duration::ZERO,
            follow_speed_stale: true,
        };
        let idle = config.start_mode.toggled();
        control.producer_mut(idle).pause();
        info!(mode = %config.start_mode, "control loop initialised");
        control
    }

    fn producer_mut(&mut self, mode: ControlMode) -> &mut dyn PoseProducer {
        match mode {
            ControlMode::Local => &mut self.local,
            ControlMode::Remote => &mut self.remote,
        }
    }

    /// Advance the session by `dt` and compute the output pose.
    pub fn tick(&mut self, dt: Duration) -> TickOutput {
        self.clock += dt;

        let transition = self.arbiter.resolve();
        if let Some(t) = transition {
            let pose = self.pose;
            self.producer_mut(t.from).pause();
            self.producer_mut(t.to).resume(&pose);
        }

        let messages = self.inbox.drain();
        for message in &messages {
            self.telemetry.apply(message, self.clock);
        }

        let stale = self.telemetry.follow_speed_is_stale(self.clock);
        if stale != self.follow_speed_stale {
            if stale {
                warn!(
                    last_update = ?self.telemetry.last_follow_speed_update(),
                    "follow speed stale; forcing zero"
                );
            } else {
                info!("follow speed link live");
            }
            self.follow_speed_stale = stale;
        }

        let mode = self.arbiter.mode();
        let frame = TickFrame {
            telemetry: &self.telemetry,
            follow_speed: self.telemetry.gated_follow_speed(self.clock),
            dt: dt.as_secs_f32(),
            current: self.pose,
        };
        self.pose = match mode {
            ControlMode::Local => self.local.produce(&frame),
            ControlMode::Remote => self.remote.produce(&frame),
        };

        debug!(
            %mode,
            drained = messages.len(),
            x = self.pose.position.x,
            y = self.pose.position.y,
            z = self.pose.position.z,
            "tick"
        );

        TickOutput {
            pose: self.pose,
            mode,
            transition,
            drained: messages.len(),
        }
    }

    /// Reset telemetry, smoothers, local motion, the remote target and the
    /// output pose to `pose`.  The mode and the session clock are kept.
    pub fn reinitialize(&mut self, pose: Pose) {
        self.telemetry.reset();
        self.remote.reset(pose);
        self.local.reset();
        self.pose = pose;
        self.follow_speed_stale = true;
        info!("control loop reinitialised");
    }

    pub fn set_local_input(&mut self, input: LocalInput) {
        self.local.set_input(input);
    }

    /// Re-seed the remote target from a host pose.
    pub fn sync_remote_target(&mut self, pose: Pose) {
        self.remote.sync_target(pose);
    }

    /// Handle for requesting a mode switch from another thread.
    pub fn toggle_handle(&self) -> ToggleHandle {
        self.arbiter.handle()
    }

    pub fn mode(&self) -> ControlMode {
        self.arbiter.mode()
    }

    pub fn telemetry(&self) -> &TelemetryState {
        &self.telemetry
    }

    pub fn smoothed(&self) -> SmoothedPose {
        self.remote.smoothed()
    }

    /// Output pose of the last tick.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn local(&self) -> &LocalPilot {
        &self.local
    }

    /// Session time accumulated from tick `dt`s.
    pub fn clock(&self) -> Duration {
        self.clock
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
