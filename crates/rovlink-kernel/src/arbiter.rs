//! [`ControlArbiter`] – two-state producer selection.
//!
//! The arbiter is owned by the tick consumer.  Other threads (an operator
//! console, a key handler) hold a cloned [`ToggleHandle`] and only *request*
//! a switch; the request is recorded on an atomic counter.  At the start of
//! every tick the consumer calls [`ControlArbiter::resolve`], which takes
//! the whole counter at once:
//!
//! | pending toggles | effect                                   |
//! |-----------------|------------------------------------------|
//! | 0               | nothing                                  |
//! | odd             | mode flips, a [`Transition`] is returned |
//! | even (> 0)      | mode unchanged, no pause/resume          |
//!
//! A tick therefore never observes a half-switched state, and a burst of
//! toggles settles on the same mode as applying them one by one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rovlink_types::ControlMode;
use tracing::{debug, info};

/// A net mode change produced by [`ControlArbiter::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ControlMode,
    pub to: ControlMode,
    /// Toggles folded into this transition.
    pub requested: usize,
}

#[derive(Debug, Default)]
struct Shared {
    pending: AtomicUsize,
    /// Mode published at the last tick boundary; `true` means remote.
    remote: AtomicBool,
}

impl Shared {
    fn publish(&self, mode: ControlMode) {
        self.remote
            .store(mode == ControlMode::Remote, Ordering::Release);
    }

    fn published(&self) -> ControlMode {
        if self.remote.load(Ordering::Acquire) {
            ControlMode::Remote
        } else {
            ControlMode::Local
        }
    }
}

/// Thread-safe handle for requesting a mode switch.
#[derive(Debug, Clone)]
pub struct ToggleHandle {
    shared: Arc<Shared>,
}

impl ToggleHandle {
    /// Request a switch.  Takes effect at the next tick boundary.
    pub fn toggle(&self) {
        let pending = self.shared.pending.fetch_add(1, Ordering::AcqRel) + 1;
        info!(pending, current = %self.mode(), "mode switch requested");
    }

    /// Mode as of the last resolved tick.
    pub fn mode(&self) -> ControlMode {
        self.shared.published()
    }
}

/// Owns the active [`ControlMode`].
///
/// # Example
///
/// ```
/// use rovlink_kernel::arbiter::ControlArbiter;
/// use rovlink_types::ControlMode;
///
/// let mut arbiter = ControlArbiter::new(ControlMode::Local);
/// let handle = arbiter.handle();
///
/// handle.toggle();
/// assert_eq!(handle.mode(), ControlMode::Local); // not yet resolved
///
/// let t = arbiter.resolve().unwrap();
/// assert_eq!(t.to, ControlMode::Remote);
/// assert_eq!(handle.mode(), ControlMode::Remote);
/// ```
#[derive(Debug)]
pub struct ControlArbiter {
    mode: ControlMode,
    shared: Arc<Shared>,
}

impl Default for ControlArbiter {
    fn default() -> Self {
        Self::new(ControlMode::default())
    }
}

impl ControlArbiter {
    pub fn new(mode: ControlMode) -> Self {
        let shared = Arc::new(Shared::default());
        shared.publish(mode);
        Self { mode, shared }
    }

    /// A new handle sharing this arbiter's pending-toggle counter.
    pub fn handle(&self) -> ToggleHandle {
        ToggleHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Fold every pending toggle into the current mode.  Call once per tick,
    /// before any producer runs.
    pub fn resolve(&mut self) -> Option<Transition> {
        let requested = self.shared.pending.swap(0, Ordering::AcqRel);
        if requested == 0 {
            return None;
        }
        if requested % 2 == 0 {
            debug!(requested, mode = %self.mode, "toggles cancelled out");
            return None;
        }
        let from = self.mode;
        let to = from.toggled();
        self.mode = to;
        self.shared.publish(to);
        info!(%from, %to, requested, "control mode switched");
        Some(Transition { from, to, requested })
    }

    /// Force `mode`, discarding pending toggles.  Used at session init.
    pub fn set_mode(&mut self, mode: ControlMode) {
        self.shared.pending.store(0, Ordering::Release);
        self.mode = mode;
        self.shared.publish(mode);
    }
}
