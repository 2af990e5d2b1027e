//! [`DeadMansSwitch`] – staleness gate for a single control signal.
//!
//! The switch remembers when the signal was last fed, measured on the session
//! clock (a [`Duration`] since session start).  Integer arithmetic on
//! `Duration` keeps the boundary exact: at `now − last == timeout` the signal
//! is already stale.
//!
//! A switch that has never been fed is stale.

use std::time::Duration;

/// Default silence window before the gated signal is forced to zero.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Freshness of the gated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    /// Fed within the timeout window.
    Live,
    /// Never fed, or silent for at least the timeout.
    Stale,
}

/// Zeroes a signal after `timeout` of silence.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use rovlink_kernel::deadman::DeadMansSwitch;
///
/// let mut sw = DeadMansSwitch::default();
/// sw.feed(Duration::ZERO);
/// assert_eq!(sw.gate(3.0, Duration::from_millis(490)), 3.0);
/// assert_eq!(sw.gate(3.0, Duration::from_millis(500)), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadMansSwitch {
    timeout: Duration,
    last: Option<Duration>,
}

impl Default for DeadMansSwitch {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl DeadMansSwitch {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record that the signal was refreshed at `now`.
    pub fn feed(&mut self, now: Duration) {
        self.last = Some(now);
    }

    /// Session time of the last feed, if any.
    pub fn last_fed(&self) -> Option<Duration> {
        self.last
    }

    pub fn health(&self, now: Duration) -> LinkHealth {
        match self.last {
            Some(last) if now.saturating_sub(last) < self.timeout => LinkHealth::Live,
            _ => LinkHealth::Stale,
        }
    }

    pub fn is_stale(&self, now: Duration) -> bool {
        self.health(now) == LinkHealth::Stale
    }

    /// `value` while live, `0.0` once stale.
    pub fn gate(&self, value: f32, now: Duration) -> f32 {
        if self.is_stale(now) { 0.0 } else { value }
    }

    /// Forget the last feed.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
