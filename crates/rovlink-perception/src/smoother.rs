//! Per-channel exponential smoothing.
//!
//! Each tick the filtered value moves a fraction `clamp01(dt · rate)` of the
//! remaining distance toward the latest raw sample:
//!
//! ```text
//! value = lerp(value, raw, clamp01(dt * rate))
//! ```
//!
//! While `dt · rate` lies in `(0, 1)` the error `|value − raw|` shrinks
//! strictly every tick; at `dt · rate ≥ 1` the value snaps to the raw sample.
//!
//! # Example
//!
//! ```rust
//! use rovlink_perception::smoother::ChannelSmoother;
//!
//! let mut s = ChannelSmoother::new(5.0);
//! assert_eq!(s.step(100.0, 0.1), 50.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::math::{clamp01, lerp};

/// Exponential interpolation state for one telemetry channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSmoother {
    /// Lerp rate per second.
    pub rate: f32,
    value: f32,
}

impl ChannelSmoother {
    /// A smoother starting at 0.
    pub fn new(rate: f32) -> Self {
        Self::with_value(rate, 0.0)
    }

    pub fn with_value(rate: f32, value: f32) -> Self {
        Self { rate, value }
    }

    /// Advance by `dt` seconds toward `raw` and return the new value.
    pub fn step(&mut self, raw: f32, dt: f32) -> f32 {
        self.value = lerp(self.value, raw, clamp01(dt * self.rate));
        self.value
    }

    /// Current filtered value.
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self, value: f32) {
        self.value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_step_covers_half_at_factor_one_half() {
        let mut s = ChannelSmoother::new(5.0);
        let v = s.step(100.0, 0.1);
        assert!((v - 50.0).abs() < 1e-4);
    }

    #[test]
    fn step_trends_toward_new_raw_value() {
        let mut s = ChannelSmoother::new(5.0);
        s.step(100.0, 0.1);
        let v = s.step(0.0, 0.1);
        assert!((v - 25.0).abs() < 1e-4);
        assert!(s.step(0.0, 0.1) < v);
    }

    #[test]
    fn error_decreases_strictly_while_factor_in_open_interval() {
        let raw = 42.0;
        let mut s = ChannelSmoother::with_value(5.0, -10.0);
        let mut prev = (s.value() - raw).abs();
        for _ in 0..20 {
            s.step(raw, 1.0 / 60.0);
            let err = (s.value() - raw).abs();
            assert!(err < prev, "error did not shrink: {err} >= {prev}");
            prev = err;
        }
    }

    #[test]
    fn large_dt_snaps_to_raw() {
        let mut s = ChannelSmoother::with_value(5.0, 3.0);
        assert_eq!(s.step(9.0, 1.0), 9.0);
    }

    #[test]
    fn zero_dt_leaves_value_unchanged() {
        let mut s = ChannelSmoother::with_value(5.0, 3.0);
        assert_eq!(s.step(9.0, 0.0), 3.0);
    }

    #[test]
    fn reset_overrides_value() {
        let mut s = ChannelSmoother::with_value(5.0, 3.0);
        s.reset(-1.0);
        assert_eq!(s.value(), -1.0);
        assert_eq!(s.rate, 5.0);
    }
}
