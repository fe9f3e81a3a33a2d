// src/filter.rs

//! # PT1 Low-Pass Filter
//!
//! Single-pole low-pass filter used for P-term, D-term, throttle and
//! acceleration smoothing.

use core::f32::consts::PI;

/// First order (PT1) low-pass filter state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pt1Filter {
    state: f32,
}

impl Pt1Filter {
    /// Creates a filter with a zero state.
    pub const fn new() -> Self {
        Self { state: 0.0 }
    }

    /// Filters `input` with cut-off `cutoff_hz` over a step of `dt` seconds.
    ///
    /// A non-positive cut-off bypasses the filter and tracks the input.
    /// A non-positive `dt` holds the previous output.
    pub fn apply(&mut self, input: f32, cutoff_hz: f32, dt: f32) -> f32 {
        if cutoff_hz <= 0.0 {
            self.state = input;
        } else if dt > 0.0 {
            let rc = 1.0 / (2.0 * PI * cutoff_hz);
            self.state += dt / (rc + dt) * (input - self.state);
        }
        self.state
    }

    /// Current filter output.
    pub fn state(&self) -> f32 {
        self.state
    }

    /// Zeroes the filter.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// Test that the filter converges toward a constant input without overshoot.
    #[test]
    fn test_pt1_converges() {
        let mut filter = Pt1Filter::new();
        let mut previous = 0.0;
        for _ in 0..500 {
            let output = filter.apply(100.0, 2.0, 0.01);
            assert!(output >= previous && output <= 100.0);
            previous = output;
        }
        assert!((100.0 - filter.state()).abs() < 0.1);
    }

    /// Test a single filter step against the closed form.
    #[test]
    fn test_pt1_single_step() {
        let mut filter = Pt1Filter::new();
        let rc = 1.0 / (2.0 * PI * 4.0);
        let expected = 0.004 / (rc + 0.004) * 10.0;
        assert!(value_close(expected, filter.apply(10.0, 4.0, 0.004)));
    }

    /// Test the bypass and hold edge cases.
    #[test]
    fn test_pt1_bypass_and_hold() {
        let mut filter = Pt1Filter::new();
        assert!(value_close(42.0, filter.apply(42.0, 0.0, 0.01)));
        assert!(value_close(42.0, filter.apply(-5.0, 2.0, 0.0)));
        filter.reset();
        assert!(value_close(0.0, filter.state()));
    }
}
