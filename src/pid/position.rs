// src/pid/position.rs

//! # Proportional Position Control Module
//!
//! Pure proportional controller used by the position loops (position error
//! to velocity target) and by the heading loop.

use crate::filter::Pt1Filter;

/// Proportional controller with an optional P-term low-pass filter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PController {
    /// Proportional gain.
    pub kp: f32,
    pterm_filter: Pt1Filter,
}

impl PController {
    /// Creates a controller with the given gain.
    pub const fn new(kp: f32) -> Self {
        Self {
            kp,
            pterm_filter: Pt1Filter::new(),
        }
    }

    /// Returns `error * kp`.
    pub fn apply(&self, error: f32) -> f32 {
        error * self.kp
    }

    /// Returns `error * kp` passed through the P-term filter.
    ///
    /// A non-positive `cutoff_hz` leaves the output unfiltered.
    pub fn apply_filtered(&mut self, error: f32, cutoff_hz: f32, dt: f32) -> f32 {
        let output = self.apply(error);
        self.pterm_filter.apply(output, cutoff_hz, dt)
    }

    /// Solves for the error that would produce `output`.
    ///
    /// Returns zero when the gain is zero so targets never become infinite.
    pub fn error_for_output(&self, output: f32) -> f32 {
        if self.kp != 0.0 {
            output / self.kp
        } else {
            0.0
        }
    }

    /// Clears the filter state.
    pub fn reset(&mut self) {
        self.pterm_filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    /// Test that the output is the error scaled by the gain.
    #[test]
    fn test_p_controller_output() {
        let controller = PController::new(0.65);
        assert!(value_close(65.0, controller.apply(100.0)));
        assert!(value_close(-13.0, controller.apply(-20.0)));
    }

    /// Test that the unfiltered path matches the plain output.
    #[test]
    fn test_p_controller_filter_bypass() {
        let mut controller = PController::new(1.0);
        assert!(value_close(1000.0, controller.apply_filtered(1000.0, 0.0, 0.1)));
    }

    /// Test that a filtered output lags the plain output.
    #[test]
    fn test_p_controller_filtered_lags() {
        let mut controller = PController::new(1.0);
        let output = controller.apply_filtered(100.0, 5.0, 0.01);
        assert!(output > 0.0 && output < 100.0);
        controller.reset();
        assert!(value_close(0.0, controller.apply_filtered(0.0, 5.0, 0.01)));
    }

    /// Test the inverse mapping, including the zero gain guard.
    #[test]
    fn test_p_controller_error_for_output() {
        assert!(value_close(200.0, PController::new(0.5).error_for_output(100.0)));
        assert!(value_close(0.0, PController::new(0.0).error_for_output(100.0)));
    }
}
