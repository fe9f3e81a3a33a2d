// src/pid/velocity.rs

//! # Velocity PID Control Module
//!
//! This module provides a compute function and control data structure
//! to perform the velocity loop PID calculation, plus [`NavPid`], which
//! owns the filter state around it and applies the caller supplied output
//! bounds.

use crate::config::PidConfig;
use crate::filter::Pt1Filter;
use piddiy::PidController;

/// Control data for the velocity PID compute callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityControlData {
    /// The current measured value, typically an estimated velocity.
    pub measurement: f32,
    /// The time delta since the last computation, in seconds.
    pub dt: f32,
    /// Error fed to the proportional gain, after low-pass filtering.
    pub pterm_error: f32,
    /// Error rate fed to the derivative gain, after low-pass filtering.
    pub derivative: f32,
    /// Integral gain.
    pub ki: f32,
    /// The maximum allowed magnitude of the integral term, in output units.
    pub integral_limit: f32,
    /// Lower output bound.
    pub out_min: f32,
    /// Upper output bound.
    pub out_max: f32,
}

/// Velocity PID compute callback.
///
/// The integral is kept in output units: it accumulates `error * ki * dt`
/// and is clamped after each accumulation. It holds its value when the
/// output is saturated and the new step would push it further into
/// saturation. A non-positive `dt` leaves it untouched.
pub fn compute_velocity(
    pid: &mut PidController<f32, VelocityControlData>,
    data: VelocityControlData,
) -> (f32, f32, f32) {
    let error = pid.set_point - data.measurement;
    let mut integral = pid.integral;
    if data.dt > 0.0 {
        let candidate = (pid.integral + error * data.ki * data.dt)
            .clamp(-data.integral_limit, data.integral_limit);
        let output = pid.kp * data.pterm_error + candidate + pid.kd * data.derivative;
        let winding_up = (output > data.out_max && candidate > pid.integral)
            || (output < data.out_min && candidate < pid.integral);
        if !winding_up {
            integral = candidate;
        }
    }

    (data.pterm_error, integral, data.derivative)
}

/// Navigation PID controller.
///
/// Wraps a [`PidController`] with a PT1 filtered P-term, a PT1 filtered
/// derivative of the error, an integrator bounded to `±i_max` in output
/// units, and a per-call output clamp.
///
/// The wrapped controller runs with a unit integral gain; `ki` is applied
/// while accumulating so a gain change never steps the I-term.
pub struct NavPid {
    pid: PidController<f32, VelocityControlData>,
    ki: f32,
    i_max: f32,
    last_error: f32,
    pterm_filter: Pt1Filter,
    dterm_filter: Pt1Filter,
}

impl NavPid {
    /// Creates a controller using the provided gains.
    pub fn with_config(config: PidConfig) -> Self {
        let mut pid = PidController::new();
        pid.compute_fn(compute_velocity)
            .set_point(0.0)
            .kp(config.kp)
            .ki(1.0)
            .kd(config.kd);

        NavPid {
            pid,
            ki: config.ki,
            i_max: config.i_max.max(0.0),
            last_error: 0.0,
            pterm_filter: Pt1Filter::new(),
            dterm_filter: Pt1Filter::new(),
        }
    }

    /// Replaces the gains while keeping the integrator and filter state.
    ///
    /// The integrator keeps its output contribution, bounded by the new
    /// `i_max`.
    pub fn set_gains(&mut self, config: PidConfig) {
        self.pid.kp(config.kp).kd(config.kd);
        self.ki = config.ki;
        self.i_max = config.i_max.max(0.0);
        self.pid.integral = self.pid.integral.clamp(-self.i_max, self.i_max);
    }

    /// Runs one PID step and returns the output clamped to `[out_min, out_max]`.
    ///
    /// While the output sits at a bound the integrator does not grow
    /// toward it.
    ///
    /// `pterm_cutoff_hz` and `dterm_cutoff_hz` select the P-term and
    /// D-term filter cut-offs; zero disables the filter.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &mut self,
        set_point: f32,
        measurement: f32,
        dt: f32,
        out_min: f32,
        out_max: f32,
        pterm_cutoff_hz: f32,
        dterm_cutoff_hz: f32,
    ) -> f32 {
        let error = set_point - measurement;
        let pterm_error = self.pterm_filter.apply(error, pterm_cutoff_hz, dt);

        let raw_derivative = if dt > 0.0 {
            (error - self.last_error) / dt
        } else {
            0.0
        };
        let derivative = if dt > 0.0 {
            self.dterm_filter.apply(raw_derivative, dterm_cutoff_hz, dt)
        } else {
            0.0
        };
        self.last_error = error;

        self.pid.set_point(set_point);
        let output = self.pid.compute(VelocityControlData {
            measurement,
            dt,
            pterm_error,
            derivative,
            ki: self.ki,
            integral_limit: self.i_max,
            out_min,
            out_max,
        });

        if out_min <= out_max {
            output.clamp(out_min, out_max)
        } else {
            // Inverted bounds collapse to their midpoint
            (out_min + out_max) * 0.5
        }
    }

    /// Integrator contribution to the output, bounded by `±i_max`.
    pub fn integrator(&self) -> f32 {
        self.pid.integral
    }

    /// Proportional gain.
    pub fn kp(&self) -> f32 {
        self.pid.kp
    }

    /// Zeroes the integrator, the last error and both filters.
    pub fn reset(&mut self) {
        self.pid.integral = 0.0;
        self.pid.error = 0.0;
        self.last_error = 0.0;
        self.pterm_filter.reset();
        self.dterm_filter.reset();
    }
}
