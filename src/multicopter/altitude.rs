// src/multicopter/altitude.rs

//! # Multicopter Altitude Controller
//!
//! Cascade of a P position loop (altitude error to climb rate, hard limited
//! to ±300 cm/s) and a PID velocity loop (climb rate error to throttle
//! offset). The throttle offset is low-pass filtered and added to the hover
//! baseline captured when altitude hold was engaged.
//!
//! The altitude target itself is moved at 5 Hz, either by the pilot
//! throttle stick or by the tiered autonomous descent.

use crate::config::{NavConfig, MAX_Z_VELOCITY_CMS, NAV_THROTTLE_CUTOFF_FREQUENCY_HZ, RC_COMMAND_RANGE};
use crate::filter::Pt1Filter;
use crate::rc::{apply_deadband, RcCommand};
use crate::state::{NavigationState, Z};
use crate::timer::{
    elapsed_us, hz_to_us, us_to_s, NavigationTimer, MIN_POSITION_UPDATE_RATE_HZ,
    POSITION_TARGET_UPDATE_RATE_HZ,
};

/// Climb rate of the autonomous descent for a given height above home, in cm/s.
pub fn autonomous_descent_rate(height_above_home: f32) -> f32 {
    if height_above_home > 1000.0 {
        -200.0
    } else if height_above_home > 250.0 {
        -100.0
    } else {
        -50.0
    }
}

/// Overrides the altitude target from the rangefinder when a surface
/// target is set and the reading is usable.
pub fn update_surface_tracking_target(state: &mut NavigationState) {
    let desired = state.desired_state.surface;
    let actual = state.actual_state.surface;
    if desired > 0.0 && actual > 0.0 && state.flags.has_valid_surface_sensor {
        state.desired_state.pos.z = state.actual_state.pos.z + (desired - actual);
    }
}

/// Runs the Z position loop and returns the new climb rate target.
///
/// The target is always within `±MAX_Z_VELOCITY_CMS`.
pub fn update_velocity_target(state: &mut NavigationState, pterm_cutoff_hz: f32, dt: f32) -> f32 {
    let altitude_error = state.desired_state.pos.z - state.actual_state.pos.z;
    let climb_rate = state.pids.pos[Z]
        .apply_filtered(altitude_error, pterm_cutoff_hz, dt)
        .clamp(-MAX_Z_VELOCITY_CMS, MAX_Z_VELOCITY_CMS);
    state.desired_state.vel.z = climb_rate;
    climb_rate
}

/// Altitude hold controller state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AltitudeController {
    target_update_timer: NavigationTimer,
    previous_time_update: u32,
    previous_time_position_update: u32,
    throttle_filter: Pt1Filter,
    initial_throttle: i16,
    adjusted_throttle: i16,
}

impl AltitudeController {
    /// Creates an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the hover throttle baseline.
    pub fn setup(&mut self, config: &NavConfig, rc: &RcCommand) {
        self.initial_throttle = if config.use_midrc_for_althold {
            config.mid_rc
        } else {
            rc.throttle
        };
    }

    /// Zeroes the Z position and velocity loops, the throttle filter and
    /// the throttle offset.
    pub fn reset(&mut self, state: &mut NavigationState) {
        state.pids.pos[Z].reset();
        state.pids.vel[Z].reset();
        self.throttle_filter.reset();
        state.rc_adjustment.throttle = 0;
    }

    /// Hover throttle baseline.
    pub fn initial_throttle(&self) -> i16 {
        self.initial_throttle
    }

    /// Throttle produced by the last run of the controller.
    pub fn adjusted_throttle(&self) -> i16 {
        self.adjusted_throttle
    }

    /// Runs one control tick and writes the throttle command into `rc`.
    ///
    /// A tick arriving too long after the previous one restarts the
    /// controller and leaves `rc` untouched.
    pub fn apply(
        &mut self,
        state: &mut NavigationState,
        config: &NavConfig,
        now: u32,
        rc: &mut RcCommand,
    ) {
        let stale_after = hz_to_us(MIN_POSITION_UPDATE_RATE_HZ);
        let delta_us = elapsed_us(now, self.previous_time_update);
        self.previous_time_update = now;

        if delta_us > stale_after {
            nav_debug!("altitude: restart after {} us", delta_us);
            self.target_update_timer.reset(now);
            self.previous_time_position_update = now;
            self.reset(state);
            return;
        }

        if self
            .target_update_timer
            .update(hz_to_us(POSITION_TARGET_UPDATE_RATE_HZ), now)
        {
            if state.should_apply_rth_altitude_logic() {
                let height_above_home = state.actual_state.pos.z - state.home.pos.z;
                state.update_altitude_target_from_climb_rate(autonomous_descent_rate(
                    height_above_home,
                ));
            }
            self.update_target_from_rc(state, config, rc);
        }

        if state.flags.vertical_position.take() {
            let delta_update_us = elapsed_us(now, self.previous_time_position_update);
            self.previous_time_position_update = now;

            if delta_update_us < stale_after {
                update_surface_tracking_target(state);
                update_velocity_target(
                    state,
                    config.pid.pos_pterm_cutoff_hz,
                    us_to_s(delta_update_us),
                );
                self.update_throttle(state, config, delta_update_us);
            } else {
                nav_warn!("altitude: stale vertical fix after {} us, reset", delta_update_us);
                self.reset(state);
            }
        }

        let throttle = self.initial_throttle as i32 + state.rc_adjustment.throttle as i32;
        rc.throttle = throttle.clamp(config.min_throttle as i32, config.max_throttle as i32) as i16;
        self.adjusted_throttle = rc.throttle;
    }

    fn update_target_from_rc(
        &self,
        state: &mut NavigationState,
        config: &NavConfig,
        rc: &RcCommand,
    ) {
        if !state.can_adjust_altitude_from_rc() {
            state.flags.is_adjusting_altitude = false;
            return;
        }

        let adjustment = apply_deadband(
            rc.throttle as i32 - self.initial_throttle as i32,
            config.alt_hold_deadband as i32,
        );
        if adjustment != 0 {
            let climb_rate =
                adjustment as f32 * config.max_manual_climb_rate / RC_COMMAND_RANGE as f32;
            state.update_altitude_target_from_climb_rate(climb_rate);
            state.flags.is_adjusting_altitude = true;
        } else {
            // Stick released, hold where it was let go
            if state.flags.is_adjusting_altitude {
                state.update_altitude_target_from_climb_rate(0.0);
            }
            state.flags.is_adjusting_altitude = false;
        }
    }

    fn update_throttle(&mut self, state: &mut NavigationState, config: &NavConfig, delta_us: u32) {
        let dt = us_to_s(delta_us);
        // Headroom left between the baseline and the throttle limits
        let min = (config.min_throttle as i32 - self.initial_throttle as i32) as f32;
        let max = (config.max_throttle as i32 - self.initial_throttle as i32) as f32;

        let output = state.pids.vel[Z].apply(
            state.desired_state.vel.z,
            state.actual_state.vel.z,
            dt,
            min,
            max,
            config.pid.vel_pterm_cutoff_hz,
            config.pid.dterm_cutoff_hz,
        );
        let filtered = self
            .throttle_filter
            .apply(output, NAV_THROTTLE_CUTOFF_FREQUENCY_HZ, dt);
        state.rc_adjustment.throttle = filtered.max(min).min(max) as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NavigationMode;
    use crate::test_utils::*;

    fn setup(mode: NavigationMode, throttle: i16) -> (NavConfig, NavigationState, AltitudeController) {
        let config = NavConfig::new();
        let mut state = NavigationState::with_config(&config);
        state.mode = mode;
        let mut altitude = AltitudeController::new();
        altitude.setup(&config, &RcCommand::new(0, 0, 0, throttle));
        altitude.reset(&mut state);
        (config, state, altitude)
    }

    /// Test that a 1000 cm altitude error is limited to a 300 cm/s climb.
    #[test]
    fn test_altitude_velocity_target_clamped() {
        let (_, mut state, _) = setup(NavigationMode::ALTHOLD, 1500);
        state.pids.pos[Z].kp = 1.0;
        state.actual_state.pos.z = 500.0;
        state.desired_state.pos.z = 1500.0;
        assert!(value_close(300.0, update_velocity_target(&mut state, 0.0, 0.02)));

        state.desired_state.pos.z = -1.0e6;
        assert!(value_close(-300.0, update_velocity_target(&mut state, 0.0, 0.02)));

        state.desired_state.pos.z = 600.0;
        assert!(value_close(100.0, update_velocity_target(&mut state, 0.0, 0.02)));
    }

    /// Test the tiered descent schedule.
    #[test]
    fn test_altitude_autonomous_descent_rate() {
        assert_eq!(-200.0, autonomous_descent_rate(1500.0));
        assert_eq!(-100.0, autonomous_descent_rate(1000.0));
        assert_eq!(-100.0, autonomous_descent_rate(300.0));
        assert_eq!(-50.0, autonomous_descent_rate(250.0));
        assert_eq!(-50.0, autonomous_descent_rate(-10.0));
    }

    /// Test that the surface target only applies with a valid reading.
    #[test]
    fn test_altitude_surface_tracking() {
        let (_, mut state, _) = setup(NavigationMode::ALTHOLD, 1500);
        state.actual_state.pos.z = 1000.0;
        state.desired_state.pos.z = 1000.0;
        state.desired_state.surface = 150.0;
        state.actual_state.surface = 100.0;

        update_surface_tracking_target(&mut state);
        assert!(value_close(1000.0, state.desired_state.pos.z));

        state.flags.has_valid_surface_sensor = true;
        update_surface_tracking_target(&mut state);
        assert!(value_close(1050.0, state.desired_state.pos.z));
    }

    /// Test the hover baseline sources.
    #[test]
    fn test_altitude_setup_baseline() {
        let mut config = NavConfig::new();
        let mut altitude = AltitudeController::new();
        altitude.setup(&config, &RcCommand::new(0, 0, 0, 1420));
        assert_eq!(1420, altitude.initial_throttle());

        config.use_midrc_for_althold = true;
        altitude.setup(&config, &RcCommand::new(0, 0, 0, 1420));
        assert_eq!(1500, altitude.initial_throttle());
    }

    /// Test that a late tick restarts the controller and leaves throttle alone.
    #[test]
    fn test_altitude_stale_tick_resets() {
        let (config, mut state, mut altitude) = setup(NavigationMode::ALTHOLD, 1500);
        let mut rc = RcCommand::new(0, 0, 0, 1500);
        state.rc_adjustment.throttle = 120;
        state.flags.vertical_position.raise();

        altitude.apply(&mut state, &config, 10 * TICK_US, &mut rc);
        assert_eq!(0, state.rc_adjustment.throttle);
        assert_eq!(1500, rc.throttle);
        // The fix is left for the next tick
        assert!(state.flags.vertical_position.is_pending());
    }

    /// Test that a fix arriving after the minimum update interval resets the loop.
    #[test]
    fn test_altitude_stale_fix_resets() {
        let (config, mut state, mut altitude) = setup(NavigationMode::ALTHOLD, 1500);
        let mut rc = RcCommand::new(0, 0, 0, 1500);
        let mut now = FAST_TICK_US;
        state.desired_state.pos.z = 100.0;

        // A healthy fix winds up the integrator
        altitude.apply(&mut state, &config, now, &mut rc);
        for _ in 0..5 {
            now += FAST_TICK_US;
            state.flags.vertical_position.raise();
            altitude.apply(&mut state, &config, now, &mut rc);
        }
        assert!(state.pids.vel[Z].integrator() > 0.0);
        assert!(state.rc_adjustment.throttle > 0);

        // Keep ticking without fixes until the fix interval is too long
        for _ in 0..10 {
            now += FAST_TICK_US;
            altitude.apply(&mut state, &config, now, &mut rc);
        }
        now += FAST_TICK_US;
        state.flags.vertical_position.raise();
        altitude.apply(&mut state, &config, now, &mut rc);

        assert!(value_close(0.0, state.pids.vel[Z].integrator()));
        assert_eq!(0, state.rc_adjustment.throttle);
        assert_eq!(1500, rc.throttle);
        assert!(!state.flags.vertical_position.is_pending());
    }

    /// Test that the throttle stick moves the target and release freezes it.
    #[test]
    fn test_altitude_stick_adjust_and_release() {
        let (config, mut state, mut altitude) = setup(NavigationMode::ALTHOLD, 1500);
        state.actual_state.pos.z = 1000.0;
        state.desired_state.pos.z = 1000.0;
        let mut now = FAST_TICK_US;
        let mut rc = RcCommand::new(0, 0, 0, 1750);
        altitude.apply(&mut state, &config, now, &mut rc);

        // Run until the 5 Hz target timer fires
        for _ in 0..10 {
            now += FAST_TICK_US;
            rc.throttle = 1750;
            altitude.apply(&mut state, &config, now, &mut rc);
        }
        // 200 stick units beyond the deadband, 200 cm/s at full stick
        assert!(state.flags.is_adjusting_altitude);
        assert!(value_close(1080.0, state.desired_state.pos.z));

        state.actual_state.pos.z = 1040.0;
        for _ in 0..10 {
            now += FAST_TICK_US;
            rc.throttle = 1500;
            altitude.apply(&mut state, &config, now, &mut rc);
        }
        assert!(!state.flags.is_adjusting_altitude);
        assert!(value_close(1040.0, state.desired_state.pos.z));
    }

    /// Test that the throttle command stays inside the configured limits.
    #[test]
    fn test_altitude_throttle_limits() {
        let (config, mut state, mut altitude) = setup(NavigationMode::ALTHOLD, 1800);
        let mut rc = RcCommand::new(0, 0, 0, 1800);
        let mut now = FAST_TICK_US;
        state.desired_state.pos.z = 10_000.0;
        altitude.apply(&mut state, &config, now, &mut rc);
        for _ in 0..200 {
            now += FAST_TICK_US;
            state.flags.vertical_position.raise();
            rc.throttle = 1800;
            altitude.apply(&mut state, &config, now, &mut rc);
            assert!(rc.throttle <= config.max_throttle);
            assert!(rc.throttle >= config.min_throttle);
            assert!(state.rc_adjustment.throttle <= config.max_throttle - 1800);
        }
        assert_eq!(rc.throttle, altitude.adjusted_throttle());
    }

    /// Test that the autonomous descent lowers the target while autolanding.
    #[test]
    fn test_altitude_autonomous_descent() {
        let (config, mut state, mut altitude) = setup(NavigationMode::RTH, 1500);
        for _ in 0..3 {
            state.rth.advance();
        }
        state.actual_state.pos.z = 2000.0;
        state.desired_state.pos.z = 2000.0;
        let mut now = FAST_TICK_US;
        let mut rc = RcCommand::new(0, 0, 0, 1500);
        altitude.apply(&mut state, &config, now, &mut rc);
        for _ in 0..10 {
            now += FAST_TICK_US;
            altitude.apply(&mut state, &config, now, &mut rc);
        }
        assert!(value_close(1800.0, state.desired_state.pos.z));
    }

    /// Test that reset clears the altitude loop filter.
    #[test]
    fn test_altitude_reset_clears_position_filter() {
        let (_, mut state, mut altitude) = setup(NavigationMode::ALTHOLD, 1500);
        state.desired_state.pos.z = 1000.0;
        assert!(update_velocity_target(&mut state, 2.0, 0.02) > 0.0);

        altitude.reset(&mut state);
        state.desired_state.pos.z = state.actual_state.pos.z;
        assert!(value_close(0.0, update_velocity_target(&mut state, 2.0, 0.02)));
    }
}
