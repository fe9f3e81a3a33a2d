// src/multicopter/position.rs

//! # Multicopter Horizontal Position Controller
//!
//! Position P loop (per axis, shared gain) to a velocity target bounded by
//! the configured speed, then a per axis velocity PID to an earth frame
//! acceleration target. The PID output bounds are derived from a jerk
//! limit around the previous acceleration target, inside an acceleration
//! ceiling split between the axes by the direction of the velocity error.
//!
//! The filtered acceleration target is rotated into the body frame and
//! converted to pitch first, then roll, since banking with the nose down
//! reduces the lift available for the roll axis.
//!
//! With `GpsAtti` control, or without a usable position source, the sticks
//! command lean angles directly.

use crate::config::{
    NavConfig, UserControlMode, GRAVITY_CMSS, NAV_ACCELERATION_XY_MAX, NAV_ACCEL_CUTOFF_FREQUENCY_HZ,
    NAV_ACCEL_SLOW_XY_MAX, NAV_JERK_LIMIT_CMSSS, RC_COMMAND_RANGE,
};
use crate::filter::Pt1Filter;
use crate::rc::{apply_deadband, lean_angle_to_rc_command, rc_command_to_lean_angle, RcCommand};
use crate::state::{NavigationState, X, Y};
use crate::timer::{
    elapsed_us, hz_to_us, us_to_s, NavigationTimer, MIN_POSITION_UPDATE_RATE_HZ,
    POSITION_TARGET_UPDATE_RATE_HZ,
};
use libm::{atan2f, cosf, sqrtf};

/// Velocity error magnitude below which the acceleration ceiling is split evenly, in cm/s.
const MIN_VELOCITY_ERROR_FOR_SPLIT: f32 = 0.1;

/// Runs the XY position loops and returns the velocity target, in cm/s.
///
/// The target is scaled down, keeping its direction, when its magnitude
/// exceeds `max_speed`.
pub fn update_velocity_target(
    state: &mut NavigationState,
    max_speed: f32,
    pterm_cutoff_hz: f32,
    dt: f32,
) -> (f32, f32) {
    let error_x = state.desired_state.pos.x - state.actual_state.pos.x;
    let error_y = state.desired_state.pos.y - state.actual_state.pos.y;
    let mut vel_x = state.pids.pos[X].apply_filtered(error_x, pterm_cutoff_hz, dt);
    let mut vel_y = state.pids.pos[Y].apply_filtered(error_y, pterm_cutoff_hz, dt);

    let vel_total = sqrtf(vel_x * vel_x + vel_y * vel_y);
    if vel_total > max_speed {
        vel_x = max_speed * (vel_x / vel_total);
        vel_y = max_speed * (vel_y / vel_total);
    }

    state.desired_state.vel.x = vel_x;
    state.desired_state.vel.y = vel_y;
    (vel_x, vel_y)
}

/// Splits the acceleration ceiling between the axes by the direction of
/// the velocity error.
pub fn acceleration_limits(vel_error_x: f32, vel_error_y: f32, max_accel: f32) -> (f32, f32) {
    let magnitude = sqrtf(vel_error_x * vel_error_x + vel_error_y * vel_error_y);
    if magnitude > MIN_VELOCITY_ERROR_FOR_SPLIT {
        (
            max_accel / magnitude * vel_error_x.abs(),
            max_accel / magnitude * vel_error_y.abs(),
        )
    } else {
        let limit = max_accel / core::f32::consts::SQRT_2;
        (limit, limit)
    }
}

/// Converts an earth frame acceleration target to pitch and roll lean
/// angles, in decidegrees, clamped to `±max_inclination`.
pub fn acceleration_to_lean_angles(
    accel_north: f32,
    accel_east: f32,
    sin_yaw: f32,
    cos_yaw: f32,
    max_inclination: i16,
) -> (i16, i16) {
    let accel_forward = accel_north * cos_yaw + accel_east * sin_yaw;
    let accel_right = -accel_north * sin_yaw + accel_east * cos_yaw;

    let pitch = atan2f(accel_forward, GRAVITY_CMSS);
    let roll = atan2f(accel_right * cosf(pitch), GRAVITY_CMSS);

    let max = max_inclination as f32;
    let to_decidegrees = |angle: f32| (angle.to_degrees() * 10.0).max(-max).min(max) as i16;
    (to_decidegrees(pitch), to_decidegrees(roll))
}

/// Horizontal position controller state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionController {
    target_update_timer: NavigationTimer,
    previous_time_update: u32,
    previous_time_position_update: u32,
    accel_filter: [Pt1Filter; 2],
    last_accel_target: [f32; 2],
}

impl PositionController {
    /// Creates an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes both XY position and velocity loops, the lean angle
    /// adjustments, the acceleration filters and the jerk limiter history.
    pub fn reset(&mut self, state: &mut NavigationState) {
        state.pids.pos[X].reset();
        state.pids.pos[Y].reset();
        state.pids.vel[X].reset();
        state.pids.vel[Y].reset();
        state.rc_adjustment.roll = 0;
        state.rc_adjustment.pitch = 0;
        for filter in self.accel_filter.iter_mut() {
            filter.reset();
        }
        self.last_accel_target = [0.0; 2];
    }

    /// Acceleration targets of the last run, north and east, before filtering.
    pub fn last_accel_target(&self) -> (f32, f32) {
        (self.last_accel_target[X], self.last_accel_target[Y])
    }

    /// Runs one control tick and writes roll and pitch into `rc`.
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
            nav_debug!("position: restart after {} us", delta_us);
            self.target_update_timer.reset(now);
            self.previous_time_position_update = now;
            self.reset(state);
            return;
        }

        let mut force_atti = false;
        if state.flags.has_valid_position_sensor {
            if self
                .target_update_timer
                .update(hz_to_us(POSITION_TARGET_UPDATE_RATE_HZ), now)
                && config.user_control_mode == UserControlMode::GpsCruise
            {
                update_target_from_rc(state, config, rc);
            }

            if state.flags.horizontal_position.take() {
                let delta_update_us = elapsed_us(now, self.previous_time_position_update);
                self.previous_time_position_update = now;

                if delta_update_us < stale_after {
                    update_velocity_target(
                        state,
                        config.max_speed,
                        config.pid.pos_pterm_cutoff_hz,
                        us_to_s(delta_update_us),
                    );
                    let max_accel = if state.should_apply_waypoint() || state.should_apply_rth() {
                        NAV_ACCEL_SLOW_XY_MAX
                    } else {
                        NAV_ACCELERATION_XY_MAX
                    };
                    self.update_acceleration(state, config, delta_update_us, max_accel);
                } else {
                    nav_warn!("position: stale horizontal fix after {} us, reset", delta_update_us);
                    self.reset(state);
                }
            }
        } else {
            state.rc_adjustment.roll = 0;
            state.rc_adjustment.pitch = 0;
            force_atti = true;
        }

        if config.user_control_mode == UserControlMode::GpsAtti || force_atti {
            update_lean_angle_from_rc(state, config, rc);
        }

        rc.pitch = lean_angle_to_rc_command(state.rc_adjustment.pitch, config.max_angle_inclination);
        rc.roll = lean_angle_to_rc_command(state.rc_adjustment.roll, config.max_angle_inclination);
    }

    fn update_acceleration(
        &mut self,
        state: &mut NavigationState,
        config: &NavConfig,
        delta_us: u32,
        max_accel: f32,
    ) {
        let dt = us_to_s(delta_us);
        let desired = state.desired_state.vel;
        let actual = state.actual_state.vel;

        let (limit_x, limit_y) =
            acceleration_limits(desired.x - actual.x, desired.y - actual.y, max_accel);

        let max_change = dt * NAV_JERK_LIMIT_CMSSS;
        let mut accel = [0.0; 2];
        for (axis, limit) in [(X, limit_x), (Y, limit_y)] {
            // Ceiling first, then the jerk window, so a shrinking ceiling
            // is reached at the jerk rate
            let last = self.last_accel_target[axis];
            let min = (-limit).clamp(last - max_change, last + max_change);
            let max = limit.clamp(last - max_change, last + max_change);
            let (set_point, measurement) = if axis == X {
                (desired.x, actual.x)
            } else {
                (desired.y, actual.y)
            };
            accel[axis] = state.pids.vel[axis].apply(
                set_point,
                measurement,
                dt,
                min,
                max,
                config.pid.vel_pterm_cutoff_hz,
                config.pid.dterm_cutoff_hz,
            );
        }
        self.last_accel_target = accel;
        state.desired_state.acc.x = accel[X];
        state.desired_state.acc.y = accel[Y];

        let accel_north = self.accel_filter[X].apply(accel[X], NAV_ACCEL_CUTOFF_FREQUENCY_HZ, dt);
        let accel_east = self.accel_filter[Y].apply(accel[Y], NAV_ACCEL_CUTOFF_FREQUENCY_HZ, dt);

        let (pitch, roll) = acceleration_to_lean_angles(
            accel_north,
            accel_east,
            state.actual_state.sin_yaw,
            state.actual_state.cos_yaw,
            config.max_angle_inclination,
        );
        state.rc_adjustment.pitch = pitch;
        state.rc_adjustment.roll = roll;
    }
}

fn update_target_from_rc(state: &mut NavigationState, config: &NavConfig, rc: &RcCommand) {
    if !state.can_adjust_horizontal_from_rc() {
        state.flags.is_adjusting_position = false;
        return;
    }

    let deadband = config.pos_hold_deadband as i32;
    let pitch_adjustment = apply_deadband(rc.pitch as i32, deadband);
    let roll_adjustment = apply_deadband(rc.roll as i32, deadband);

    if pitch_adjustment != 0 || roll_adjustment != 0 {
        let scale = config.max_manual_speed / RC_COMMAND_RANGE as f32;
        let vel_forward = pitch_adjustment as f32 * scale;
        let vel_right = roll_adjustment as f32 * scale;

        let sin_yaw = state.actual_state.sin_yaw;
        let cos_yaw = state.actual_state.cos_yaw;
        let vel_north = vel_forward * cos_yaw - vel_right * sin_yaw;
        let vel_east = vel_forward * sin_yaw + vel_right * cos_yaw;

        // Place the target so the position loop yields the requested velocity
        state.desired_state.pos.x =
            state.actual_state.pos.x + state.pids.pos[X].error_for_output(vel_north);
        state.desired_state.pos.y =
            state.actual_state.pos.y + state.pids.pos[Y].error_for_output(vel_east);
        state.flags.is_adjusting_position = true;
    } else {
        if state.flags.is_adjusting_position {
            state.desired_state.pos.x = state.actual_state.pos.x;
            state.desired_state.pos.y = state.actual_state.pos.y;
        }
        state.flags.is_adjusting_position = false;
    }
}

fn update_lean_angle_from_rc(state: &mut NavigationState, config: &NavConfig, rc: &RcCommand) {
    if !state.can_adjust_horizontal_from_rc() {
        state.flags.is_adjusting_position = false;
        return;
    }

    let deadband = config.pos_hold_deadband as i32;
    let roll_adjustment = apply_deadband(rc.roll as i32, deadband);
    let pitch_adjustment = apply_deadband(rc.pitch as i32, deadband);

    if roll_adjustment != 0 || pitch_adjustment != 0 {
        state.rc_adjustment.roll = rc_command_to_lean_angle(rc.roll, config.max_angle_inclination);
        state.rc_adjustment.pitch = rc_command_to_lean_angle(rc.pitch, config.max_angle_inclination);

        if state.should_apply_pos_hold() {
            state.desired_state.pos.x = state.actual_state.pos.x;
            state.desired_state.pos.y = state.actual_state.pos.y;
        }

        // Pilot is in direct control, restart the velocity loops
        state.pids.vel[X].reset();
        state.pids.vel[Y].reset();
        state.flags.is_adjusting_position = true;
    } else {
        state.flags.is_adjusting_position = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NavigationMode, Vector3};
    use crate::test_utils::*;

    fn setup(mode: NavigationMode) -> (NavConfig, NavigationState, PositionController) {
        let config = NavConfig::new();
        let mut state = NavigationState::with_config(&config);
        state.mode = mode;
        state.flags.has_valid_position_sensor = true;
        (config, state, PositionController::new())
    }

    /// Test that the velocity target keeps its direction when limited.
    #[test]
    fn test_position_velocity_target_limited() {
        let (_, mut state, _) = setup(NavigationMode::POSHOLD_2D);
        state.pids.pos[X].kp = 1.0;
        state.pids.pos[Y].kp = 1.0;
        state.desired_state.pos = Vector3::new(3000.0, 4000.0, 0.0);

        let (vel_x, vel_y) = update_velocity_target(&mut state, 300.0, 0.0, 0.1);
        assert!(value_close(180.0, vel_x));
        assert!(value_close(240.0, vel_y));

        state.desired_state.pos = Vector3::new(30.0, -40.0, 0.0);
        let (vel_x, vel_y) = update_velocity_target(&mut state, 300.0, 0.0, 0.1);
        assert!(value_close(30.0, vel_x));
        assert!(value_close(-40.0, vel_y));
    }

    /// Test the acceleration ceiling split.
    #[test]
    fn test_position_acceleration_limits() {
        let (limit_x, limit_y) = acceleration_limits(30.0, -40.0, 550.0);
        assert!(value_close(330.0, limit_x));
        assert!(value_close(440.0, limit_y));

        let (limit_x, limit_y) = acceleration_limits(0.05, 0.0, 980.0);
        assert!((limit_x - 692.96).abs() < 0.01);
        assert!(value_close(limit_x, limit_y));
    }

    /// Test the acceleration to lean angle conversion and its rotation.
    #[test]
    fn test_position_lean_angles() {
        // Facing north, 1 g forward is a 45 degree pitch, clamped to 30
        let (pitch, roll) = acceleration_to_lean_angles(GRAVITY_CMSS, 0.0, 0.0, 1.0, 300);
        assert_eq!(300, pitch);
        assert_eq!(0, roll);

        let (pitch, roll) = acceleration_to_lean_angles(GRAVITY_CMSS, 0.0, 0.0, 1.0, 900);
        assert!((pitch - 450).abs() <= 1);
        assert_eq!(0, roll);

        // Facing east, northward acceleration is a left roll
        let (pitch, roll) = acceleration_to_lean_angles(100.0, 0.0, 1.0, 0.0, 300);
        assert_eq!(0, pitch);
        assert!(roll < 0);
    }

    /// Test that the acceleration target changes by no more than the jerk limit.
    #[test]
    fn test_position_jerk_limited() {
        let (config, mut state, mut position) = setup(NavigationMode::POSHOLD_2D);
        let step = 4_000;
        let max_change = NAV_JERK_LIMIT_CMSSS * us_to_s(step);
        state.desired_state.pos = Vector3::new(5000.0, -5000.0, 0.0);

        // The first tick restarts the controller and anchors the fix clock
        let mut now = 10 * TICK_US;
        let mut rc = RcCommand::default();
        position.apply(&mut state, &config, now, &mut rc);
        let mut last = position.last_accel_target();
        for _ in 0..200 {
            now += step;
            state.flags.horizontal_position.raise();
            position.apply(&mut state, &config, now, &mut rc);
            let accel = position.last_accel_target();
            assert!((accel.0 - last.0).abs() <= max_change + 1e-3);
            assert!((accel.1 - last.1).abs() <= max_change + 1e-3);
            last = accel;
        }
        assert!(last.0 > 0.0);
        assert!(last.1 < 0.0);
        assert!(state.rc_adjustment.pitch > 0);
        assert!(state.rc_adjustment.roll < 0);
    }

    /// Test that releasing the sticks pins the target to the current position.
    #[test]
    fn test_position_stick_release_holds() {
        let (config, mut state, mut position) = setup(NavigationMode::POSHOLD_3D);
        state.actual_state.set_yaw(0);
        state.actual_state.pos = Vector3::new(100.0, 200.0, 0.0);
        let mut now = FAST_TICK_US;
        let mut rc = RcCommand::new(0, 270, 0, 1500);
        position.apply(&mut state, &config, now, &mut rc);
        for _ in 0..10 {
            now += FAST_TICK_US;
            rc = RcCommand::new(0, 270, 0, 1500);
            position.apply(&mut state, &config, now, &mut rc);
        }
        // 250 units beyond the deadband is 250 cm/s forward
        assert!(state.flags.is_adjusting_position);
        let expected_x = 100.0 + 250.0 / config.pid.pos_xy_kp;
        assert!((state.desired_state.pos.x - expected_x).abs() < 0.01);
        assert!(value_close(200.0, state.desired_state.pos.y));

        state.actual_state.pos = Vector3::new(150.0, 210.0, 0.0);
        for _ in 0..10 {
            now += FAST_TICK_US;
            rc = RcCommand::new(0, 0, 0, 1500);
            position.apply(&mut state, &config, now, &mut rc);
        }
        assert!(!state.flags.is_adjusting_position);
        assert!(vector_close(
            Vector3::new(150.0, 210.0, 0.0),
            state.desired_state.pos,
            TEST_TOLERANCE
        ));
    }

    /// Test that without a position source the sticks command lean angles.
    #[test]
    fn test_position_no_sensor_forces_atti() {
        let (config, mut state, mut position) = setup(NavigationMode::POSHOLD_2D);
        state.flags.has_valid_position_sensor = false;
        state.rc_adjustment.roll = 120;
        state.rc_adjustment.pitch = -80;
        state.actual_state.pos = Vector3::new(10.0, 20.0, 0.0);

        let mut rc = RcCommand::new(0, 0, 0, 1500);
        position.apply(&mut state, &config, FAST_TICK_US, &mut rc);
        assert_eq!(0, state.rc_adjustment.roll);
        assert_eq!(0, state.rc_adjustment.pitch);
        assert_eq!(0, rc.roll);

        let mut rc = RcCommand::new(250, -100, 0, 1500);
        position.apply(&mut state, &config, 2 * FAST_TICK_US, &mut rc);
        assert_eq!(150, state.rc_adjustment.roll);
        assert_eq!(-60, state.rc_adjustment.pitch);
        assert_eq!(250, rc.roll);
        assert_eq!(-100, rc.pitch);
        assert!(state.flags.is_adjusting_position);
        assert!(vector_close(
            Vector3::new(10.0, 20.0, 0.0),
            state.desired_state.pos,
            TEST_TOLERANCE
        ));
    }

    /// Test that a fix arriving after the minimum update interval resets the loop.
    #[test]
    fn test_position_stale_fix_resets() {
        let (config, mut state, mut position) = setup(NavigationMode::POSHOLD_2D);
        state.desired_state.pos = Vector3::new(20.0, 0.0, 0.0);
        let mut now = FAST_TICK_US;
        let mut rc = RcCommand::default();
        position.apply(&mut state, &config, now, &mut rc);
        for _ in 0..5 {
            now += FAST_TICK_US;
            state.flags.horizontal_position.raise();
            position.apply(&mut state, &config, now, &mut rc);
        }
        assert!(state.pids.vel[X].integrator() > 0.0);
        assert!(state.rc_adjustment.pitch > 0);

        for _ in 0..10 {
            now += FAST_TICK_US;
            position.apply(&mut state, &config, now, &mut rc);
        }
        now += FAST_TICK_US;
        state.flags.horizontal_position.raise();
        position.apply(&mut state, &config, now, &mut rc);

        assert!(value_close(0.0, state.pids.vel[X].integrator()));
        assert_eq!(0, state.rc_adjustment.pitch);
        assert_eq!(0, state.rc_adjustment.roll);
        assert_eq!((0.0, 0.0), position.last_accel_target());
    }

    /// Test that a change of direction moves the acceleration target at the jerk rate.
    #[test]
    fn test_position_jerk_limit_direction_change() {
        let (config, mut state, mut position) = setup(NavigationMode::POSHOLD_2D);
        position.last_accel_target = [346.0, 0.0];
        state.desired_state.vel = Vector3::new(0.0, 300.0, 0.0);

        // 4 ms at 1700 cm/s^3
        position.update_acceleration(&mut state, &config, 4_000, NAV_ACCELERATION_XY_MAX);
        let (accel_x, accel_y) = position.last_accel_target();
        assert!((accel_x - 346.0).abs() <= 6.8 + 1e-3);
        assert!(accel_x > 0.0, "The old target should not collapse in one tick.");
        assert!(accel_y.abs() <= 6.8 + 1e-3);
        assert!(accel_y > 0.0);
    }

    /// Test that reset clears the position loop filters.
    #[test]
    fn test_position_reset_clears_position_filter() {
        let (_, mut state, mut position) = setup(NavigationMode::POSHOLD_2D);
        state.desired_state.pos = Vector3::new(400.0, 0.0, 0.0);
        let (vel_x, _) = update_velocity_target(&mut state, 300.0, 2.0, 0.02);
        assert!(vel_x > 0.0);

        position.reset(&mut state);
        state.desired_state.pos = state.actual_state.pos;
        assert_eq!((0.0, 0.0), update_velocity_target(&mut state, 300.0, 2.0, 0.02));
    }
}
