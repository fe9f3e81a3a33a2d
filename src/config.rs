// src/config.rs

//! # Navigation Configuration
//!
//! Gains, limits and thresholds read by the navigation controllers. The
//! configuration is plain data: it is owned by the caller, handed to
//! [`crate::NavigationCore`] and may be replaced between ticks.
//!
//! Values outside their legal range are either rejected by
//! [`NavConfig::validate`] or clamped into range by [`NavConfig::sanitize`].

use crate::error::ConfigError;

/// Z velocity target hard limit, in cm/s.
pub const MAX_Z_VELOCITY_CMS: f32 = 300.0;

/// XY acceleration ceiling during position hold, in cm/s² (about 45° lean).
pub const NAV_ACCELERATION_XY_MAX: f32 = 980.0;

/// XY acceleration ceiling on waypoint and RTH legs, in cm/s² (about 29° lean).
pub const NAV_ACCEL_SLOW_XY_MAX: f32 = 550.0;

/// Maximum change of the XY acceleration target, in cm/s³.
pub const NAV_JERK_LIMIT_CMSSS: f32 = 1700.0;

/// Low-pass cut-off applied to the throttle adjustment, in Hz.
pub const NAV_THROTTLE_CUTOFF_FREQUENCY_HZ: f32 = 2.0;

/// Low-pass cut-off applied to the XY acceleration target, in Hz.
pub const NAV_ACCEL_CUTOFF_FREQUENCY_HZ: f32 = 2.0;

/// Standard gravity, in cm/s².
pub const GRAVITY_CMSS: f32 = 980.665;

/// Full stick deflection from centre.
pub const RC_COMMAND_RANGE: i16 = 500;

/// Gains for one PID controller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidConfig {
    /// Proportional gain.
    pub kp: f32,
    /// Integral gain.
    pub ki: f32,
    /// Derivative gain.
    pub kd: f32,
    /// Integrator bound, in output units.
    pub i_max: f32,
}

impl PidConfig {
    fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd, self.i_max]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Gains for the navigation controller bank.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NavPidConfig {
    /// XY position to velocity gain, in 1/s.
    pub pos_xy_kp: f32,
    /// Z position to velocity gain, in 1/s.
    pub pos_z_kp: f32,
    /// Heading error to yaw correction gain.
    pub heading_kp: f32,
    /// XY velocity to acceleration PID.
    pub vel_xy: PidConfig,
    /// Z velocity to throttle PID.
    pub vel_z: PidConfig,
    /// P-term filter cut-off of the position loops, in Hz. Zero disables it.
    pub pos_pterm_cutoff_hz: f32,
    /// P-term filter cut-off of the velocity loops, in Hz. Zero disables it.
    pub vel_pterm_cutoff_hz: f32,
    /// D-term filter cut-off of the velocity loops, in Hz. Zero disables it.
    pub dterm_cutoff_hz: f32,
}

impl Default for NavPidConfig {
    fn default() -> Self {
        Self {
            pos_xy_kp: 0.65,
            pos_z_kp: 1.0,
            heading_kp: 2.5,
            vel_xy: PidConfig {
                kp: 1.8,
                ki: 0.15,
                kd: 0.1,
                i_max: 200.0,
            },
            vel_z: PidConfig {
                kp: 2.0,
                ki: 0.5,
                kd: 0.05,
                i_max: 200.0,
            },
            pos_pterm_cutoff_hz: 0.0,
            vel_pterm_cutoff_hz: 4.0,
            dterm_cutoff_hz: 10.0,
        }
    }
}

/// How pilot sticks act while horizontal navigation is engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UserControlMode {
    /// Sticks command lean angles directly.
    GpsAtti,
    /// Sticks command a velocity that shifts the hold position.
    #[default]
    GpsCruise,
}

/// Fixed-wing launch parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FixedWingLaunchConfig {
    /// Forward acceleration that counts as a launch, in cm/s².
    pub accel_thresh: f32,
    /// Time the launch conditions must hold continuously, in ms.
    pub time_thresh_ms: u32,
    /// Throttle applied once the motor timer elapses.
    pub throttle: i16,
    /// Delay between detection and motor start, in ms.
    pub motor_timer_ms: u32,
    /// Launch is finished after this long, in ms.
    pub timeout_ms: u32,
    /// Nose-up pitch held during the launch, in degrees.
    pub climb_angle_deg: f32,
}

impl Default for FixedWingLaunchConfig {
    fn default() -> Self {
        Self {
            accel_thresh: 1863.0,
            time_thresh_ms: 40,
            throttle: 1700,
            motor_timer_ms: 500,
            timeout_ms: 5000,
            climb_angle_deg: 10.0,
        }
    }
}

/// Configuration for the navigation core.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NavConfig {
    /// Controller gains and filter cut-offs.
    pub pid: NavPidConfig,
    /// Throttle stick deadband around the hover baseline.
    pub alt_hold_deadband: i16,
    /// Roll, pitch and yaw stick deadband.
    pub pos_hold_deadband: i16,
    /// Climb rate at full throttle deflection, in cm/s.
    pub max_manual_climb_rate: f32,
    /// Speed at full roll or pitch deflection, in cm/s.
    pub max_manual_speed: f32,
    /// Horizontal speed limit of the position loop, in cm/s.
    pub max_speed: f32,
    /// Stick behaviour while horizontal navigation is engaged.
    pub user_control_mode: UserControlMode,
    /// Use `mid_rc` instead of the current stick as the hover baseline.
    pub use_midrc_for_althold: bool,
    /// Throttle stick centre.
    pub mid_rc: i16,
    /// Lowest throttle command.
    pub min_throttle: i16,
    /// Highest throttle command.
    pub max_throttle: i16,
    /// Lean angle at full stick, in decidegrees.
    pub max_angle_inclination: i16,
    /// Throttle held by the multicopter emergency landing.
    pub emergency_landing_throttle: i16,
    /// Quiet time before a landing is reported, in microseconds.
    pub land_detect_time_us: u32,
    /// Fixed-wing launch parameters.
    pub fw_launch: FixedWingLaunchConfig,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NavConfig {
    /// Creates a configuration with default values.
    ///
    /// The defaults are a starting point and should be tuned for the airframe.
    ///
    /// Example Usage
    /// ```
    /// use free_flight_navigation::config::{NavConfig, UserControlMode};
    ///
    /// let mut config = NavConfig::new();
    /// config.max_speed = 500.0;
    /// config.user_control_mode = UserControlMode::GpsAtti;
    /// config.pid.vel_xy.ki = 0.2;
    ///
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new() -> Self {
        Self {
            pid: NavPidConfig::default(),
            alt_hold_deadband: 50,
            pos_hold_deadband: 20,
            max_manual_climb_rate: 200.0,
            max_manual_speed: 500.0,
            max_speed: 300.0,
            user_control_mode: UserControlMode::GpsCruise,
            use_midrc_for_althold: false,
            mid_rc: 1500,
            min_throttle: 1150,
            max_throttle: 1850,
            max_angle_inclination: 300,
            emergency_landing_throttle: 1300,
            land_detect_time_us: 10_000_000,
            fw_launch: FixedWingLaunchConfig::default(),
        }
    }

    /// Checks every field against its legal range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pid = &self.pid;
        let rates_valid = [
            pid.pos_xy_kp,
            pid.pos_z_kp,
            pid.heading_kp,
            pid.pos_pterm_cutoff_hz,
            pid.vel_pterm_cutoff_hz,
            pid.dterm_cutoff_hz,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
        if !rates_valid || !pid.vel_xy.is_valid() || !pid.vel_z.is_valid() {
            return Err(ConfigError::InvalidGain);
        }

        if !(1000..=2000).contains(&self.min_throttle)
            || !(1000..=2000).contains(&self.max_throttle)
            || self.min_throttle >= self.max_throttle
        {
            return Err(ConfigError::ThrottleRange);
        }

        if !(0..=RC_COMMAND_RANGE).contains(&self.alt_hold_deadband)
            || !(0..=RC_COMMAND_RANGE).contains(&self.pos_hold_deadband)
        {
            return Err(ConfigError::Deadband);
        }

        let speeds_valid = [self.max_manual_climb_rate, self.max_manual_speed, self.max_speed]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0);
        if !speeds_valid {
            return Err(ConfigError::SpeedLimit);
        }

        if self.max_angle_inclination <= 0 {
            return Err(ConfigError::InclinationLimit);
        }

        let launch = &self.fw_launch;
        if !launch.accel_thresh.is_finite()
            || launch.accel_thresh <= 0.0
            || !launch.climb_angle_deg.is_finite()
            || !(0.0..=45.0).contains(&launch.climb_angle_deg)
            || launch.motor_timer_ms > launch.timeout_ms
        {
            return Err(ConfigError::LaunchParameter);
        }

        Ok(())
    }

    /// Clamps out-of-range fields into range and returns the number of
    /// fields that were changed.
    ///
    /// The result always passes [`NavConfig::validate`].
    pub fn sanitize(&mut self) -> usize {
        let defaults = Self::new();
        let mut changed = 0;

        let mut fix_rate = |value: &mut f32, fallback: f32| {
            if !value.is_finite() || *value < 0.0 {
                *value = fallback;
                changed += 1;
            }
        };
        fix_rate(&mut self.pid.pos_xy_kp, defaults.pid.pos_xy_kp);
        fix_rate(&mut self.pid.pos_z_kp, defaults.pid.pos_z_kp);
        fix_rate(&mut self.pid.heading_kp, defaults.pid.heading_kp);
        fix_rate(&mut self.pid.pos_pterm_cutoff_hz, 0.0);
        fix_rate(&mut self.pid.vel_pterm_cutoff_hz, 0.0);
        fix_rate(&mut self.pid.dterm_cutoff_hz, 0.0);
        for (pid, fallback) in [
            (&mut self.pid.vel_xy, defaults.pid.vel_xy),
            (&mut self.pid.vel_z, defaults.pid.vel_z),
        ] {
            fix_rate(&mut pid.kp, fallback.kp);
            fix_rate(&mut pid.ki, fallback.ki);
            fix_rate(&mut pid.kd, fallback.kd);
            fix_rate(&mut pid.i_max, fallback.i_max);
        }

        let mut fix_speed = |value: &mut f32, fallback: f32| {
            if !value.is_finite() || *value <= 0.0 {
                *value = fallback;
                changed += 1;
            }
        };
        fix_speed(&mut self.max_manual_climb_rate, defaults.max_manual_climb_rate);
        fix_speed(&mut self.max_manual_speed, defaults.max_manual_speed);
        fix_speed(&mut self.max_speed, defaults.max_speed);
        fix_speed(&mut self.fw_launch.accel_thresh, defaults.fw_launch.accel_thresh);

        let mut fix_i16 = |value: &mut i16, min: i16, max: i16| {
            let clamped = (*value).clamp(min, max);
            if clamped != *value {
                *value = clamped;
                changed += 1;
            }
        };
        fix_i16(&mut self.alt_hold_deadband, 0, RC_COMMAND_RANGE);
        fix_i16(&mut self.pos_hold_deadband, 0, RC_COMMAND_RANGE);
        fix_i16(&mut self.min_throttle, 1000, 1999);
        fix_i16(&mut self.max_throttle, self.min_throttle + 1, 2000);
        fix_i16(&mut self.max_angle_inclination, 1, 900);

        if !self.fw_launch.climb_angle_deg.is_finite() {
            self.fw_launch.climb_angle_deg = defaults.fw_launch.climb_angle_deg;
            changed += 1;
        } else if !(0.0..=45.0).contains(&self.fw_launch.climb_angle_deg) {
            self.fw_launch.climb_angle_deg = self.fw_launch.climb_angle_deg.clamp(0.0, 45.0);
            changed += 1;
        }
        if self.fw_launch.motor_timer_ms > self.fw_launch.timeout_ms {
            self.fw_launch.motor_timer_ms = self.fw_launch.timeout_ms;
            changed += 1;
        }

        if changed > 0 {
            nav_warn!("navigation config: {} fields clamped into range", changed);
        }
        changed
    }
}
