// src/rc.rs

//! Pilot stick commands and the conversions between stick deflection and
//! lean angle.

use crate::config::RC_COMMAND_RANGE;

/// Stick-equivalent command for the four control axes.
///
/// Roll, pitch and yaw are deflections of ±500 around centre. Throttle is
/// an absolute value in 1000..=2000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RcCommand {
    /// Roll deflection.
    pub roll: i16,
    /// Pitch deflection.
    pub pitch: i16,
    /// Yaw deflection.
    pub yaw: i16,
    /// Absolute throttle.
    pub throttle: i16,
}

impl Default for RcCommand {
    fn default() -> Self {
        Self {
            roll: 0,
            pitch: 0,
            yaw: 0,
            throttle: 1000,
        }
    }
}

impl RcCommand {
    /// Creates a command from its four axes.
    pub const fn new(roll: i16, pitch: i16, yaw: i16, throttle: i16) -> Self {
        Self {
            roll,
            pitch,
            yaw,
            throttle,
        }
    }
}

/// Zeroes `value` inside `±deadband` and shifts it toward zero outside.
pub fn apply_deadband(value: i32, deadband: i32) -> i32 {
    if value.abs() < deadband {
        0
    } else if value > 0 {
        value - deadband
    } else {
        value + deadband
    }
}

/// Converts a stick deflection to a lean angle in decidegrees.
pub fn rc_command_to_lean_angle(rc_command: i16, max_inclination: i16) -> i16 {
    let angle = rc_command as i32 * max_inclination as i32 / RC_COMMAND_RANGE as i32;
    angle.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Converts a lean angle in decidegrees to a stick deflection, clamped to ±500.
pub fn lean_angle_to_rc_command(lean_angle: i16, max_inclination: i16) -> i16 {
    if max_inclination <= 0 {
        return 0;
    }
    let command = lean_angle as i32 * RC_COMMAND_RANGE as i32 / max_inclination as i32;
    command.clamp(-(RC_COMMAND_RANGE as i32), RC_COMMAND_RANGE as i32) as i16
}
