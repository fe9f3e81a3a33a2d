// src/error.rs

//! Error types.
//!
//! The control path never fails; these errors are only returned by
//! configuration and phase-transition requests made from outside a tick.

use crate::rth::RthState;

/// Errors from configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A gain, rate or limit is negative or not a finite number.
    InvalidGain,
    /// `min_throttle` is not below `max_throttle`, or either is outside 1000..=2000.
    ThrottleRange,
    /// A stick deadband is outside 0..=500.
    Deadband,
    /// A speed or climb rate limit is not positive.
    SpeedLimit,
    /// The maximum lean angle is not positive.
    InclinationLimit,
    /// A launch threshold, timer or angle is out of range.
    LaunchParameter,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::InvalidGain => write!(f, "invalid controller gain or filter cut-off"),
            ConfigError::ThrottleRange => write!(f, "invalid throttle range"),
            ConfigError::Deadband => write!(f, "stick deadband out of range"),
            ConfigError::SpeedLimit => write!(f, "speed limit must be positive"),
            ConfigError::InclinationLimit => write!(f, "maximum inclination must be positive"),
            ConfigError::LaunchParameter => write!(f, "launch parameter out of range"),
        }
    }
}

/// Errors from return-to-home phase requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RthError {
    /// Return-to-home mode is not active.
    NotActive,
    /// The requested phase does not directly follow the current one.
    InvalidTransition {
        /// Phase the machine is in.
        from: RthState,
        /// Phase that was requested.
        to: RthState,
    },
}

impl core::fmt::Display for RthError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RthError::NotActive => write!(f, "return-to-home is not active"),
            RthError::InvalidTransition { from, to } => {
                write!(f, "invalid return-to-home transition {:?} -> {:?}", from, to)
            }
        }
    }
}
