// src/fixed_wing.rs

//! Fixed-wing navigation controllers.
//!
//! Only the launch sequence is handled here. Altitude, position and heading
//! control of a fixed-wing airframe belong to the attitude layer, so those
//! loops pass the pilot commands through unchanged, and the landing
//! detector never reports a landing.

pub mod launch;

use crate::airframe::NavigationControllers;
use crate::config::NavConfig;
use crate::rc::RcCommand;
use crate::state::NavigationState;
use launch::FixedWingLaunch;

/// The full set of fixed-wing controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedWingControllers {
    /// Launch detector and sequencer.
    pub launch: FixedWingLaunch,
}

impl FixedWingControllers {
    /// Creates idle controllers.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NavigationControllers for FixedWingControllers {
    fn setup_altitude(&mut self, _config: &NavConfig, _rc: &RcCommand) {}

    fn reset_altitude(&mut self, _state: &mut NavigationState) {}

    fn apply_altitude(
        &mut self,
        _state: &mut NavigationState,
        _config: &NavConfig,
        _now: u32,
        _rc: &mut RcCommand,
    ) {
    }

    fn reset_position(&mut self, _state: &mut NavigationState) {}

    fn apply_position(
        &mut self,
        _state: &mut NavigationState,
        _config: &NavConfig,
        _now: u32,
        _rc: &mut RcCommand,
    ) {
    }

    fn reset_heading(&mut self, _state: &mut NavigationState) {}

    fn apply_heading(&mut self, _state: &mut NavigationState, _config: &NavConfig, _rc: &RcCommand) {}

    fn yaw_hold_target(&self) -> Option<i16> {
        None
    }

    fn reset_landing_detector(&mut self, _now: u32) {}

    fn is_landing_detected(&mut self, _state: &NavigationState, _config: &NavConfig, _now: u32) -> bool {
        false
    }

    fn apply_emergency_landing(&mut self, config: &NavConfig, rc: &mut RcCommand) {
        rc.roll = 0;
        rc.pitch = 0;
        rc.yaw = 0;
        rc.throttle = config.min_throttle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NavigationMode;

    /// Test that the navigation loops leave the pilot commands alone.
    #[test]
    fn test_fixed_wing_passthrough() {
        let config = NavConfig::new();
        let mut state = NavigationState::with_config(&config);
        state.mode = NavigationMode::POSHOLD_3D;
        let mut controllers = FixedWingControllers::new();
        let mut rc = RcCommand::new(100, -200, 50, 1600);

        controllers.apply_altitude(&mut state, &config, 1000, &mut rc);
        controllers.apply_position(&mut state, &config, 1000, &mut rc);
        controllers.apply_heading(&mut state, &config, &rc);
        assert_eq!(RcCommand::new(100, -200, 50, 1600), rc);
        assert_eq!(None, controllers.yaw_hold_target());
        assert!(!controllers.is_landing_detected(&state, &config, 60_000_000));
    }

    /// Test that the emergency landing levels the wings at minimum throttle.
    #[test]
    fn test_fixed_wing_emergency_landing() {
        let config = NavConfig::new();
        let mut controllers = FixedWingControllers::new();
        let mut rc = RcCommand::new(100, -200, 50, 1600);
        controllers.apply_emergency_landing(&config, &mut rc);
        assert_eq!(RcCommand::new(0, 0, 0, config.min_throttle), rc);
    }
}
