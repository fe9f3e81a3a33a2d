// src/multicopter.rs

//! Multicopter navigation controllers.

pub mod altitude;
pub mod heading;
pub mod landing;
pub mod position;

use crate::airframe::NavigationControllers;
use crate::config::NavConfig;
use crate::rc::RcCommand;
use crate::state::NavigationState;
use altitude::AltitudeController;
use heading::HeadingController;
use landing::LandingDetector;
use position::PositionController;

/// The full set of multicopter controllers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MulticopterControllers {
    /// Altitude hold.
    pub altitude: AltitudeController,
    /// Heading hold.
    pub heading: HeadingController,
    /// Horizontal position hold.
    pub position: PositionController,
    /// Landing detector.
    pub landing: LandingDetector,
}

impl MulticopterControllers {
    /// Creates idle controllers.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NavigationControllers for MulticopterControllers {
    fn setup_altitude(&mut self, config: &NavConfig, rc: &RcCommand) {
        self.altitude.setup(config, rc);
    }

    fn reset_altitude(&mut self, state: &mut NavigationState) {
        self.altitude.reset(state);
    }

    fn apply_altitude(
        &mut self,
        state: &mut NavigationState,
        config: &NavConfig,
        now: u32,
        rc: &mut RcCommand,
    ) {
        self.altitude.apply(state, config, now, rc);
    }

    fn reset_position(&mut self, state: &mut NavigationState) {
        self.position.reset(state);
    }

    fn apply_position(
        &mut self,
        state: &mut NavigationState,
        config: &NavConfig,
        now: u32,
        rc: &mut RcCommand,
    ) {
        self.position.apply(state, config, now, rc);
    }

    fn reset_heading(&mut self, state: &mut NavigationState) {
        self.heading.reset(state);
    }

    fn apply_heading(&mut self, state: &mut NavigationState, config: &NavConfig, rc: &RcCommand) {
        self.heading.apply(state, config, rc);
    }

    fn yaw_hold_target(&self) -> Option<i16> {
        Some(self.heading.yaw_hold_target())
    }

    fn reset_landing_detector(&mut self, now: u32) {
        self.landing.reset(now);
    }

    fn is_landing_detected(&mut self, state: &NavigationState, config: &NavConfig, now: u32) -> bool {
        self.landing
            .update(state, config, self.altitude.adjusted_throttle(), now)
    }

    fn apply_emergency_landing(&mut self, config: &NavConfig, rc: &mut RcCommand) {
        rc.roll = 0;
        rc.pitch = 0;
        rc.yaw = 0;
        rc.throttle = config.emergency_landing_throttle;
    }
}
