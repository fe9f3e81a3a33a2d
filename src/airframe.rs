// src/airframe.rs

//! # Airframe Dispatch
//!
//! The controllers that actually fly the vehicle differ between airframe
//! classes. [`NavigationControllers`] is the shared interface; [`Airframe`]
//! picks one implementation when the navigation core is built.

use crate::config::NavConfig;
use crate::fixed_wing::FixedWingControllers;
use crate::multicopter::MulticopterControllers;
use crate::rc::RcCommand;
use crate::state::NavigationState;

/// Airframe class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AirframeKind {
    /// Multirotor.
    Multicopter,
    /// Airplane.
    FixedWing,
}

/// A trait for airframe specific navigation controllers.
///
/// Every `apply_*` call runs one control tick. `reset_*` returns the
/// controller to its idle state and is called on mode entry.
pub trait NavigationControllers {
    /// Captures the hover throttle baseline.
    fn setup_altitude(&mut self, config: &NavConfig, rc: &RcCommand);

    /// Resets the altitude controller.
    fn reset_altitude(&mut self, state: &mut NavigationState);

    /// Runs the altitude controller, writing the throttle into `rc`.
    fn apply_altitude(
        &mut self,
        state: &mut NavigationState,
        config: &NavConfig,
        now: u32,
        rc: &mut RcCommand,
    );

    /// Resets the horizontal position controller.
    fn reset_position(&mut self, state: &mut NavigationState);

    /// Runs the horizontal position controller, writing roll and pitch into `rc`.
    fn apply_position(
        &mut self,
        state: &mut NavigationState,
        config: &NavConfig,
        now: u32,
        rc: &mut RcCommand,
    );

    /// Resets the heading controller.
    fn reset_heading(&mut self, state: &mut NavigationState);

    /// Runs the heading controller.
    fn apply_heading(&mut self, state: &mut NavigationState, config: &NavConfig, rc: &RcCommand);

    /// Yaw-hold target for the attitude controller, in degrees, if any.
    fn yaw_hold_target(&self) -> Option<i16>;

    /// Restarts the landing detector dwell.
    fn reset_landing_detector(&mut self, now: u32);

    /// Evaluates the landing detector.
    fn is_landing_detected(&mut self, state: &NavigationState, config: &NavConfig, now: u32) -> bool;

    /// Overrides `rc` with the emergency landing commands.
    fn apply_emergency_landing(&mut self, config: &NavConfig, rc: &mut RcCommand);
}

/// Airframe specific controllers, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Airframe {
    /// Multirotor controllers.
    Multicopter(MulticopterControllers),
    /// Airplane controllers.
    FixedWing(FixedWingControllers),
}

impl Airframe {
    /// Creates idle controllers for `kind`.
    pub fn new(kind: AirframeKind) -> Self {
        match kind {
            AirframeKind::Multicopter => Airframe::Multicopter(MulticopterControllers::new()),
            AirframeKind::FixedWing => Airframe::FixedWing(FixedWingControllers::new()),
        }
    }

    /// Airframe class.
    pub fn kind(&self) -> AirframeKind {
        match self {
            Airframe::Multicopter(_) => AirframeKind::Multicopter,
            Airframe::FixedWing(_) => AirframeKind::FixedWing,
        }
    }

    /// Fixed-wing controllers, if this is an airplane.
    pub fn fixed_wing(&self) -> Option<&FixedWingControllers> {
        match self {
            Airframe::FixedWing(controllers) => Some(controllers),
            Airframe::Multicopter(_) => None,
        }
    }

    /// Mutable fixed-wing controllers, if this is an airplane.
    pub fn fixed_wing_mut(&mut self) -> Option<&mut FixedWingControllers> {
        match self {
            Airframe::FixedWing(controllers) => Some(controllers),
            Airframe::Multicopter(_) => None,
        }
    }

    /// Multicopter controllers, if this is a multirotor.
    pub fn multicopter(&self) -> Option<&MulticopterControllers> {
        match self {
            Airframe::Multicopter(controllers) => Some(controllers),
            Airframe::FixedWing(_) => None,
        }
    }

    fn controllers(&mut self) -> &mut dyn NavigationControllers {
        match self {
            Airframe::Multicopter(controllers) => controllers,
            Airframe::FixedWing(controllers) => controllers,
        }
    }
}

impl NavigationControllers for Airframe {
    fn setup_altitude(&mut self, config: &NavConfig, rc: &RcCommand) {
        self.controllers().setup_altitude(config, rc);
    }

    fn reset_altitude(&mut self, state: &mut NavigationState) {
        self.controllers().reset_altitude(state);
    }

    fn apply_altitude(
        &mut self,
        state: &mut NavigationState,
        config: &NavConfig,
        now: u32,
        rc: &mut RcCommand,
    ) {
        self.controllers().apply_altitude(state, config, now, rc);
    }

    fn reset_position(&mut self, state: &mut NavigationState) {
        self.controllers().reset_position(state);
    }

    fn apply_position(
        &mut self,
        state: &mut NavigationState,
        config: &NavConfig,
        now: u32,
        rc: &mut RcCommand,
    ) {
        self.controllers().apply_position(state, config, now, rc);
    }

    fn reset_heading(&mut self, state: &mut NavigationState) {
        self.controllers().reset_heading(state);
    }

    fn apply_heading(&mut self, state: &mut NavigationState, config: &NavConfig, rc: &RcCommand) {
        self.controllers().apply_heading(state, config, rc);
    }

    fn yaw_hold_target(&self) -> Option<i16> {
        match self {
            Airframe::Multicopter(controllers) => controllers.yaw_hold_target(),
            Airframe::FixedWing(controllers) => controllers.yaw_hold_target(),
        }
    }

    fn reset_landing_detector(&mut self, now: u32) {
        self.controllers().reset_landing_detector(now);
    }

    fn is_landing_detected(&mut self, state: &NavigationState, config: &NavConfig, now: u32) -> bool {
        self.controllers().is_landing_detected(state, config, now)
    }

    fn apply_emergency_landing(&mut self, config: &NavConfig, rc: &mut RcCommand) {
        self.controllers().apply_emergency_landing(config, rc);
    }
}
