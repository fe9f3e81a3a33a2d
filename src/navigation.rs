// src/navigation.rs

//! # Navigation Core
//!
//! [`NavigationCore`] owns the shared navigation state, the configuration
//! and the airframe specific controllers. The caller pushes estimator data
//! between ticks and calls [`NavigationCore::update`] once per control loop
//! iteration.
//!
//! Every estimator push writes a state group and raises its new-data flag
//! together, so a controller never observes one without the other.
//!
//! Example Usage
//! ```
//! use free_flight_navigation::{AirframeKind, NavConfig, NavigationCore, NavigationMode, RcCommand};
//!
//! let mut nav = NavigationCore::with_config(AirframeKind::Multicopter, NavConfig::new());
//! let sticks = RcCommand::new(0, 0, 0, 1500);
//!
//! nav.set_mode(NavigationMode::ALTHOLD, 0, &sticks);
//! nav.update_vertical_estimate(1000.0, 0.0);
//! let output = nav.update(20_000, sticks);
//!
//! assert!(output.rc.throttle >= nav.config().min_throttle);
//! ```

use crate::airframe::{Airframe, AirframeKind, NavigationControllers};
use crate::config::NavConfig;
use crate::error::RthError;
use crate::fixed_wing::launch::LaunchOutput;
use crate::geo::{distance_and_bearing, wrap_36000, GeoLocation};
use crate::rc::RcCommand;
use crate::rth::RthState;
use crate::state::{
    HomeWaypoint, NavSetWaypointFlags, NavigationMode, NavigationState, RcAdjustment, Vector3,
};

/// Everything produced by one navigation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NavOutput {
    /// Commands for the attitude controller and mixer.
    pub rc: RcCommand,
    /// Per-axis corrections applied by the controllers.
    pub rc_adjustment: RcAdjustment,
    /// Yaw-hold target for the heading lock, in degrees.
    pub yaw_hold_target: Option<i16>,
    /// Current return-to-home phase.
    pub rth_state: RthState,
    /// Landing detector result.
    pub land_detected: bool,
    /// Launch side effects.
    pub launch: LaunchOutput,
}

/// Navigation controller context.
pub struct NavigationCore {
    config: NavConfig,
    state: NavigationState,
    airframe: Airframe,
    launch_mode: bool,
    land_detected: bool,
}

impl NavigationCore {
    /// Creates an idle core for `kind`.
    ///
    /// Out-of-range configuration fields are clamped into range.
    pub fn with_config(kind: AirframeKind, config: NavConfig) -> Self {
        let mut config = config;
        config.sanitize();
        NavigationCore {
            state: NavigationState::with_config(&config),
            config,
            airframe: Airframe::new(kind),
            launch_mode: false,
            land_detected: false,
        }
    }

    /// Replaces the configuration between ticks.
    ///
    /// Gains take effect on the next tick; controller state is kept.
    pub fn set_config(&mut self, config: NavConfig) {
        let mut config = config;
        config.sanitize();
        self.state.pids.set_gains(&config);
        self.config = config;
    }

    /// Active configuration.
    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Shared navigation state.
    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Airframe controllers.
    pub fn airframe(&self) -> &Airframe {
        &self.airframe
    }

    /// Active modes.
    pub fn mode(&self) -> NavigationMode {
        self.state.mode
    }

    /// Switches the active modes.
    ///
    /// Controllers whose group becomes active are reset, with their
    /// targets set to the current state; the hover throttle baseline is
    /// taken from `rc`. Activating return-to-home rewinds it to its first
    /// phase.
    pub fn set_mode(&mut self, mode: NavigationMode, now: u32, rc: &RcCommand) {
        let previous = self.state.mode;
        if previous == mode {
            return;
        }

        let was_alt_hold = self.state.should_apply_alt_hold();
        let was_position = self.state.should_apply_position_control();
        let was_heading = self.state.should_apply_heading_control();
        let was_rth = self.state.should_apply_rth();

        self.state.mode = mode;
        nav_info!("navigation mode {:?} -> {:?}", previous, mode);

        if self.state.should_apply_alt_hold() && !was_alt_hold {
            self.airframe.setup_altitude(&self.config, rc);
            self.airframe.reset_altitude(&mut self.state);
            self.state.desired_state.pos.z = self.state.actual_state.pos.z;
            self.state.flags.is_adjusting_altitude = false;
        }

        if self.state.should_apply_position_control() && !was_position {
            self.airframe.reset_position(&mut self.state);
            self.state.desired_state.pos.x = self.state.actual_state.pos.x;
            self.state.desired_state.pos.y = self.state.actual_state.pos.y;
            self.state.flags.is_adjusting_position = false;
        }

        if self.state.should_apply_heading_control() && !was_heading {
            self.state.desired_state.yaw = self.state.actual_state.yaw;
            self.airframe.reset_heading(&mut self.state);
            self.state.flags.is_adjusting_heading = false;
        }

        if self.state.should_apply_rth() && !was_rth {
            self.state.rth.restart();
        }

        self.airframe.reset_landing_detector(now);
        self.land_detected = false;
    }

    /// Pushes a horizontal position (cm) and velocity (cm/s) estimate.
    pub fn update_horizontal_estimate(&mut self, x: f32, y: f32, vel_x: f32, vel_y: f32) {
        let actual = &mut self.state.actual_state;
        actual.pos.x = x;
        actual.pos.y = y;
        actual.vel.x = vel_x;
        actual.vel.y = vel_y;
        self.update_home_distance();
        self.state.flags.horizontal_position.raise();
    }

    /// Pushes an altitude (cm) and climb rate (cm/s) estimate.
    pub fn update_vertical_estimate(&mut self, z: f32, vel_z: f32) {
        self.state.actual_state.pos.z = z;
        self.state.actual_state.vel.z = vel_z;
        self.state.flags.vertical_position.raise();
    }

    /// Pushes a heading estimate, in centidegrees.
    pub fn update_heading_estimate(&mut self, yaw: i32) {
        self.state.actual_state.set_yaw(wrap_36000(yaw));
        self.state.flags.heading.raise();
    }

    /// Pushes a rangefinder height above ground, in cm.
    pub fn update_surface_estimate(&mut self, surface: f32, valid: bool) {
        self.state.actual_state.surface = surface;
        self.state.flags.has_valid_surface_sensor = valid;
    }

    /// Pushes the body frame forward acceleration (cm/s²) and the cosine
    /// of the tilt from level.
    pub fn update_body_acceleration(&mut self, accel_forward: f32, cos_tilt: f32) {
        self.state.actual_state.accel_forward = accel_forward;
        self.state.actual_state.cos_tilt = cos_tilt;
    }

    /// Marks the horizontal position source usable or lost.
    pub fn set_position_sensor_valid(&mut self, valid: bool) {
        if self.state.flags.has_valid_position_sensor && !valid {
            nav_warn!("position sensor lost");
        }
        self.state.flags.has_valid_position_sensor = valid;
    }

    /// Pushes a GPS fix with its north and east velocity, in cm/s.
    ///
    /// The first fix becomes the origin of the local frame. Returns the
    /// fix in local coordinates.
    pub fn update_gps(&mut self, fix: GeoLocation, vel_north: f32, vel_east: f32) -> Option<Vector3> {
        self.state.gps_origin.set_once(fix);
        let local = self.state.gps_origin.to_local(&fix)?;
        self.state.flags.has_valid_position_sensor = true;
        self.update_horizontal_estimate(local.x, local.y, vel_north, vel_east);
        Some(local)
    }

    /// Pushes a barometer altitude (cm) and climb rate (cm/s).
    ///
    /// The first reading becomes the zero of the altitude estimate.
    pub fn update_baro(&mut self, altitude: f32, climb_rate: f32) {
        let offset = match self.state.baro_offset {
            Some(offset) => offset,
            None => {
                nav_info!("baro offset set: {} cm", altitude);
                self.state.baro_offset = Some(altitude);
                altitude
            }
        };
        self.update_vertical_estimate(altitude - offset, climb_rate);
    }

    /// Records the current position and heading as home.
    pub fn set_home(&mut self) {
        let actual = &self.state.actual_state;
        self.state.home = HomeWaypoint {
            pos: actual.pos,
            yaw: actual.yaw,
            valid: true,
        };
        nav_info!(
            "home set: x {} y {} z {}",
            actual.pos.x,
            actual.pos.y,
            actual.pos.z
        );
        self.update_home_distance();
    }

    /// Horizontal distance to home, in cm.
    pub fn home_distance(&self) -> f32 {
        self.state.home_distance
    }

    /// Bearing to home, in centidegrees.
    pub fn home_direction(&self) -> i32 {
        self.state.home_direction
    }

    /// Sets the parts of the target selected by `flags`.
    ///
    /// With [`NavSetWaypointFlags::BEARING`] the heading target points from
    /// the current position to `pos`, otherwise
    /// [`NavSetWaypointFlags::HEADING`] takes it from `yaw`.
    pub fn set_desired_position(&mut self, pos: Vector3, yaw: i32, flags: NavSetWaypointFlags) {
        let desired = &mut self.state.desired_state;
        if flags.contains(NavSetWaypointFlags::XY) {
            desired.pos.x = pos.x;
            desired.pos.y = pos.y;
        }
        if flags.contains(NavSetWaypointFlags::Z) {
            desired.pos.z = pos.z;
        }
        if flags.contains(NavSetWaypointFlags::BEARING) {
            let (_, bearing) = distance_and_bearing(&self.state.actual_state.pos, &pos);
            desired.yaw = bearing;
        } else if flags.contains(NavSetWaypointFlags::HEADING) {
            desired.yaw = wrap_36000(yaw);
        }
        nav_trace!("desired position set, yaw {}", desired.yaw);
    }

    /// Current return-to-home phase.
    pub fn rth_state(&self) -> RthState {
        self.state.rth.state()
    }

    /// Requests a return-to-home phase change.
    pub fn rth_transition(&mut self, to: RthState) -> Result<RthState, RthError> {
        if !self.state.should_apply_rth() {
            return Err(RthError::NotActive);
        }
        self.state.rth.transition_to(to)
    }

    /// Arms or disarms the fixed-wing launch sequence.
    ///
    /// Arming restarts the launch detector at `now`. Returns `false` when
    /// the airframe has no launch controller.
    pub fn set_launch_mode(&mut self, enabled: bool, now: u32) -> bool {
        let Some(fixed_wing) = self.airframe.fixed_wing_mut() else {
            nav_warn!("launch mode needs a fixed-wing airframe");
            return false;
        };
        if enabled && !self.launch_mode {
            fixed_wing.launch.reset(now);
            nav_info!("launch mode on");
        } else if !enabled && self.launch_mode {
            nav_info!("launch mode off");
        }
        self.launch_mode = enabled;
        true
    }

    /// Whether the launch sequence is armed.
    pub fn is_launch_mode(&self) -> bool {
        self.launch_mode
    }

    /// Whether a launch has been detected.
    pub fn is_launch_detected(&self) -> bool {
        self.airframe
            .fixed_wing()
            .map_or(false, |fixed_wing| fixed_wing.launch.is_detected())
    }

    /// Whether the launch is over, normally or by pilot abort.
    pub fn is_launch_finished(&self) -> bool {
        self.airframe
            .fixed_wing()
            .map_or(false, |fixed_wing| fixed_wing.launch.is_finished_or_aborted())
    }

    /// Landing detector result of the last tick.
    pub fn is_land_detected(&self) -> bool {
        self.land_detected
    }

    /// Runs one navigation tick on the pilot commands `rc`.
    pub fn update(&mut self, now: u32, rc: RcCommand) -> NavOutput {
        let mut rc = rc;

        if self.state.should_apply_alt_hold() {
            self.airframe
                .apply_altitude(&mut self.state, &self.config, now, &mut rc);
        }
        if self.state.should_apply_position_control() {
            self.airframe
                .apply_position(&mut self.state, &self.config, now, &mut rc);
        }
        if self.state.should_apply_heading_control() {
            self.airframe.apply_heading(&mut self.state, &self.config, &rc);
        }

        let launch = self.update_launch(now, &mut rc);
        self.land_detected = self
            .airframe
            .is_landing_detected(&self.state, &self.config, now);

        NavOutput {
            rc,
            rc_adjustment: self.state.rc_adjustment,
            yaw_hold_target: self.airframe.yaw_hold_target(),
            rth_state: self.state.rth.state(),
            land_detected: self.land_detected,
            launch,
        }
    }

    /// Returns the emergency landing commands for this airframe.
    pub fn emergency_landing(&mut self, rc: RcCommand) -> RcCommand {
        let mut rc = rc;
        self.airframe.apply_emergency_landing(&self.config, &mut rc);
        rc
    }

    fn update_launch(&mut self, now: u32, rc: &mut RcCommand) -> LaunchOutput {
        if !self.launch_mode {
            return LaunchOutput::default();
        }
        let Some(fixed_wing) = self.airframe.fixed_wing_mut() else {
            return LaunchOutput::default();
        };
        let launch = &mut fixed_wing.launch;

        if launch.is_finished_or_aborted() {
            nav_info!("launch mode off");
            self.launch_mode = false;
            return LaunchOutput::default();
        }

        let actual = &self.state.actual_state;
        let output = launch.apply(&self.config, actual.accel_forward, actual.cos_tilt, now, rc);
        if launch.is_detected() && !launch.is_enabled() {
            launch.enable(now);
        }
        output
    }

    fn update_home_distance(&mut self) {
        if self.state.home.valid {
            let (distance, direction) =
                distance_and_bearing(&self.state.actual_state.pos, &self.state.home.pos);
            self.state.home_distance = distance;
            self.state.home_direction = direction;
        }
    }
}
