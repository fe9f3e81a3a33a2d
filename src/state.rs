// src/state.rs

//! # Shared Navigation State
//!
//! The single record read and written by every navigation controller:
//! active modes, one-shot new-data flags, the controller bank, estimated
//! and desired state, reference geodesy and the per-axis adjustments
//! handed to the mixer.
//!
//! The estimated state is written only through the estimator methods on
//! [`crate::NavigationCore`], which update a state group and raise its flag
//! in the same call so a controller never sees one without the other.

use crate::config::NavConfig;
use crate::geo::GpsOrigin;
use crate::pid::{NavPid, PController};
use crate::rth::RthStateMachine;
use bitflags::bitflags;
use libm::{cosf, sinf};

bitflags! {
    /// Active navigation modes. Several may be set at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NavigationMode: u8 {
        /// Horizontal position hold.
        const POSHOLD_2D = 1 << 0;
        /// Horizontal position and altitude hold.
        const POSHOLD_3D = 1 << 1;
        /// Altitude hold.
        const ALTHOLD = 1 << 2;
        /// Waypoint navigation.
        const WP = 1 << 3;
        /// Return to home with altitude control.
        const RTH = 1 << 4;
        /// Return to home without altitude control.
        const RTH_2D = 1 << 5;
    }
}

bitflags! {
    /// Which parts of a waypoint [`crate::NavigationCore::set_desired_position`] applies.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NavSetWaypointFlags: u8 {
        /// Horizontal position.
        const XY = 1 << 0;
        /// Altitude.
        const Z = 1 << 1;
        /// Heading taken from the supplied yaw.
        const HEADING = 1 << 2;
        /// Heading pointed along the bearing to the new position.
        const BEARING = 1 << 3;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NavigationMode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "NavigationMode({=u8:#x})", self.bits())
    }
}

/// Cartesian vector in the local north-east-up frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector3 {
    /// North component.
    pub x: f32,
    /// East component.
    pub y: f32,
    /// Up component.
    pub z: f32,
}

impl Vector3 {
    /// Creates a vector from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One-shot marker for unconsumed estimator data.
///
/// Behaves as a single-reader queue of length one with overwrite: the
/// producer raises it any number of times, the consumer takes it once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NewDataFlag {
    pending: bool,
}

impl NewDataFlag {
    /// Marks new data as available.
    pub fn raise(&mut self) {
        self.pending = true;
    }

    /// Returns `true` exactly once per raise and clears the flag.
    pub fn take(&mut self) -> bool {
        core::mem::replace(&mut self.pending, false)
    }

    /// Whether data is waiting, without consuming it.
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// New-data flags and pilot interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationFlags {
    /// New vertical position estimate.
    pub vertical_position: NewDataFlag,
    /// New horizontal position estimate.
    pub horizontal_position: NewDataFlag,
    /// New heading estimate.
    pub heading: NewDataFlag,
    /// Pilot is moving the altitude target.
    pub is_adjusting_altitude: bool,
    /// Pilot is moving the position target or commanding lean angles.
    pub is_adjusting_position: bool,
    /// Pilot is moving the heading target.
    pub is_adjusting_heading: bool,
    /// A usable horizontal position source is available.
    pub has_valid_position_sensor: bool,
    /// The surface (rangefinder) reading is usable.
    pub has_valid_surface_sensor: bool,
}

/// Estimated vehicle state, written only by the estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedState {
    /// Position relative to the GPS origin, in cm.
    pub pos: Vector3,
    /// Earth frame velocity, in cm/s.
    pub vel: Vector3,
    /// Heading, in centidegrees.
    pub yaw: i32,
    /// Cached `sin(yaw)`.
    pub sin_yaw: f32,
    /// Cached `cos(yaw)`.
    pub cos_yaw: f32,
    /// Height above ground from the rangefinder, in cm. Non-positive when unknown.
    pub surface: f32,
    /// Body frame forward acceleration, in cm/s².
    pub accel_forward: f32,
    /// Cosine of the tilt angle from level.
    pub cos_tilt: f32,
}

impl Default for EstimatedState {
    fn default() -> Self {
        Self {
            pos: Vector3::default(),
            vel: Vector3::default(),
            yaw: 0,
            sin_yaw: 0.0,
            cos_yaw: 1.0,
            surface: -1.0,
            accel_forward: 0.0,
            cos_tilt: 1.0,
        }
    }
}

impl EstimatedState {
    /// Sets the heading and refreshes the sine and cosine cache.
    pub fn set_yaw(&mut self, yaw: i32) {
        let yaw_rad = (yaw as f32 / 100.0).to_radians();
        self.yaw = yaw;
        self.sin_yaw = sinf(yaw_rad);
        self.cos_yaw = cosf(yaw_rad);
    }
}

/// Target state, written by the controllers or an external planner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DesiredState {
    /// Position target relative to the GPS origin, in cm.
    pub pos: Vector3,
    /// Velocity target, in cm/s.
    pub vel: Vector3,
    /// Acceleration target, in cm/s².
    pub acc: Vector3,
    /// Heading target, in centidegrees.
    pub yaw: i32,
    /// Height above ground target, in cm. Non-positive disables surface tracking.
    pub surface: f32,
}

/// Per-axis corrections produced by the controllers.
///
/// Roll and pitch are lean angles in decidegrees, yaw is a heading
/// correction and throttle is an offset from the hover baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RcAdjustment {
    /// Roll lean angle, in decidegrees.
    pub roll: i16,
    /// Pitch lean angle, in decidegrees.
    pub pitch: i16,
    /// Yaw correction.
    pub yaw: i16,
    /// Throttle offset.
    pub throttle: i16,
}

/// Home point in the local frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HomeWaypoint {
    /// Home position, in cm.
    pub pos: Vector3,
    /// Heading at the time home was set, in centidegrees.
    pub yaw: i32,
    /// Whether home has been recorded.
    pub valid: bool,
}

/// Bank of navigation controllers.
pub struct NavigationPidControllers {
    /// Position to velocity loops for X, Y and Z.
    pub pos: [PController; 3],
    /// Velocity to acceleration (X, Y) and throttle (Z) loops.
    pub vel: [NavPid; 3],
    /// Heading loop.
    pub heading: PController,
}

impl NavigationPidControllers {
    /// Builds the bank from the configured gains.
    pub fn with_config(config: &NavConfig) -> Self {
        let pid = &config.pid;
        Self {
            pos: [
                PController::new(pid.pos_xy_kp),
                PController::new(pid.pos_xy_kp),
                PController::new(pid.pos_z_kp),
            ],
            vel: [
                NavPid::with_config(pid.vel_xy),
                NavPid::with_config(pid.vel_xy),
                NavPid::with_config(pid.vel_z),
            ],
            heading: PController::new(pid.heading_kp),
        }
    }

    /// Applies new gains without touching integrators or filters.
    pub fn set_gains(&mut self, config: &NavConfig) {
        let pid = &config.pid;
        self.pos[X].kp = pid.pos_xy_kp;
        self.pos[Y].kp = pid.pos_xy_kp;
        self.pos[Z].kp = pid.pos_z_kp;
        self.vel[X].set_gains(pid.vel_xy);
        self.vel[Y].set_gains(pid.vel_xy);
        self.vel[Z].set_gains(pid.vel_z);
        self.heading.kp = pid.heading_kp;
    }
}

/// Index of the north axis.
pub const X: usize = 0;
/// Index of the east axis.
pub const Y: usize = 1;
/// Index of the up axis.
pub const Z: usize = 2;

/// Shared navigation record.
pub struct NavigationState {
    /// Active modes.
    pub mode: NavigationMode,
    /// New-data and interaction flags.
    pub flags: NavigationFlags,
    /// Controller bank.
    pub pids: NavigationPidControllers,
    /// Estimated state.
    pub actual_state: EstimatedState,
    /// Target state.
    pub desired_state: DesiredState,
    /// Per-axis corrections for the mixer.
    pub rc_adjustment: RcAdjustment,
    /// Origin of the local frame.
    pub gps_origin: GpsOrigin,
    /// Barometer altitude at start-up, in cm.
    pub baro_offset: Option<f32>,
    /// Home point.
    pub home: HomeWaypoint,
    /// Horizontal distance to home, in cm.
    pub home_distance: f32,
    /// Bearing to home, in centidegrees.
    pub home_direction: i32,
    /// Return-to-home phase.
    pub rth: RthStateMachine,
}

impl NavigationState {
    /// Creates an idle state with the controller bank built from `config`.
    pub fn with_config(config: &NavConfig) -> Self {
        Self {
            mode: NavigationMode::empty(),
            flags: NavigationFlags::default(),
            pids: NavigationPidControllers::with_config(config),
            actual_state: EstimatedState::default(),
            desired_state: DesiredState::default(),
            rc_adjustment: RcAdjustment::default(),
            gps_origin: GpsOrigin::default(),
            baro_offset: None,
            home: HomeWaypoint::default(),
            home_distance: 0.0,
            home_direction: 0,
            rth: RthStateMachine::new(),
        }
    }

    /// Position hold logic applies.
    pub fn should_apply_pos_hold(&self) -> bool {
        self.mode
            .intersects(NavigationMode::POSHOLD_2D | NavigationMode::POSHOLD_3D)
    }

    /// Waypoint logic applies.
    pub fn should_apply_waypoint(&self) -> bool {
        self.mode.contains(NavigationMode::WP)
    }

    /// Return-to-home logic applies.
    pub fn should_apply_rth(&self) -> bool {
        self.mode
            .intersects(NavigationMode::RTH | NavigationMode::RTH_2D)
    }

    /// The altitude controller applies.
    pub fn should_apply_alt_hold(&self) -> bool {
        self.mode.intersects(
            NavigationMode::ALTHOLD
                | NavigationMode::POSHOLD_3D
                | NavigationMode::WP
                | NavigationMode::RTH,
        )
    }

    /// The horizontal position controller applies.
    pub fn should_apply_position_control(&self) -> bool {
        self.should_apply_pos_hold() || self.should_apply_waypoint() || self.should_apply_rth()
    }

    /// The tiered autonomous descent applies.
    pub fn should_apply_rth_altitude_logic(&self) -> bool {
        self.mode.contains(NavigationMode::RTH) && self.rth.should_apply_autonomous_descent()
    }

    /// The heading controller applies.
    pub fn should_apply_heading_control(&self) -> bool {
        self.mode.intersects(
            NavigationMode::POSHOLD_2D
                | NavigationMode::POSHOLD_3D
                | NavigationMode::WP
                | NavigationMode::RTH
                | NavigationMode::RTH_2D,
        )
    }

    /// Heading should continuously track the bearing to the target.
    pub fn should_keep_heading_to_bearing(&self) -> bool {
        self.should_apply_waypoint()
            || (self.should_apply_rth() && self.rth.should_keep_heading_to_home())
    }

    /// The pilot may move the altitude target.
    pub fn can_adjust_altitude_from_rc(&self) -> bool {
        self.mode.intersects(
            NavigationMode::ALTHOLD | NavigationMode::POSHOLD_3D | NavigationMode::RTH,
        )
    }

    /// The pilot may move the position target or command lean angles.
    pub fn can_adjust_horizontal_from_rc(&self) -> bool {
        self.mode.intersects(
            NavigationMode::POSHOLD_2D
                | NavigationMode::POSHOLD_3D
                | NavigationMode::RTH
                | NavigationMode::RTH_2D,
        )
    }

    /// The pilot may move the heading target.
    pub fn can_adjust_heading_from_rc(&self) -> bool {
        self.can_adjust_horizontal_from_rc()
    }

    /// Moves the altitude target so the Z position loop yields `climb_rate`.
    pub fn update_altitude_target_from_climb_rate(&mut self, climb_rate: f32) {
        self.desired_state.pos.z =
            self.actual_state.pos.z + self.pids.pos[Z].error_for_output(climb_rate);
    }
}
