// src/multicopter/landing.rs

//! Multicopter landing detector.
//!
//! Landed means no vertical or horizontal movement and low throttle, held
//! without interruption for the configured dwell time while the autonomous
//! landing is in control. Any violating tick restarts the dwell.

use crate::config::NavConfig;
use crate::state::NavigationState;
use crate::timer::elapsed_us;
use libm::sqrtf;

/// Vertical speed at or above which the vehicle is still moving, in cm/s.
pub const LAND_DETECTOR_MAX_CLIMB_RATE: f32 = 25.0;

/// Horizontal speed at or above which the vehicle is still moving, in cm/s.
pub const LAND_DETECTOR_MAX_SPEED: f32 = 100.0;

/// Share of the throttle range counted as minimal thrust.
pub const LAND_DETECTOR_THROTTLE_SHARE: f32 = 0.25;

/// Landing detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LandingDetector {
    landing_timer: u32,
    detected: bool,
}

impl LandingDetector {
    /// Creates a detector whose dwell starts at `now`.
    pub fn new(now: u32) -> Self {
        Self {
            landing_timer: now,
            detected: false,
        }
    }

    /// Restarts the dwell at `now`.
    pub fn reset(&mut self, now: u32) {
        self.landing_timer = now;
        self.detected = false;
    }

    /// Start of the current quiet interval.
    pub fn landing_timer(&self) -> u32 {
        self.landing_timer
    }

    /// Evaluates one tick and reports whether the vehicle has landed.
    ///
    /// `adjusted_throttle` is the throttle the altitude controller last
    /// commanded, not the raw stick.
    pub fn update(
        &mut self,
        state: &NavigationState,
        config: &NavConfig,
        adjusted_throttle: i16,
        now: u32,
    ) -> bool {
        let vel = &state.actual_state.vel;
        let vertical_movement = vel.z.abs() >= LAND_DETECTOR_MAX_CLIMB_RATE;
        let horizontal_movement = sqrtf(vel.x * vel.x + vel.y * vel.y) >= LAND_DETECTOR_MAX_SPEED;

        let throttle_span = (config.max_throttle - config.min_throttle) as f32;
        let minimal_thrust = adjusted_throttle as f32
            <= config.min_throttle as f32 + throttle_span * LAND_DETECTOR_THROTTLE_SHARE;

        let landed = if !minimal_thrust
            || !state.should_apply_rth_altitude_logic()
            || !state.should_apply_alt_hold()
            || vertical_movement
            || horizontal_movement
        {
            self.landing_timer = now;
            false
        } else {
            elapsed_us(now, self.landing_timer) > config.land_detect_time_us
        };

        if landed && !self.detected {
            nav_info!("landing detected");
        }
        self.detected = landed;
        landed
    }
}
