// src/multicopter/heading.rs

//! Multicopter heading hold.
//!
//! The attitude controller owns the actual heading lock; this controller
//! only maintains the yaw-hold target it locks onto, plus a proportional
//! yaw correction reported in the per-axis adjustments.

use crate::config::{NavConfig, RC_COMMAND_RANGE};
use crate::geo::wrap_18000;
use crate::rc::{apply_deadband, RcCommand};
use crate::state::NavigationState;

/// Heading hold controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadingController {
    yaw_hold_target: i16,
}

impl HeadingController {
    /// Creates a controller holding north.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the hold target onto the current heading.
    pub fn reset(&mut self, state: &mut NavigationState) {
        state.pids.heading.reset();
        self.yaw_hold_target = centidegrees_to_degrees(state.actual_state.yaw);
        state.rc_adjustment.yaw = 0;
    }

    /// Yaw-hold target for the attitude controller, in whole degrees.
    pub fn yaw_hold_target(&self) -> i16 {
        self.yaw_hold_target
    }

    /// Runs one control tick.
    pub fn apply(&mut self, state: &mut NavigationState, config: &NavConfig, rc: &RcCommand) {
        if state.flags.heading.take() {
            adjust_heading_from_rc(state, config, rc);
        }

        let error_deg =
            wrap_18000(state.desired_state.yaw - state.actual_state.yaw) as f32 / 100.0;
        let range = RC_COMMAND_RANGE as f32;
        state.rc_adjustment.yaw = state.pids.heading.apply(error_deg).clamp(-range, range) as i16;

        self.yaw_hold_target = centidegrees_to_degrees(state.desired_state.yaw);
    }
}

fn adjust_heading_from_rc(state: &mut NavigationState, config: &NavConfig, rc: &RcCommand) {
    if !state.can_adjust_heading_from_rc() {
        state.flags.is_adjusting_heading = false;
        return;
    }

    let yaw_adjustment = apply_deadband(rc.yaw as i32, config.pos_hold_deadband as i32);
    // During RTH the heading points home, only position hold lets the pilot turn
    if yaw_adjustment != 0 && state.should_apply_pos_hold() {
        state.desired_state.yaw = state.actual_state.yaw;
        state.flags.is_adjusting_heading = true;
    } else {
        state.flags.is_adjusting_heading = false;
    }
}

fn centidegrees_to_degrees(centidegrees: i32) -> i16 {
    (centidegrees / 100) as i16
}
