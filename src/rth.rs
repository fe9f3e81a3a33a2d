// src/rth.rs

//! # Return-To-Home Phase Machine
//!
//! Tracks which return-to-home phase is active. The decision *when* to move
//! on (altitude reached, home reached, landing detected) belongs to an
//! external planner; this machine only enforces that phases advance one
//! step at a time, in order, and exposes the predicates that gate the
//! altitude and heading controllers.

use crate::error::RthError;

/// Return-to-home phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RthState {
    /// Mode just engaged.
    #[default]
    Init,
    /// Climbing to the safe return altitude.
    ClimbToSafeAltitude,
    /// Flying toward home.
    HeadHome,
    /// Descending over home.
    HomeAutoland,
    /// On the ground, motors still armed.
    Landed,
    /// Sequence complete.
    Finished,
}

impl RthState {
    /// The phase that directly follows this one, if any.
    pub fn next(self) -> Option<RthState> {
        match self {
            RthState::Init => Some(RthState::ClimbToSafeAltitude),
            RthState::ClimbToSafeAltitude => Some(RthState::HeadHome),
            RthState::HeadHome => Some(RthState::HomeAutoland),
            RthState::HomeAutoland => Some(RthState::Landed),
            RthState::Landed => Some(RthState::Finished),
            RthState::Finished => None,
        }
    }
}

/// Forward-only return-to-home sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RthStateMachine {
    state: RthState,
}

impl RthStateMachine {
    /// Creates a sequencer in [`RthState::Init`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn state(&self) -> RthState {
        self.state
    }

    /// Rewinds to [`RthState::Init`], used when RTH mode is (re)activated.
    pub fn restart(&mut self) {
        if self.state != RthState::Init {
            nav_info!("rth: restart from {:?}", self.state);
        }
        self.state = RthState::Init;
    }

    /// Moves to `to` if it directly follows the current phase.
    ///
    /// Requesting the current phase is accepted and changes nothing. Any
    /// other request is rejected and leaves the phase unchanged.
    pub fn transition_to(&mut self, to: RthState) -> Result<RthState, RthError> {
        if to == self.state {
            return Ok(self.state);
        }
        if self.state.next() == Some(to) {
            nav_info!("rth: {:?} -> {:?}", self.state, to);
            self.state = to;
            Ok(to)
        } else {
            nav_warn!("rth: rejected {:?} -> {:?}", self.state, to);
            Err(RthError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }

    /// Moves to the following phase, if any, and returns the new phase.
    pub fn advance(&mut self) -> RthState {
        if let Some(next) = self.state.next() {
            nav_info!("rth: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
        self.state
    }

    /// Continuous bearing-to-home applies only while heading home.
    pub fn should_keep_heading_to_home(&self) -> bool {
        self.state == RthState::HeadHome
    }

    /// The tiered autonomous descent applies from autoland onward.
    pub fn should_apply_autonomous_descent(&self) -> bool {
        matches!(
            self.state,
            RthState::HomeAutoland | RthState::Landed | RthState::Finished
        )
    }
}
