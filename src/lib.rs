// src/lib.rs

//! # Flight Navigation Controller
//!
//! This crate provides a `no_std`, no-alloc navigation core for flight
//! controllers. It turns an externally fused vehicle state (position,
//! velocity and yaw) plus pilot or mission targets into attitude and
//! throttle commands.
//!
//! ## Overview
//!
//! The core is a set of cascaded controllers that share one
//! [`NavigationState`] record:
//!
//! - altitude hold (P position loop, PID velocity loop, throttle shaping),
//! - heading hold (P loop driving the yaw-hold target),
//! - horizontal position hold (P position loop, jerk limited PID velocity
//!   loop, acceleration to lean angle conversion),
//! - a multicopter landing detector,
//! - a fixed-wing launch detector and launch controller,
//! - the return-to-home phase machine that gates all of the above.
//!
//! Everything runs to completion inside a single control tick driven by
//! [`NavigationCore::update`]. New estimator data is delivered through
//! one-shot flags that each controller consumes exactly once.

#![no_std]
#![deny(missing_docs)]

#[macro_use]
mod log;

pub mod airframe;
pub mod config;
pub mod error;
pub mod filter;
pub mod fixed_wing;
pub mod geo;
pub mod multicopter;
pub mod navigation;
pub mod pid;
pub mod rc;
pub mod rth;
pub mod state;
pub mod timer;

#[doc(inline)]
pub use airframe::{Airframe, AirframeKind};
#[doc(inline)]
pub use config::NavConfig;
#[doc(inline)]
pub use error::{ConfigError, RthError};
#[doc(inline)]
pub use navigation::{NavOutput, NavigationCore};
#[doc(inline)]
pub use rc::RcCommand;
#[doc(inline)]
pub use rth::RthState;
#[doc(inline)]
pub use state::{NavigationMode, NavigationState};

#[cfg(test)]
mod test_utils;
