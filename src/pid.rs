// src/pid.rs

//! # PID Control Module
//!
//! This module provides the controller primitives used by the navigation
//! loops: a proportional controller mapping position error to a velocity
//! target, and a PID controller mapping velocity error to an acceleration
//! or throttle command within caller supplied bounds.

pub mod position;
pub use position::*;
pub mod velocity;
pub use velocity::*;
