// src/test_utils.rs

//! This module contains utilities for testing.

use crate::state::Vector3;

/// A constant defining the tolerance within which floating-point values
/// are considered close enough to be equal.
pub const TEST_TOLERANCE: f32 = 1e-5;

/// Checks if two floating point numbers are close enough to be considered
/// equal.
///
/// # Arguments
/// * `target` - The target value.
/// * `value` - The value to compare against the target.
///
/// # Returns
/// `true` if the absolute difference between `target` and `value` is less than
/// `TEST_TOLERANCE`, otherwise `false`.
pub fn value_close(target: f32, value: f32) -> bool {
    (target - value).abs() < TEST_TOLERANCE
}

/// Checks if two floating point numbers are not close enough to be
/// considered equal.
pub fn value_not_close(target: f32, value: f32) -> bool {
    TEST_TOLERANCE <= (target - value).abs()
}

/// Checks if each component of a local-frame vector is within `tolerance`
/// of the target.
pub fn vector_close(target: Vector3, value: Vector3, tolerance: f32) -> bool {
    (target.x - value.x).abs() < tolerance
        && (target.y - value.y).abs() < tolerance
        && (target.z - value.z).abs() < tolerance
}

/// Microseconds in one 5 Hz control period.
pub const TICK_US: u32 = 200_000;

/// Microseconds in one 50 Hz loop iteration.
pub const FAST_TICK_US: u32 = 20_000;
