// src/timer.rs

//! # Timing Helpers
//!
//! Microsecond clock conversions and the rate-limited event timer used by
//! the navigation controllers. All clock arithmetic is done on `u32`
//! microseconds with wrapping subtraction, matching a free-running
//! `micros()` counter.

/// Rate at which position targets are refreshed from pilot input, in Hz.
pub const POSITION_TARGET_UPDATE_RATE_HZ: u32 = 5;

/// Navigation is not applied when position data arrives slower than this, in Hz.
pub const MIN_POSITION_UPDATE_RATE_HZ: u32 = 5;

/// Converts a frequency in Hz to a period in microseconds.
pub const fn hz_to_us(hz: u32) -> u32 {
    1_000_000 / hz
}

/// Converts milliseconds to microseconds.
pub const fn ms_to_us(ms: u32) -> u32 {
    ms.saturating_mul(1000)
}

/// Converts microseconds to seconds.
pub fn us_to_s(us: u32) -> f32 {
    us as f32 * 1e-6
}

/// Converts microseconds to milliseconds.
pub fn us_to_ms(us: u32) -> f32 {
    us as f32 * 1e-3
}

/// Elapsed microseconds between two readings of a wrapping clock.
pub fn elapsed_us(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Rate-limited event helper.
///
/// Fires at most once per interval and remembers when it last fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavigationTimer {
    last_fired: u32,
}

impl NavigationTimer {
    /// Creates a timer that last fired at `now`.
    pub fn new(now: u32) -> Self {
        Self { last_fired: now }
    }

    /// Returns `true` and rearms when `interval_us` has elapsed since the
    /// last firing.
    pub fn update(&mut self, interval_us: u32, now: u32) -> bool {
        if elapsed_us(now, self.last_fired) >= interval_us {
            self.last_fired = now;
            true
        } else {
            false
        }
    }

    /// Restarts the interval at `now` without firing.
    pub fn reset(&mut self, now: u32) {
        self.last_fired = now;
    }

    /// Timestamp of the last firing or reset.
    pub fn last_fired(&self) -> u32 {
        self.last_fired
    }
}
