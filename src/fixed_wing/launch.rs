// src/fixed_wing/launch.rs

//! # Fixed-Wing Launch Controller
//!
//! Detects a hand or catapult launch from sustained forward acceleration
//! with the airframe near level, then flies the launch: controls locked to
//! a fixed nose-up climb with the motor held at idle until the motor timer
//! elapses and launch throttle afterwards. The pilot finishes the launch by
//! moving roll or pitch beyond the deadband; the launch timeout finishes
//! it otherwise.

use crate::config::NavConfig;
use crate::rc::{lean_angle_to_rc_command, RcCommand};
use crate::timer::{elapsed_us, ms_to_us, us_to_ms};

/// Cosine of the largest tilt at which a launch is accepted (45°).
pub const COS_MAX_LAUNCH_ANGLE: f32 = 0.707_106_78;

/// Progress of the launch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LaunchPhase {
    /// Waiting for the launch to be detected.
    #[default]
    WaitingForLaunch,
    /// Launch detected, motor not yet running.
    MotorPending,
    /// Launch throttle applied.
    ThrottleEngaged,
    /// Launch complete or aborted.
    Finished,
}

/// Launch side effects handed to the external collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LaunchOutput {
    /// Mixer should keep the motor stopped or idling.
    pub motor_stop_or_idle: bool,
    /// Attitude controller should clear its integrators.
    pub reset_pid_integrators: bool,
    /// Launch beeper should sound.
    pub beeper: bool,
}

/// Launch detector and sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedWingLaunch {
    detector_previous_update: u32,
    detection_time_accum: u32,
    detected: bool,
    started_time: u32,
    finished: bool,
    motor_control_allowed: bool,
    throttle_engaged: bool,
}

impl FixedWingLaunch {
    /// Creates a launch waiting for detection from `now`.
    pub fn new(now: u32) -> Self {
        let mut launch = Self::default();
        launch.reset(now);
        launch
    }

    /// Returns to waiting for a launch.
    pub fn reset(&mut self, now: u32) {
        *self = Self {
            detector_previous_update: now,
            ..Self::default()
        };
    }

    /// Allows motor control and starts the launch clock.
    pub fn enable(&mut self, now: u32) {
        self.started_time = now;
        self.motor_control_allowed = true;
    }

    /// Whether motor control has been enabled.
    pub fn is_enabled(&self) -> bool {
        self.motor_control_allowed
    }

    /// Whether the launch has been detected.
    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Whether the launch is over, normally or by pilot abort.
    pub fn is_finished_or_aborted(&self) -> bool {
        self.finished
    }

    /// Qualifying time accumulated by the detector, in microseconds.
    pub fn detection_time_accum(&self) -> u32 {
        self.detection_time_accum
    }

    /// Current phase of the sequence.
    pub fn phase(&self) -> LaunchPhase {
        if self.finished {
            LaunchPhase::Finished
        } else if !self.detected {
            LaunchPhase::WaitingForLaunch
        } else if self.throttle_engaged {
            LaunchPhase::ThrottleEngaged
        } else {
            LaunchPhase::MotorPending
        }
    }

    /// Feeds one sample to the launch detector.
    ///
    /// `accel_forward` is the body frame forward acceleration in cm/s² and
    /// `cos_tilt` the cosine of the tilt from level.
    pub fn update_detector(&mut self, config: &NavConfig, accel_forward: f32, cos_tilt: f32, now: u32) {
        let accelerating = accel_forward > config.fw_launch.accel_thresh;
        let almost_level = cos_tilt >= COS_MAX_LAUNCH_ANGLE;

        if accelerating && almost_level {
            self.detection_time_accum = self
                .detection_time_accum
                .saturating_add(elapsed_us(now, self.detector_previous_update));
            self.detector_previous_update = now;
            if !self.detected
                && self.detection_time_accum >= ms_to_us(config.fw_launch.time_thresh_ms)
            {
                nav_info!("launch detected after {} us", self.detection_time_accum);
                self.detected = true;
            }
        } else {
            self.detector_previous_update = now;
            self.detection_time_accum = 0;
        }
    }

    /// Runs one tick of the launch and overrides `rc`.
    pub fn apply(
        &mut self,
        config: &NavConfig,
        accel_forward: f32,
        cos_tilt: f32,
        now: u32,
        rc: &mut RcCommand,
    ) -> LaunchOutput {
        let mut output = LaunchOutput::default();
        let launch = &config.fw_launch;

        if self.detected {
            let elapsed_ms = us_to_ms(elapsed_us(now, self.started_time));

            let deadband = config.pos_hold_deadband;
            if !self.finished
                && (rc.roll.saturating_abs() > deadband || rc.pitch.saturating_abs() > deadband)
            {
                nav_info!("launch aborted by pilot");
                self.finished = true;
            }

            if self.motor_control_allowed {
                if !self.finished && elapsed_ms >= launch.timeout_ms as f32 {
                    nav_info!("launch finished after {} ms", launch.timeout_ms);
                    self.finished = true;
                }

                if elapsed_ms >= launch.motor_timer_ms as f32 {
                    self.throttle_engaged = true;
                    rc.throttle = launch.throttle;
                } else {
                    output.reset_pid_integrators = true;
                    output.motor_stop_or_idle = true;
                    rc.throttle = config.min_throttle;
                }
            }
        } else {
            self.update_detector(config, accel_forward, cos_tilt, now);
            output.reset_pid_integrators = true;
            output.motor_stop_or_idle = true;
            rc.throttle = config.min_throttle;
        }

        output.beeper = !self.finished;

        let climb_angle = -(launch.climb_angle_deg * 10.0) as i16;
        rc.roll = 0;
        rc.pitch = lean_angle_to_rc_command(climb_angle, config.max_angle_inclination);
        rc.yaw = 0;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u32 = 1_000;

    fn detect(launch: &mut FixedWingLaunch, config: &NavConfig, start: u32) -> u32 {
        let mut now = start;
        while !launch.is_detected() {
            now += MS;
            launch.update_detector(config, 2000.0, 1.0, now);
        }
        now
    }

    /// Test that detection needs the full threshold of qualifying time.
    #[test]
    fn test_launch_detected_at_threshold() {
        let config = NavConfig::new();
        let mut launch = FixedWingLaunch::new(0);
        for ms in 1..40 {
            launch.update_detector(&config, 2000.0, 1.0, ms * MS);
            assert!(!launch.is_detected());
        }
        launch.update_detector(&config, 2000.0, 1.0, 40 * MS);
        assert!(launch.is_detected());
        assert_eq!(LaunchPhase::MotorPending, launch.phase());
    }

    /// Test that a failing condition zeroes the accumulator at once.
    #[test]
    fn test_launch_accumulator_resets() {
        let config = NavConfig::new();
        let mut launch = FixedWingLaunch::new(0);
        for ms in 1..30 {
            launch.update_detector(&config, 2000.0, 1.0, ms * MS);
        }
        assert_eq!(29 * MS, launch.detection_time_accum());

        // Too steep
        launch.update_detector(&config, 2000.0, 0.5, 30 * MS);
        assert_eq!(0, launch.detection_time_accum());

        for ms in 31..60 {
            launch.update_detector(&config, 2000.0, 1.0, ms * MS);
        }
        // Too slow
        launch.update_detector(&config, 1000.0, 1.0, 60 * MS);
        assert_eq!(0, launch.detection_time_accum());
        assert!(!launch.is_detected());
    }

    /// Test the controls while waiting for the launch.
    #[test]
    fn test_launch_waiting_locks_controls() {
        let config = NavConfig::new();
        let mut launch = FixedWingLaunch::new(0);
        let mut rc = RcCommand::new(100, 100, 100, 1800);
        let output = launch.apply(&config, 0.0, 1.0, MS, &mut rc);
        assert!(output.motor_stop_or_idle);
        assert!(output.reset_pid_integrators);
        assert!(output.beeper);
        // 10 degrees nose up at a 30 degree limit
        assert_eq!(RcCommand::new(0, -166, 0, config.min_throttle), rc);
        assert_eq!(LaunchPhase::WaitingForLaunch, launch.phase());
    }

    /// Test the motor timer and the timeout.
    #[test]
    fn test_launch_motor_timer_and_timeout() {
        let config = NavConfig::new();
        let mut launch = FixedWingLaunch::new(0);
        let detected_at = detect(&mut launch, &config, 0);
        launch.enable(detected_at);

        // Fresh centred sticks every tick, as the core supplies them
        let mut rc = RcCommand::default();
        let output = launch.apply(&config, 0.0, 1.0, detected_at + 499 * MS, &mut rc);
        assert_eq!(config.min_throttle, rc.throttle);
        assert!(output.motor_stop_or_idle);

        let mut rc = RcCommand::default();
        let output = launch.apply(&config, 0.0, 1.0, detected_at + 500 * MS, &mut rc);
        assert_eq!(config.fw_launch.throttle, rc.throttle);
        assert!(!output.motor_stop_or_idle);
        assert!(!output.reset_pid_integrators);
        assert!(output.beeper);
        assert_eq!(LaunchPhase::ThrottleEngaged, launch.phase());

        let mut rc = RcCommand::default();
        let output = launch.apply(&config, 0.0, 1.0, detected_at + 4999 * MS, &mut rc);
        assert!(!launch.is_finished_or_aborted());
        assert!(output.beeper);

        let mut rc = RcCommand::default();
        let output = launch.apply(&config, 0.0, 1.0, detected_at + 5000 * MS, &mut rc);
        assert!(launch.is_finished_or_aborted());
        assert!(!output.beeper);
        assert_eq!(LaunchPhase::Finished, launch.phase());
    }

    /// Test that stick input aborts the launch.
    #[test]
    fn test_launch_pilot_abort() {
        let config = NavConfig::new();
        let mut launch = FixedWingLaunch::new(0);
        let detected_at = detect(&mut launch, &config, 0);
        launch.enable(detected_at);

        let mut rc = RcCommand::new(0, 15, 0, 1000);
        launch.apply(&config, 0.0, 1.0, detected_at + MS, &mut rc);
        assert!(!launch.is_finished_or_aborted());

        let mut rc = RcCommand::new(-300, 0, 0, 1000);
        launch.apply(&config, 0.0, 1.0, detected_at + 2 * MS, &mut rc);
        assert!(launch.is_finished_or_aborted());
        assert_eq!(0, rc.roll);
    }

    /// Test that reset returns to waiting.
    #[test]
    fn test_launch_reset() {
        let config = NavConfig::new();
        let mut launch = FixedWingLaunch::new(0);
        let detected_at = detect(&mut launch, &config, 0);
        launch.enable(detected_at);
        launch.reset(detected_at + MS);
        assert!(!launch.is_detected());
        assert!(!launch.is_enabled());
        assert_eq!(0, launch.detection_time_accum());
        assert_eq!(LaunchPhase::WaitingForLaunch, launch.phase());
    }
}
