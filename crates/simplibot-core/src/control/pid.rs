//! PID controller
//!
//! Fixed-period PID with feedforward, integrator range limiting and
//! optional continuous (wrapping) input, for closing loops on arm angle,
//! gyro heading or wheel velocity from the periodic hooks.

use serde::{Deserialize, Serialize};

use crate::logging::Logger;
use crate::{check_range, Error, Result};

/// Default loop period of the robot's periodic hooks, seconds
pub const DEFAULT_PERIOD: f64 = 0.02;

/// PID controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Feedforward gain, applied to the position error
    pub kf: f64,
    /// Position error under which [`PidController::at_setpoint`] holds
    pub tolerance: f64,
    /// Velocity error bound for `at_setpoint`
    pub velocity_tolerance: f64,
    /// Accumulated error is clamped to +/- this range
    pub integral_range: Option<f64>,
    /// (min, max) of a wrapping input such as a heading in degrees
    pub continuous_range: Option<(f64, f64)>,
    pub min_output: f64,
    pub max_output: f64,
    /// Seconds between `calculate` calls
    pub period: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            kf: 0.0,
            tolerance: 0.05,
            velocity_tolerance: f64::INFINITY,
            integral_range: None,
            continuous_range: None,
            min_output: -1.0,
            max_output: 1.0,
            period: DEFAULT_PERIOD,
        }
    }
}

impl PidConfig {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            ..Default::default()
        }
    }

    pub fn with_feedforward(mut self, kf: f64) -> Self {
        self.kf = kf;
        self
    }

    pub fn with_tolerance(mut self, position: f64, velocity: f64) -> Self {
        self.tolerance = position;
        self.velocity_tolerance = velocity;
        self
    }

    pub fn with_limits(mut self, min: f64, max: f64) -> Self {
        self.min_output = min;
        self.max_output = max;
        self
    }

    pub fn with_integral_range(mut self, range: f64) -> Self {
        self.integral_range = Some(range);
        self
    }

    /// Treat the input as wrapping between `min` and `max`
    pub fn continuous(mut self, min: f64, max: f64) -> Self {
        self.continuous_range = Some((min, max));
        self
    }

    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_range("tolerance", self.tolerance, 0.0, f64::INFINITY)?;
        check_range(
            "velocity_tolerance",
            self.velocity_tolerance,
            0.0,
            f64::INFINITY,
        )?;
        if !(self.min_output < self.max_output) {
            return Err(Error::Config(format!(
                "min_output ({}) must be less than max_output ({})",
                self.min_output, self.max_output
            )));
        }
        if !(self.period > 0.0) {
            return Err(Error::Config(format!(
                "period must be positive, got {}",
                self.period
            )));
        }
        if let Some(range) = self.integral_range {
            check_range("integral_range", range, 0.0, f64::INFINITY)?;
        }
        if let Some((min, max)) = self.continuous_range {
            if !(min < max) {
                return Err(Error::Config(format!(
                    "continuous range min ({}) must be less than max ({})",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

/// Wrap `value` into `[min, max)`
fn input_modulus(value: f64, min: f64, max: f64) -> f64 {
    let modulus = max - min;
    (value - min).rem_euclid(modulus) + min
}

/// PID controller
///
/// # Example
/// ```
/// use simplibot_core::control::{PidConfig, PidController};
/// use simplibot_core::Logger;
///
/// let config = PidConfig::new(0.02, 0.0, 0.001)
///     .continuous(-180.0, 180.0)
///     .with_tolerance(2.0, f64::INFINITY);
/// let mut pid = PidController::new(config, &Logger::new("Heading")).unwrap();
///
/// pid.set_setpoint(90.0);
/// let output = pid.calculate(45.0);
/// assert!(output > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct PidController {
    config: PidConfig,
    setpoint: f64,
    position_error: f64,
    prev_error: f64,
    velocity_error: f64,
    total_error: f64,
    has_measurement: bool,
    logger: Logger,
}

impl PidController {
    /// Create a controller, rejecting an invalid config
    pub fn new(config: PidConfig, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("pid"))?;
        let logger = logger.child("PID");
        logger.info(format!(
            "initialized (P={}, I={}, D={})",
            config.kp, config.ki, config.kd
        ));
        Ok(Self {
            config,
            setpoint: 0.0,
            position_error: 0.0,
            prev_error: 0.0,
            velocity_error: 0.0,
            total_error: 0.0,
            has_measurement: false,
            logger,
        })
    }

    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    fn error_to(&self, measurement: f64) -> f64 {
        let error = self.setpoint - measurement;
        match self.config.continuous_range {
            Some((min, max)) => {
                let half = (max - min) / 2.0;
                input_modulus(error, -half, half)
            }
            None => error,
        }
    }

    /// Output for `measurement`, clamped to the output limits
    pub fn calculate(&mut self, measurement: f64) -> f64 {
        let period = self.config.period;

        self.prev_error = self.position_error;
        self.position_error = self.error_to(measurement);
        self.velocity_error = if self.has_measurement {
            (self.position_error - self.prev_error) / period
        } else {
            0.0
        };
        self.has_measurement = true;

        if self.config.ki != 0.0 {
            let range = self.config.integral_range.unwrap_or(f64::INFINITY);
            self.total_error = self
                .position_error
                .mul_add(period, self.total_error)
                .clamp(-range, range);
        }

        let output = self.config.kp * self.position_error
            + self.config.ki * self.total_error
            + self.config.kd * self.velocity_error
            + self.config.kf * self.position_error;

        output.clamp(self.config.min_output, self.config.max_output)
    }

    /// Whether both errors are inside their tolerances.
    /// False until the first `calculate`.
    pub fn at_setpoint(&self) -> bool {
        self.has_measurement
            && self.position_error.abs() < self.config.tolerance
            && self.velocity_error.abs() < self.config.velocity_tolerance
    }

    /// Setpoint minus the last measurement
    pub fn position_error(&self) -> f64 {
        self.position_error
    }

    /// Rate of change of the position error, units per second
    pub fn velocity_error(&self) -> f64 {
        self.velocity_error
    }

    /// Accumulated integral error
    pub fn total_error(&self) -> f64 {
        self.total_error
    }

    /// Clear accumulated and previous error
    pub fn reset(&mut self) {
        self.position_error = 0.0;
        self.prev_error = 0.0;
        self.velocity_error = 0.0;
        self.total_error = 0.0;
        self.has_measurement = false;
        self.logger.debug("reset");
    }

    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.config.kp = kp;
        self.config.ki = ki;
        self.config.kd = kd;
        self.logger
            .info(format!("gains updated (P={}, I={}, D={})", kp, ki, kd));
    }

    pub fn config(&self) -> &PidConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pid(config: PidConfig) -> PidController {
        PidController::new(config, &Logger::quiet("test")).unwrap()
    }

    #[test]
    fn test_p_only() {
        let mut pid = pid(PidConfig::new(0.1, 0.0, 0.0));
        pid.set_setpoint(10.0);
        // error 5, 0.1 * 5
        assert_relative_eq!(pid.calculate(5.0), 0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_output_clamped() {
        let mut pid = pid(PidConfig::new(10.0, 0.0, 0.0));
        pid.set_setpoint(10.0);
        assert_relative_eq!(pid.calculate(0.0), 1.0);
        assert_relative_eq!(pid.calculate(20.0), -1.0);
    }

    #[test]
    fn test_integral_accumulates() {
        let mut pid = pid(PidConfig::new(0.0, 1.0, 0.0).with_period(0.1));
        pid.set_setpoint(1.0);
        assert_relative_eq!(pid.calculate(0.0), 0.1, epsilon = 1e-10);
        assert_relative_eq!(pid.calculate(0.0), 0.2, epsilon = 1e-10);
    }

    #[test]
    fn test_integral_range() {
        let config = PidConfig::new(0.0, 1.0, 0.0)
            .with_limits(-100.0, 100.0)
            .with_integral_range(0.5);
        let mut pid = pid(config);
        pid.set_setpoint(10.0);
        for _ in 0..100 {
            pid.calculate(0.0);
        }
        assert_relative_eq!(pid.total_error(), 0.5);
    }

    #[test]
    fn test_derivative_uses_period() {
        let config = PidConfig::new(0.0, 0.0, 1.0)
            .with_limits(-100.0, 100.0)
            .with_period(0.5);
        let mut pid = pid(config);
        pid.set_setpoint(0.0);
        // first sample has no velocity
        assert_relative_eq!(pid.calculate(0.0), 0.0);
        // error moves from 0 to -1 over 0.5s
        assert_relative_eq!(pid.calculate(1.0), -2.0, epsilon = 1e-10);
        assert_relative_eq!(pid.velocity_error(), -2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_feedforward_adds_error_term() {
        let config = PidConfig::new(0.1, 0.0, 0.0).with_feedforward(0.05);
        let mut pid = pid(config);
        pid.set_setpoint(4.0);
        assert_relative_eq!(pid.calculate(0.0), 0.6, epsilon = 1e-10);
    }

    #[test]
    fn test_continuous_takes_short_way() {
        let config = PidConfig::new(1.0, 0.0, 0.0)
            .with_limits(-1000.0, 1000.0)
            .continuous(-180.0, 180.0);
        let mut pid = pid(config);
        pid.set_setpoint(170.0);
        pid.calculate(-170.0);
        assert_relative_eq!(pid.position_error(), -20.0, epsilon = 1e-10);
    }

    #[test]
    fn test_at_setpoint() {
        let mut pid = pid(PidConfig::new(1.0, 0.0, 0.0).with_tolerance(0.1, f64::INFINITY));
        pid.set_setpoint(1.0);
        assert!(!pid.at_setpoint());
        pid.calculate(0.95);
        assert!(pid.at_setpoint());
        pid.calculate(0.5);
        assert!(!pid.at_setpoint());
    }

    #[test]
    fn test_reset() {
        let mut pid = pid(PidConfig::new(0.0, 1.0, 0.0));
        pid.set_setpoint(1.0);
        pid.calculate(0.0);
        assert!(pid.total_error() > 0.0);
        pid.reset();
        assert_relative_eq!(pid.total_error(), 0.0);
        assert!(!pid.at_setpoint());
    }

    #[test]
    fn test_set_gains() {
        let mut pid = pid(PidConfig::default());
        pid.set_gains(0.5, 0.0, 0.0);
        pid.set_setpoint(1.0);
        assert_relative_eq!(pid.calculate(0.0), 0.5);
        assert_relative_eq!(pid.config().kp, 0.5);
    }

    #[test]
    fn test_invalid_config() {
        let log = Logger::quiet("test");
        assert!(PidController::new(PidConfig::default().with_limits(1.0, -1.0), &log)
            .unwrap_err()
            .is_config());
        assert!(PidController::new(PidConfig::default().with_tolerance(-0.1, 1.0), &log).is_err());
        assert!(PidController::new(PidConfig::default().with_period(0.0), &log).is_err());
    }

    #[test]
    fn test_logs_under_caller_component() {
        let pid = pid(PidConfig::default());
        assert_eq!(pid.logger.component(), "test/PID");
        assert!(!pid.logger.is_enabled());
    }
}
