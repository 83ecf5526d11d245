//! PWM servo (early-stage)

use serde::{Deserialize, Serialize};

use crate::hardware::{Backend, ServoDevice, PWM_CHANNELS};
use crate::logging::Logger;
use crate::{check_range, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServoConfig {
    /// PWM channel, 0..=9
    pub channel: u8,
    #[serde(default)]
    pub min_angle: f64,
    #[serde(default = "default_max_angle")]
    pub max_angle: f64,
}

fn default_max_angle() -> f64 {
    180.0
}

impl ServoConfig {
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            min_angle: 0.0,
            max_angle: default_max_angle(),
        }
    }

    pub fn with_range(mut self, min_angle: f64, max_angle: f64) -> Self {
        self.min_angle = min_angle;
        self.max_angle = max_angle;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_range("channel", self.channel, 0, PWM_CHANNELS - 1)?;
        if !self.min_angle.is_finite() || !self.max_angle.is_finite() {
            return Err(Error::Config(format!(
                "angle range must be finite, got {}..{}",
                self.min_angle, self.max_angle
            )));
        }
        if !(self.min_angle < self.max_angle) {
            return Err(Error::Config(format!(
                "min_angle ({}) must be less than max_angle ({})",
                self.min_angle, self.max_angle
            )));
        }
        Ok(())
    }
}

/// Servo positioned by angle or by normalized position
///
/// Position 0 maps to `min_angle` and 1 to `max_angle`.
pub struct Servo {
    device: Box<dyn ServoDevice>,
    config: ServoConfig,
    logger: Logger,
}

impl std::fmt::Debug for Servo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Servo").field("config", &self.config).finish()
    }
}

impl Servo {
    pub fn new(config: &ServoConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("servo"))?;
        let logger = logger.child(&format!("Servo{}", config.channel));
        let device = backend.open_servo(config.channel).map_err(|e| {
            Error::Hardware(format!(
                "failed to open servo on PWM {}: {}",
                config.channel, e
            ))
        })?;
        logger.info(format!("servo on PWM {}", config.channel));
        Ok(Self {
            device,
            config: *config,
            logger,
        })
    }

    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    /// Move to `angle` degrees, clamped to the configured range
    ///
    /// A non-finite angle is rejected and the servo is left where it is.
    pub fn set_angle(&mut self, angle: f64) -> Result<()> {
        if !angle.is_finite() {
            return Err(Error::Validation(format!(
                "servo angle must be finite, got {}",
                angle
            )));
        }
        let angle = angle.clamp(self.config.min_angle, self.config.max_angle);
        let span = self.config.max_angle - self.config.min_angle;
        self.write((angle - self.config.min_angle) / span)
    }

    /// Move to a normalized position in [0, 1]
    pub fn set_position(&mut self, position: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&position) {
            return Err(Error::Validation(format!(
                "servo position must be between 0 and 1, got {}",
                position
            )));
        }
        self.write(position)
    }

    pub fn position(&self) -> f64 {
        self.device.position().unwrap_or_else(|e| {
            self.logger.error(format!("failed to read position: {}", e));
            0.0
        })
    }

    pub fn angle(&self) -> f64 {
        self.config.min_angle + self.position() * (self.config.max_angle - self.config.min_angle)
    }

    fn write(&mut self, position: f64) -> Result<()> {
        self.device.set_position(position).map_err(|e| {
            Error::Hardware(format!(
                "failed to move servo on PWM {}: {}",
                self.config.channel, e
            ))
        })
    }
}
