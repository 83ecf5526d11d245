//! Gyro (early-stage)

use serde::{Deserialize, Serialize};

use crate::hardware::{Backend, DeviceError, GyroDevice, GyroType, ANALOG_CHANNELS};
use crate::logging::Logger;
use crate::{check_range, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GyroConfig {
    #[serde(default, rename = "type", alias = "gyro_type")]
    pub gyro_type: GyroType,
    /// Analog port, 0..=3
    #[serde(default)]
    pub port: u8,
    /// Negate angle and rate
    #[serde(default)]
    pub inverted: bool,
}

impl GyroConfig {
    pub fn new(gyro_type: GyroType, port: u8) -> Self {
        Self {
            gyro_type,
            port,
            inverted: false,
        }
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_range("port", self.port, 0, ANALOG_CHANNELS - 1)
    }
}

/// Heading sensor. Failed reads are logged and read as zero.
pub struct Gyro {
    device: Box<dyn GyroDevice>,
    config: GyroConfig,
    logger: Logger,
}

impl std::fmt::Debug for Gyro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gyro").field("config", &self.config).finish()
    }
}

impl Gyro {
    /// Open and calibrate the gyro. Keep the robot still while this runs.
    pub fn new(config: &GyroConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("gyro"))?;
        let logger = logger.child("Gyro");
        let hw = |e: DeviceError| {
            Error::Hardware(format!(
                "failed to open {:?} gyro on port {}: {}",
                config.gyro_type, config.port, e
            ))
        };
        let mut device = backend.open_gyro(config.gyro_type, config.port).map_err(hw)?;
        device.calibrate().map_err(hw)?;
        logger.info(format!("{:?} gyro on port {}", config.gyro_type, config.port));
        Ok(Self {
            device,
            config: *config,
            logger,
        })
    }

    fn sign(&self) -> f64 {
        if self.config.inverted {
            -1.0
        } else {
            1.0
        }
    }

    /// Heading in degrees, continuous
    pub fn angle(&self) -> f64 {
        match self.device.angle() {
            Ok(a) => self.sign() * a,
            Err(e) => {
                self.logger.error(format!("failed to read angle: {}", e));
                0.0
            }
        }
    }

    /// Turn rate in degrees per second
    pub fn rate(&self) -> f64 {
        match self.device.rate() {
            Ok(r) => self.sign() * r,
            Err(e) => {
                self.logger.error(format!("failed to read rate: {}", e));
                0.0
            }
        }
    }

    /// Zero the heading
    pub fn reset(&mut self) -> Result<()> {
        self.device
            .reset()
            .map_err(|e| Error::Hardware(format!("failed to reset gyro: {}", e)))?;
        self.logger.info("reset");
        Ok(())
    }

    pub fn calibrate(&mut self) -> Result<()> {
        self.device
            .calibrate()
            .map_err(|e| Error::Hardware(format!("failed to calibrate gyro: {}", e)))?;
        self.logger.info("calibrated");
        Ok(())
    }
}
