//! Pneumatics (early-stage)

use serde::{Deserialize, Serialize};

use crate::hardware::{Backend, CompressorDevice, ModuleType, SolenoidDevice, MAX_CAN_ID};
use crate::logging::Logger;
use crate::{check_range, Error, Result};

/// Solenoid channels usable on either module
pub const SOLENOID_CHANNELS: u8 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PneumaticsConfig {
    #[serde(default)]
    pub module_type: ModuleType,
    /// CAN id of the module, 0..=62
    #[serde(default)]
    pub module_id: u8,
    /// Start the compressor in closed-loop mode when built
    #[serde(default = "default_enable_compressor")]
    pub enable_compressor: bool,
    /// Single solenoids to open, channels 0..=7
    #[serde(default)]
    pub solenoid_channels: Vec<u8>,
}

fn default_enable_compressor() -> bool {
    true
}

impl Default for PneumaticsConfig {
    fn default() -> Self {
        Self {
            module_type: ModuleType::Ctre,
            module_id: 0,
            enable_compressor: true,
            solenoid_channels: Vec::new(),
        }
    }
}

impl PneumaticsConfig {
    pub fn new(module_type: ModuleType, module_id: u8) -> Self {
        Self {
            module_type,
            module_id,
            ..Default::default()
        }
    }

    pub fn with_solenoids(mut self, channels: Vec<u8>) -> Self {
        self.solenoid_channels = channels;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_range("module_id", self.module_id, 0, MAX_CAN_ID as u8)?;
        for (i, &ch) in self.solenoid_channels.iter().enumerate() {
            check_range(&format!("solenoid_channels[{}]", i), ch, 0, SOLENOID_CHANNELS - 1)?;
            if self.solenoid_channels[..i].contains(&ch) {
                return Err(Error::Config(format!("duplicate solenoid channel {}", ch)));
            }
        }
        Ok(())
    }
}

/// Single-acting solenoid
pub struct Solenoid {
    device: Box<dyn SolenoidDevice>,
    channel: u8,
    logger: Logger,
}

impl std::fmt::Debug for Solenoid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solenoid").field("channel", &self.channel).finish()
    }
}

impl Solenoid {
    pub fn new(
        config: &PneumaticsConfig,
        channel: u8,
        backend: &dyn Backend,
        logger: &Logger,
    ) -> Result<Self> {
        check_range("channel", channel, 0, SOLENOID_CHANNELS - 1)?;
        let device = backend
            .open_solenoid(config.module_type, config.module_id, channel)
            .map_err(|e| Error::Hardware(format!("failed to open solenoid {}: {}", channel, e)))?;
        logger.info(format!("solenoid on channel {}", channel));
        Ok(Self {
            device,
            channel,
            logger: logger.clone(),
        })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// True extends
    pub fn set(&mut self, on: bool) -> Result<()> {
        self.device.set(on).map_err(|e| {
            Error::Hardware(format!("failed to set solenoid {}: {}", self.channel, e))
        })
    }

    pub fn get(&self) -> bool {
        self.device.get().unwrap_or_else(|e| {
            self.logger
                .error(format!("failed to read solenoid {}: {}", self.channel, e));
            false
        })
    }

    pub fn toggle(&mut self) -> Result<()> {
        let on = !self.get();
        self.set(on)
    }
}

pub struct Compressor {
    device: Box<dyn CompressorDevice>,
    logger: Logger,
}

impl std::fmt::Debug for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compressor").finish_non_exhaustive()
    }
}

impl Compressor {
    pub fn new(config: &PneumaticsConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        let device = backend
            .open_compressor(config.module_type, config.module_id)
            .map_err(|e| {
                Error::Hardware(format!(
                    "failed to open compressor on module {}: {}",
                    config.module_id, e
                ))
            })?;
        let mut compressor = Self {
            device,
            logger: logger.clone(),
        };
        if config.enable_compressor {
            compressor.enable()?;
        } else {
            compressor.disable()?;
        }
        Ok(compressor)
    }

    /// Closed-loop control off the pressure switch
    pub fn enable(&mut self) -> Result<()> {
        self.device
            .enable_digital()
            .map_err(|e| Error::Hardware(format!("failed to enable compressor: {}", e)))?;
        self.logger.info("compressor enabled");
        Ok(())
    }

    pub fn disable(&mut self) -> Result<()> {
        self.device
            .disable()
            .map_err(|e| Error::Hardware(format!("failed to disable compressor: {}", e)))?;
        self.logger.info("compressor disabled");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.device.is_enabled().unwrap_or_else(|e| {
            self.logger
                .error(format!("failed to read compressor state: {}", e));
            false
        })
    }

    /// Pressure in PSI, `None` without an analog sensor
    pub fn pressure(&self) -> Option<f64> {
        self.device.pressure()
    }
}

/// Compressor plus the configured solenoids
#[derive(Debug)]
pub struct Pneumatics {
    pub compressor: Compressor,
    pub solenoids: Vec<Solenoid>,
}

impl Pneumatics {
    pub fn new(config: &PneumaticsConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("pneumatics"))?;
        let logger = logger.child("Pneumatics");
        let compressor = Compressor::new(config, backend, &logger)?;
        let solenoids = config
            .solenoid_channels
            .iter()
            .map(|&ch| Solenoid::new(config, ch, backend, &logger))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            compressor,
            solenoids,
        })
    }

    /// Solenoid on `channel`, if configured
    pub fn solenoid(&mut self, channel: u8) -> Option<&mut Solenoid> {
        self.solenoids.iter_mut().find(|s| s.channel == channel)
    }
}
