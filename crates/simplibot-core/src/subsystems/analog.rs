//! Analog input (early-stage)

use serde::{Deserialize, Serialize};

use crate::hardware::{AnalogInputDevice, Backend, ANALOG_CHANNELS};
use crate::logging::Logger;
use crate::{check_range, Error, Result};

/// Full-scale reading of the 12-bit converter
pub const ANALOG_FULL_SCALE: i32 = 4095;

const MAX_SAMPLE_BITS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalogConfig {
    /// Analog channel, 0..=3
    pub channel: u8,
    #[serde(default)]
    pub inverted: bool,
    /// Expected (min, max) sensor voltage
    #[serde(default = "default_voltage_range")]
    pub voltage_range: (f64, f64),
    /// 2^bits samples averaged, 0 leaves the host default
    #[serde(default)]
    pub averaging_bits: u32,
    #[serde(default)]
    pub oversample_bits: u32,
}

fn default_voltage_range() -> (f64, f64) {
    (0.0, 5.0)
}

impl AnalogConfig {
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            inverted: false,
            voltage_range: default_voltage_range(),
            averaging_bits: 0,
            oversample_bits: 0,
        }
    }

    pub fn with_voltage_range(mut self, min: f64, max: f64) -> Self {
        self.voltage_range = (min, max);
        self
    }

    pub fn with_sampling(mut self, averaging_bits: u32, oversample_bits: u32) -> Self {
        self.averaging_bits = averaging_bits;
        self.oversample_bits = oversample_bits;
        self
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_range("channel", self.channel, 0, ANALOG_CHANNELS - 1)?;
        check_range("averaging_bits", self.averaging_bits, 0, MAX_SAMPLE_BITS)?;
        check_range("oversample_bits", self.oversample_bits, 0, MAX_SAMPLE_BITS)?;
        let (min, max) = self.voltage_range;
        if !(min < max) {
            return Err(Error::Config(format!(
                "voltage_range min ({}) must be less than max ({})",
                min, max
            )));
        }
        Ok(())
    }
}

/// Analog sensor. With `inverted` set, voltages read from the top of the
/// configured range and raw values from the top of the converter scale.
pub struct AnalogInput {
    device: Box<dyn AnalogInputDevice>,
    config: AnalogConfig,
    logger: Logger,
}

impl std::fmt::Debug for AnalogInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalogInput")
            .field("config", &self.config)
            .finish()
    }
}

impl AnalogInput {
    pub fn new(config: &AnalogConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("analog"))?;
        let logger = logger.child(&format!("Analog{}", config.channel));
        let hw = |action: &str, e| {
            Error::Hardware(format!(
                "failed to {} analog input {}: {}",
                action, config.channel, e
            ))
        };
        let mut device = backend
            .open_analog_input(config.channel)
            .map_err(|e| hw("open", e))?;
        if config.averaging_bits > 0 {
            device
                .set_average_bits(config.averaging_bits)
                .map_err(|e| hw("configure", e))?;
        }
        if config.oversample_bits > 0 {
            device
                .set_oversample_bits(config.oversample_bits)
                .map_err(|e| hw("configure", e))?;
        }
        logger.info(format!("analog input on channel {}", config.channel));
        Ok(Self {
            device,
            config: *config,
            logger,
        })
    }

    fn invert_voltage(&self, v: f64) -> f64 {
        if self.config.inverted {
            self.config.voltage_range.1 - v
        } else {
            v
        }
    }

    pub fn voltage(&self) -> f64 {
        match self.device.voltage() {
            Ok(v) => self.invert_voltage(v),
            Err(e) => {
                self.logger.error(format!("failed to read voltage: {}", e));
                0.0
            }
        }
    }

    pub fn average_voltage(&self) -> f64 {
        match self.device.average_voltage() {
            Ok(v) => self.invert_voltage(v),
            Err(e) => {
                self.logger
                    .error(format!("failed to read average voltage: {}", e));
                0.0
            }
        }
    }

    /// Raw converter reading, 0..=4095
    pub fn value(&self) -> i32 {
        match self.device.value() {
            Ok(v) if self.config.inverted => ANALOG_FULL_SCALE - v,
            Ok(v) => v,
            Err(e) => {
                self.logger.error(format!("failed to read value: {}", e));
                0
            }
        }
    }

    /// Voltage mapped linearly from the voltage range onto
    /// `[min_out, max_out]`, clamped to the output range.
    pub fn scaled(&self, min_out: f64, max_out: f64) -> f64 {
        let (min_v, max_v) = self.config.voltage_range;
        let span = max_v - min_v;
        if span <= 0.0 {
            return min_out;
        }
        let t = ((self.voltage() - min_v) / span).clamp(0.0, 1.0);
        min_out + t * (max_out - min_out)
    }

    pub fn config(&self) -> &AnalogConfig {
        &self.config
    }
}
