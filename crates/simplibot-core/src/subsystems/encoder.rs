//! Position feedback from a quadrature encoder or a motor's own sensor
//! (early-stage)

use serde::{Deserialize, Serialize};

use crate::hardware::{Backend, EncoderDevice, EncodingType, DIO_CHANNELS};
use crate::logging::Logger;
use crate::motors::{MotorController, MotorFactory, MotorSpec};
use crate::{check_range, Error, Result};

/// Where the counts come from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EncoderSource {
    /// Two DIO channels on the roboRIO
    Quadrature {
        channel_a: u8,
        channel_b: u8,
        #[serde(default)]
        encoding: EncodingType,
    },
    /// Sensor built into a motor controller; the encoder owns the motor
    Motor { motor: MotorSpec },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    #[serde(flatten)]
    pub source: EncoderSource,
    /// User units per count, or per rotation for a motor sensor
    #[serde(default = "default_distance_per_pulse")]
    pub distance_per_pulse: f64,
    /// Reverse the counting direction
    #[serde(default)]
    pub inverted: bool,
}

fn default_distance_per_pulse() -> f64 {
    1.0
}

impl EncoderConfig {
    /// Quadrature encoder with 4x decoding
    pub fn new(channel_a: u8, channel_b: u8) -> Self {
        Self {
            source: EncoderSource::Quadrature {
                channel_a,
                channel_b,
                encoding: EncodingType::default(),
            },
            distance_per_pulse: default_distance_per_pulse(),
            inverted: false,
        }
    }

    /// Read the sensor of the motor described by `spec`
    pub fn motor(spec: MotorSpec) -> Self {
        Self {
            source: EncoderSource::Motor { motor: spec },
            distance_per_pulse: default_distance_per_pulse(),
            inverted: false,
        }
    }

    pub fn with_distance_per_pulse(mut self, distance: f64) -> Self {
        self.distance_per_pulse = distance;
        self
    }

    /// Only meaningful for quadrature encoders
    pub fn with_encoding(mut self, encoding: EncodingType) -> Self {
        if let EncoderSource::Quadrature { encoding: e, .. } = &mut self.source {
            *e = encoding;
        }
        self
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// DIO channels used, empty for a motor sensor
    pub fn dio_channels(&self) -> Vec<u8> {
        match self.source {
            EncoderSource::Quadrature {
                channel_a,
                channel_b,
                ..
            } => vec![channel_a, channel_b],
            EncoderSource::Motor { .. } => Vec::new(),
        }
    }

    /// The owned motor, if the counts come from one
    pub fn motor_spec(&self) -> Option<&MotorSpec> {
        match &self.source {
            EncoderSource::Motor { motor } => Some(motor),
            EncoderSource::Quadrature { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.source {
            EncoderSource::Quadrature {
                channel_a,
                channel_b,
                ..
            } => {
                check_range("channel_a", channel_a, 0, DIO_CHANNELS - 1)?;
                check_range("channel_b", channel_b, 0, DIO_CHANNELS - 1)?;
                if channel_a == channel_b {
                    return Err(Error::Config(format!(
                        "channel_a and channel_b must differ, both are {}",
                        channel_a
                    )));
                }
            }
            EncoderSource::Motor { motor: spec } => {
                spec.validate().map_err(|e| e.in_field("motor"))?;
                if !spec.motor_type.has_encoder() {
                    return Err(Error::Config(format!(
                        "motor: {} has no sensor to read",
                        spec.motor_type
                    )));
                }
            }
        }
        if !self.distance_per_pulse.is_finite() || self.distance_per_pulse == 0.0 {
            return Err(Error::Config(format!(
                "distance_per_pulse must be finite and non-zero, got {}",
                self.distance_per_pulse
            )));
        }
        Ok(())
    }
}

enum Feedback {
    Quadrature(Box<dyn EncoderDevice>),
    Motor(Box<dyn MotorController>),
}

pub struct Encoder {
    feedback: Feedback,
    config: EncoderConfig,
    logger: Logger,
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder").field("config", &self.config).finish()
    }
}

impl Encoder {
    pub fn new(config: &EncoderConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("encoder"))?;
        let logger = logger.child("Encoder");
        let feedback = match config.source {
            EncoderSource::Quadrature {
                channel_a,
                channel_b,
                encoding,
            } => {
                // Direction is handled by the device so raw counts agree with distance.
                let mut device = backend
                    .open_quadrature_encoder(channel_a, channel_b, encoding, config.inverted)
                    .map_err(|e| {
                        Error::Hardware(format!(
                            "failed to open encoder on DIO {}/{}: {}",
                            channel_a, channel_b, e
                        ))
                    })?;
                device
                    .set_distance_per_pulse(config.distance_per_pulse)
                    .map_err(|e| Error::Hardware(format!("failed to configure encoder: {}", e)))?;
                logger.info(format!(
                    "encoder on DIO {}/{} ({:?})",
                    channel_a, channel_b, encoding
                ));
                Feedback::Quadrature(device)
            }
            EncoderSource::Motor { motor: spec } => {
                let motor = MotorFactory::new(backend, &logger).create(&spec)?;
                logger.info(format!("encoder on {}", motor.describe()));
                Feedback::Motor(motor)
            }
        };
        Ok(Self {
            feedback,
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

    /// Distance travelled in user units
    pub fn position(&self) -> f64 {
        let read = match &self.feedback {
            Feedback::Quadrature(device) => device.distance().map_err(|e| e.to_string()),
            Feedback::Motor(motor) => motor
                .position()
                .map(|rot| self.sign() * rot * self.config.distance_per_pulse)
                .map_err(|e| e.to_string()),
        };
        read.unwrap_or_else(|e| {
            self.logger.error(format!("failed to read position: {}", e));
            0.0
        })
    }

    /// User units per second
    pub fn velocity(&self) -> f64 {
        let read = match &self.feedback {
            Feedback::Quadrature(device) => device.rate().map_err(|e| e.to_string()),
            Feedback::Motor(motor) => motor
                .velocity()
                .map(|rps| self.sign() * rps * self.config.distance_per_pulse)
                .map_err(|e| e.to_string()),
        };
        read.unwrap_or_else(|e| {
            self.logger.error(format!("failed to read velocity: {}", e));
            0.0
        })
    }

    /// Unscaled count; whole rotations for a motor sensor
    pub fn raw(&self) -> i64 {
        let read = match &self.feedback {
            Feedback::Quadrature(device) => device.raw().map_err(|e| e.to_string()),
            Feedback::Motor(motor) => motor
                .position()
                .map(|rot| (self.sign() * rot).trunc() as i64)
                .map_err(|e| e.to_string()),
        };
        read.unwrap_or_else(|e| {
            self.logger.error(format!("failed to read count: {}", e));
            0
        })
    }

    pub fn reset(&mut self) -> Result<()> {
        match &mut self.feedback {
            Feedback::Quadrature(device) => device
                .reset()
                .map_err(|e| Error::Hardware(format!("failed to reset encoder: {}", e))),
            Feedback::Motor(motor) => motor.set_position(0.0),
        }
    }

    /// Overwrite the current position, in user units
    ///
    /// Only motor sensors can be preset; a quadrature encoder returns
    /// `InvalidState`.
    pub fn set_position(&mut self, position: f64) -> Result<()> {
        if !position.is_finite() {
            return Err(Error::Validation(format!(
                "encoder position must be finite, got {}",
                position
            )));
        }
        let rotations = self.sign() * position / self.config.distance_per_pulse;
        match &mut self.feedback {
            Feedback::Motor(motor) => {
                motor.set_position(rotations)?;
                self.logger.debug(format!("position set to {}", position));
                Ok(())
            }
            Feedback::Quadrature(_) => Err(Error::InvalidState(
                "a quadrature encoder can only be reset to zero".into(),
            )),
        }
    }

    /// Motor the counts come from, for driving it directly
    pub fn motor_mut(&mut self) -> Option<&mut (dyn MotorController + 'static)> {
        match &mut self.feedback {
            Feedback::Motor(motor) => Some(motor.as_mut()),
            Feedback::Quadrature(_) => None,
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{DeviceAddress, SimBackend};
    use crate::motors::MotorType;
    use approx::assert_relative_eq;

    #[test]
    fn test_validate() {
        assert!(EncoderConfig::new(0, 0).validate().is_err());
        assert!(EncoderConfig::new(0, 10).validate().is_err());
        assert!(EncoderConfig::new(0, 1)
            .with_distance_per_pulse(0.0)
            .validate()
            .is_err());
        assert!(EncoderConfig::motor(MotorSpec::new(MotorType::VictorSpx, 4))
            .validate()
            .unwrap_err()
            .is_config());
        assert!(EncoderConfig::motor(MotorSpec::new(MotorType::SparkMax, 4))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_distance_and_rate() {
        let sim = SimBackend::new();
        let config = EncoderConfig::new(2, 3).with_distance_per_pulse(0.5);
        let enc = Encoder::new(&config, &sim, &Logger::quiet("test")).unwrap();
        assert!(sim.is_claimed(DeviceAddress::Dio(3)));
        sim.set_encoder_count(2, 200, 40.0);
        assert_eq!(enc.raw(), 200);
        assert_relative_eq!(enc.position(), 100.0);
        assert_relative_eq!(enc.velocity(), 20.0);
    }

    #[test]
    fn test_inverted_counts_down() {
        let sim = SimBackend::new();
        let config = EncoderConfig::new(4, 5).inverted(true);
        let mut enc = Encoder::new(&config, &sim, &Logger::quiet("test")).unwrap();
        sim.set_encoder_count(4, 10, 0.0);
        assert_eq!(enc.raw(), -10);
        assert_relative_eq!(enc.position(), -10.0);
        enc.reset().unwrap();
        assert_eq!(enc.raw(), 0);
    }

    #[test]
    fn test_quadrature_cannot_be_preset() {
        let sim = SimBackend::new();
        let mut enc = Encoder::new(&EncoderConfig::new(0, 1), &sim, &Logger::quiet("test")).unwrap();
        assert!(matches!(enc.set_position(3.0), Err(Error::InvalidState(_))));
        assert!(enc.motor_mut().is_none());
    }

    #[test]
    fn test_motor_sensor() {
        let sim = SimBackend::new();
        let config = EncoderConfig::motor(MotorSpec::new(MotorType::SparkMax, 6))
            .with_distance_per_pulse(0.25);
        let mut enc = Encoder::new(&config, &sim, &Logger::quiet("test")).unwrap();
        assert!(sim.is_claimed(DeviceAddress::Can(6)));

        sim.set_motor_position(6, 8.0);
        assert_relative_eq!(enc.position(), 2.0);
        assert_eq!(enc.raw(), 8);

        enc.set_position(1.0).unwrap();
        assert_relative_eq!(sim.motor(6).unwrap().position, 4.0);
        assert_relative_eq!(enc.position(), 1.0);

        enc.reset().unwrap();
        assert_relative_eq!(enc.position(), 0.0);
    }

    #[test]
    fn test_motor_sensor_inverted_and_driven() {
        let sim = SimBackend::new().with_free_speed(10.0);
        let config = EncoderConfig::motor(MotorSpec::new(MotorType::TalonSrx, 7)).inverted(true);
        let mut enc = Encoder::new(&config, &sim, &Logger::quiet("test")).unwrap();

        enc.motor_mut().unwrap().set(0.5).unwrap();
        sim.step(0.1);
        assert_relative_eq!(enc.velocity(), -5.0, epsilon = 1e-9);
        assert_relative_eq!(enc.position(), -0.5, epsilon = 1e-9);

        enc.set_position(-2.0).unwrap();
        assert_relative_eq!(sim.motor(7).unwrap().position, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_motor_source_from_toml() {
        let config: EncoderConfig = toml::from_str(
            r#"
            source = "motor"
            motor = { type = "spark_max", can_id = 12, inverted = true }
            distance_per_pulse = 0.1
            "#,
        )
        .unwrap();
        assert_eq!(config.motor_spec().unwrap().can_id, 12);
        assert!(config.motor_spec().unwrap().inverted);
        assert!(!config.inverted);
        assert!(config.dio_channels().is_empty());

        let config: EncoderConfig = toml::from_str(
            r#"
            source = "quadrature"
            channel_a = 2
            channel_b = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.dio_channels(), vec![2, 3]);
        assert_relative_eq!(config.distance_per_pulse, 1.0);
    }
}
