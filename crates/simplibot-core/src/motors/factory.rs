//! Motor factory

use super::controller::{PhoenixController, SparkMaxController};
use super::{MotorController, MotorSpec, MotorType};
use crate::hardware::{Backend, PhoenixModel, SparkMotorKind};
use crate::logging::Logger;
use crate::{Error, Result};

/// Builds motor controllers from [`MotorSpec`]s
///
/// The `MotorSpec` is validated before the backend is touched. Neutral mode and
/// inversion are always written explicitly, so a controller never runs on
/// whatever its persisted vendor settings were.
///
/// # Example
/// ```
/// use simplibot_core::hardware::SimBackend;
/// use simplibot_core::{Logger, MotorController, MotorFactory, MotorSpec, MotorType};
///
/// let sim = SimBackend::new();
/// let factory = MotorFactory::new(&sim, &Logger::new("example"));
/// let mut motor = factory.create(&MotorSpec::new(MotorType::TalonSrx, 3)).unwrap();
/// motor.set(0.5).unwrap();
/// ```
pub struct MotorFactory<'a> {
    backend: &'a dyn Backend,
    logger: Logger,
}

impl<'a> MotorFactory<'a> {
    pub fn new(backend: &'a dyn Backend, logger: &Logger) -> Self {
        Self {
            backend,
            logger: logger.child("Motors"),
        }
    }

    /// Construct and configure one motor
    pub fn create(&self, spec: &MotorSpec) -> Result<Box<dyn MotorController>> {
        spec.validate()?;

        let opened: std::result::Result<Box<dyn MotorController>, _> = match spec.motor_type {
            MotorType::TalonSrx => PhoenixController::open(self.backend, PhoenixModel::TalonSrx, spec)
                .map(|m| Box::new(m) as Box<dyn MotorController>),
            MotorType::VictorSpx => PhoenixController::open(self.backend, PhoenixModel::VictorSpx, spec)
                .map(|m| Box::new(m) as Box<dyn MotorController>),
            MotorType::SparkMax | MotorType::SparkMaxBrushless => {
                SparkMaxController::open(self.backend, SparkMotorKind::Brushless, spec)
                    .map(|m| Box::new(m) as Box<dyn MotorController>)
            }
            MotorType::SparkMaxBrushed => {
                SparkMaxController::open(self.backend, SparkMotorKind::Brushed, spec)
                    .map(|m| Box::new(m) as Box<dyn MotorController>)
            }
        };

        match opened {
            Ok(motor) => {
                self.logger.info(format!(
                    "created {} on CAN {} (inverted: {}, neutral: {})",
                    spec.motor_type, spec.can_id, spec.inverted, spec.neutral_mode
                ));
                Ok(motor)
            }
            Err(e) => {
                let err = Error::Hardware(format!(
                    "failed to create {} on CAN {}: {}",
                    spec.motor_type, spec.can_id, e
                ));
                self.logger.error_with("motor construction failed", &err);
                Err(err)
            }
        }
    }

    /// Talon SRX with default settings
    pub fn talon_srx(&self, can_id: i32) -> Result<Box<dyn MotorController>> {
        self.create(&MotorSpec::new(MotorType::TalonSrx, can_id))
    }

    /// Victor SPX with default settings
    pub fn victor_spx(&self, can_id: i32) -> Result<Box<dyn MotorController>> {
        self.create(&MotorSpec::new(MotorType::VictorSpx, can_id))
    }

    /// Spark MAX with default settings
    pub fn spark_max(&self, can_id: i32, brushless: bool) -> Result<Box<dyn MotorController>> {
        let motor_type = if brushless {
            MotorType::SparkMaxBrushless
        } else {
            MotorType::SparkMaxBrushed
        };
        self.create(&MotorSpec::new(motor_type, can_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{DeviceAddress, IdleMode, SimBackend, SimMotorKind};
    use crate::motors::NeutralMode;

    fn factory(sim: &SimBackend) -> MotorFactory<'_> {
        MotorFactory::new(sim, &Logger::quiet("test"))
    }

    #[test]
    fn test_create_each_type() {
        let sim = SimBackend::new();
        let f = factory(&sim);
        for (i, t) in MotorType::ALL.into_iter().enumerate() {
            let motor = f.create(&MotorSpec::new(t, i as i32)).unwrap();
            assert_eq!(motor.motor_type(), t);
            assert_eq!(motor.can_id(), i as u8);
        }
        assert_eq!(
            sim.motor(2).unwrap().kind,
            SimMotorKind::SparkMax(SparkMotorKind::Brushless)
        );
        assert_eq!(
            sim.motor(4).unwrap().kind,
            SimMotorKind::SparkMax(SparkMotorKind::Brushed)
        );
    }

    #[test]
    fn test_negative_can_id_touches_nothing() {
        let sim = SimBackend::new();
        let err = factory(&sim).talon_srx(-1).err().unwrap();
        assert!(err.is_config());
        assert_eq!(sim.opened_count(), 0);
    }

    #[test]
    fn test_inversion_applied() {
        let sim = SimBackend::new();
        let spec = MotorSpec::new(MotorType::VictorSpx, 12).inverted(true);
        let motor = factory(&sim).create(&spec).unwrap();
        assert!(motor.inverted());
        assert!(sim.motor(12).unwrap().inverted);
    }

    #[test]
    fn test_neutral_mode_applied_to_rev() {
        let sim = SimBackend::new();
        let spec = MotorSpec::new(MotorType::SparkMax, 20).neutral_mode(NeutralMode::Brake);
        let motor = factory(&sim).create(&spec).unwrap();
        assert_eq!(motor.neutral_mode(), NeutralMode::Brake);
        assert_eq!(sim.motor(20).unwrap().idle_mode, Some(IdleMode::Brake));
    }

    #[test]
    fn test_coast_written_explicitly() {
        let sim = SimBackend::new();
        factory(&sim).talon_srx(1).unwrap();
        assert_eq!(sim.motor(1).unwrap().neutral_mode, Some(NeutralMode::Coast));
    }

    #[test]
    fn test_vendor_failure_wrapped() {
        let sim = SimBackend::new();
        sim.fail_open(DeviceAddress::Can(7));
        let err = factory(&sim).spark_max(7, true).err().unwrap();
        assert!(err.is_hardware());
        let msg = err.to_string();
        assert!(msg.contains("spark_max_brushless"));
        assert!(msg.contains("CAN 7"));
    }
}
