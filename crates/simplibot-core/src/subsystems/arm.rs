//! Arm with optional intake rollers
//!
//! The arm swings out from a retracted rest position that is marked by a
//! limit switch. Extension is negative motor power and reads as a negative
//! angle. [`Arm::extend`] and [`Arm::retract`] are meant to be called once
//! per periodic cycle; each call takes one step toward the target and
//! slows down near it.

use serde::{Deserialize, Serialize};

use super::switch::{LimitSwitch, LimitSwitchConfig};
use crate::hardware::Backend;
use crate::logging::Logger;
use crate::motors::{
    validate_unique_can_ids, MotorController, MotorFactory, MotorSpec, MotorType, NeutralMode,
};
use crate::{check_range, check_unit, Error, Result};

/// Power used to creep back onto the limit switch
pub const HOMING_POWER: f64 = 0.05;

/// What marks the retracted position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetractionLimit {
    /// Stop when the limit switch closes
    #[default]
    Switch,
    /// Stop when the encoder reads zero
    Encoder,
}

/// Arm configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmConfig {
    pub arm_motor: MotorSpec,
    #[serde(default)]
    pub roller_motor: Option<MotorSpec>,
    /// DIO channel of the retraction limit switch
    #[serde(default)]
    pub limit_switch_channel: u8,
    /// Motor rotations per arm rotation
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f64,
    /// Power for D-pad control, [0, 1]
    #[serde(default = "default_manual_power")]
    pub manual_power: f64,
    /// Peak power of the slow-down ramp, [0, 1]
    #[serde(default = "default_auto_power")]
    pub auto_power: f64,
    /// Roller power at full direction, [0, 1]
    #[serde(default = "default_roller_power")]
    pub roller_power: f64,
    /// Extension target in degrees from the rest position
    #[serde(default = "default_extension_angle")]
    pub extension_angle: f64,
    #[serde(default)]
    pub retraction_limit: RetractionLimit,
    /// Keep driving past the extension target
    #[serde(default)]
    pub override_extend_limit: bool,
}

fn default_gear_ratio() -> f64 {
    64.0
}

fn default_manual_power() -> f64 {
    0.15
}

fn default_auto_power() -> f64 {
    0.25
}

fn default_roller_power() -> f64 {
    0.3
}

fn default_extension_angle() -> f64 {
    45.0
}

impl ArmConfig {
    /// Spark MAX brushless arm motor, no rollers, switch on DIO 0
    pub fn new(arm_can_id: i32) -> Self {
        Self {
            arm_motor: MotorSpec::new(MotorType::SparkMaxBrushless, arm_can_id),
            roller_motor: None,
            limit_switch_channel: 0,
            gear_ratio: default_gear_ratio(),
            manual_power: default_manual_power(),
            auto_power: default_auto_power(),
            roller_power: default_roller_power(),
            extension_angle: default_extension_angle(),
            retraction_limit: RetractionLimit::Switch,
            override_extend_limit: false,
        }
    }

    /// Add a roller motor; rollers always brake
    pub fn with_roller(mut self, spec: MotorSpec) -> Self {
        self.roller_motor = Some(spec.neutral_mode(NeutralMode::Brake));
        self
    }

    pub fn with_limit_switch(mut self, channel: u8) -> Self {
        self.limit_switch_channel = channel;
        self
    }

    pub fn with_retraction_limit(mut self, limit: RetractionLimit) -> Self {
        self.retraction_limit = limit;
        self
    }

    /// Every motor with its field path
    pub fn motors(&self) -> impl Iterator<Item = (String, &MotorSpec)> {
        std::iter::once(("arm_motor".to_string(), &self.arm_motor)).chain(
            self.roller_motor
                .iter()
                .map(|m| ("roller_motor".to_string(), m)),
        )
    }

    pub fn validate(&self) -> Result<()> {
        check_range("manual_power", self.manual_power, 0.0, 1.0)?;
        check_range("auto_power", self.auto_power, 0.0, 1.0)?;
        check_range("roller_power", self.roller_power, 0.0, 1.0)?;
        if !(self.gear_ratio > 0.0) {
            return Err(Error::Config(format!(
                "gear_ratio must be positive, got {}",
                self.gear_ratio
            )));
        }
        if !(self.extension_angle > 0.0) {
            return Err(Error::Config(format!(
                "extension_angle must be positive, got {}",
                self.extension_angle
            )));
        }
        LimitSwitchConfig::new(self.limit_switch_channel)
            .validate()
            .map_err(|e| e.in_field("limit_switch_channel"))?;
        for (path, spec) in self.motors() {
            spec.validate().map_err(|e| e.in_field(&path))?;
        }
        validate_unique_can_ids(self.motors())
    }
}

/// Arm subsystem
pub struct Arm {
    config: ArmConfig,
    motor: Box<dyn MotorController>,
    roller: Option<Box<dyn MotorController>>,
    limit: LimitSwitch,
    has_encoder: bool,
    extended: bool,
    retracted: bool,
    calibrated: bool,
    initialized: bool,
    target_extended: bool,
    switching: bool,
    logger: Logger,
}

impl std::fmt::Debug for Arm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arm")
            .field("motor", &self.motor.describe())
            .field("extended", &self.extended)
            .field("retracted", &self.retracted)
            .field("calibrated", &self.calibrated)
            .finish()
    }
}

impl Arm {
    pub fn new(config: &ArmConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("arm"))?;
        let logger = logger.child("Arm");
        let factory = MotorFactory::new(backend, &logger);

        let mut motor = factory.create(&config.arm_motor)?;
        let has_encoder = match motor.set_position(0.0) {
            Ok(()) => true,
            Err(e) => {
                logger.warn(format!("arm encoder not available: {}", e));
                false
            }
        };

        let roller = match &config.roller_motor {
            Some(spec) => Some(factory.create(&spec.neutral_mode(NeutralMode::Brake))?),
            None => {
                logger.info("no roller motor configured");
                None
            }
        };

        let limit = LimitSwitch::new(
            LimitSwitchConfig::new(config.limit_switch_channel),
            backend,
            &logger,
        )?;

        logger.info(format!("arm ready on {}", motor.describe()));
        Ok(Self {
            config: config.clone(),
            motor,
            roller,
            limit,
            has_encoder,
            extended: false,
            retracted: false,
            calibrated: false,
            initialized: false,
            target_extended: false,
            switching: false,
            logger,
        })
    }

    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    /// Arm angle in degrees, negative when extended
    pub fn angle(&self) -> Result<f64> {
        if !self.has_encoder {
            return Err(self.no_encoder("read angle"));
        }
        Ok(self.motor.position()? / self.config.gear_ratio * 360.0)
    }

    /// Degrees travelled out from rest, never negative
    fn extension(&self) -> Result<f64> {
        Ok((-self.angle()?).max(0.0))
    }

    /// One step toward the extension target
    pub fn extend(&mut self) -> Result<()> {
        if !self.has_encoder {
            return Err(self.no_encoder("extend"));
        }
        self.target_extended = true;
        self.switching = true;
        self.retracted = false;

        let travelled = self.extension()?;
        let target = self.config.extension_angle;
        if travelled >= target && !self.config.override_extend_limit {
            self.motor.stop()?;
            self.extended = true;
            self.switching = false;
            return Ok(());
        }

        let power = if travelled > target * 2.0 / 3.0 {
            ((1.0 - travelled / target) * self.config.auto_power).max(HOMING_POWER)
        } else {
            self.config.manual_power
        };
        self.drive_arm(-power)
    }

    /// One step toward the retracted position
    pub fn retract(&mut self) -> Result<()> {
        if !self.has_encoder {
            return Err(self.no_encoder("retract"));
        }
        self.target_extended = false;
        self.switching = true;
        self.extended = false;

        let travelled = self.extension()?;
        let at_rest = match self.config.retraction_limit {
            RetractionLimit::Switch => self.limit.get(),
            RetractionLimit::Encoder => travelled <= 0.0,
        };
        if at_rest {
            self.calibrate()?;
            self.switching = false;
            return Ok(());
        }

        let target = self.config.extension_angle;
        let power = if travelled > target / 3.0 {
            self.config.manual_power
        } else {
            (travelled / target * self.config.auto_power).max(HOMING_POWER)
        };
        self.drive_arm(power)
    }

    /// Flip the target on a button press, then keep moving toward it
    ///
    /// Call every cycle with the button state; presses while the arm is
    /// still moving are ignored.
    pub fn toggle(&mut self, pressed: bool) -> Result<()> {
        if pressed && !self.switching {
            self.target_extended = !self.target_extended;
            self.switching = true;
        }
        if !self.switching {
            return Ok(());
        }
        if self.target_extended {
            self.extend()
        } else {
            self.retract()
        }
    }

    /// Refresh the extended/retracted flags and recalibrate at the switch
    pub fn check_position(&mut self) -> Result<()> {
        if !self.has_encoder {
            return Ok(());
        }
        let angle = self.angle()?;
        self.extended =
            -angle >= self.config.extension_angle && !self.config.override_extend_limit;

        if self.limit.get() && !self.calibrated {
            self.motor.set_position(0.0)?;
            self.calibrated = true;
            self.retracted = true;
            self.logger.info("calibrated at retracted position");
        } else if angle.trunc() != 0.0 {
            self.retracted = false;
            self.calibrated = false;
        }
        Ok(())
    }

    /// D-pad control: 90 extends, 270 retracts, anything else stops
    pub fn manual_control(&mut self, pov: i32) -> Result<()> {
        self.check_position()?;
        let direction = match pov {
            90 => -1.0,
            270 => 1.0,
            _ => 0.0,
        };
        if direction < 0.0 && !self.extended {
            self.drive_arm(direction * self.config.manual_power)
        } else if direction > 0.0 && !self.retracted {
            self.drive_arm(direction * self.config.manual_power)
        } else {
            self.motor.stop()
        }
    }

    /// Spin the rollers; `direction` in [-1, 1] scales the roller power
    pub fn activate_rollers(&mut self, direction: f64) -> Result<()> {
        check_unit("roller direction", direction)?;
        match self.roller.as_mut() {
            Some(roller) => roller.set(direction * self.config.roller_power),
            None => {
                self.logger.warn("roller motor not configured");
                Ok(())
            }
        }
    }

    /// Stop the arm and mark the current position as rest
    pub fn calibrate(&mut self) -> Result<()> {
        self.motor.stop()?;
        if self.has_encoder {
            self.motor.set_position(0.0)?;
        }
        self.retracted = true;
        self.calibrated = true;
        self.logger.info("calibrated");
        Ok(())
    }

    /// Creep back to the switch and calibrate; call each cycle until it settles
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        if !self.calibrated {
            self.drive_arm(HOMING_POWER)?;
        }
        if self.limit.pressed() {
            self.initialized = true;
            self.calibrate()?;
            self.logger.info("initialized");
        }
        Ok(())
    }

    /// Stop the arm and rollers
    pub fn stop(&mut self) -> Result<()> {
        self.switching = false;
        let arm = self.motor.stop();
        if let Some(roller) = self.roller.as_mut() {
            roller.stop()?;
        }
        arm
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn is_retracted(&self) -> bool {
        self.retracted
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a toggle is still in progress
    pub fn is_moving(&self) -> bool {
        self.switching
    }

    pub fn motor(&self) -> &dyn MotorController {
        self.motor.as_ref()
    }

    fn drive_arm(&mut self, power: f64) -> Result<()> {
        self.motor.set(power).map_err(|e| {
            self.logger.error_with("arm command failed", &e);
            // leave the arm unpowered rather than at its last output
            let _ = self.motor.stop();
            e
        })
    }

    fn no_encoder(&self, action: &str) -> Error {
        let err = Error::InvalidState(format!(
            "cannot {}: {} has no encoder",
            action,
            self.motor.describe()
        ));
        self.logger.error(&err);
        err
    }
}
