//! Uniform motor controller surface and the per-vendor adapters

use super::{MotorSpec, MotorType, NeutralMode};
use crate::hardware::{
    Backend, DeviceError, DeviceResult, IdleMode, PhoenixModel, PhoenixMotor, RevMotor,
    SparkMotorKind, PHOENIX_TICKS_PER_REV,
};
use crate::{check_unit, Error, Result};

/// What every motor looks like to the rest of the crate
pub trait MotorController: Send {
    fn motor_type(&self) -> MotorType;

    fn can_id(&self) -> u8;

    /// Command power in [-1, 1]
    fn set(&mut self, power: f64) -> Result<()>;

    /// Last commanded power
    fn get(&self) -> f64;

    fn set_inverted(&mut self, inverted: bool) -> Result<()>;

    fn inverted(&self) -> bool;

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result<()>;

    fn neutral_mode(&self) -> NeutralMode;

    fn has_encoder(&self) -> bool {
        self.motor_type().has_encoder()
    }

    /// Shaft position in rotations
    fn position(&self) -> Result<f64>;

    /// Shaft velocity in rotations per second
    fn velocity(&self) -> Result<f64>;

    /// Overwrite the encoder position, in rotations
    fn set_position(&mut self, rotations: f64) -> Result<()>;

    fn stop(&mut self) -> Result<()> {
        self.set(0.0)
    }

    /// `"talon_srx on CAN 3"`
    fn describe(&self) -> String {
        format!("{} on CAN {}", self.motor_type(), self.can_id())
    }
}

fn hardware_error(motor: &dyn MotorController, action: &str, e: DeviceError) -> Error {
    Error::Hardware(format!("{}: failed to {}: {}", motor.describe(), action, e))
}

fn no_encoder(motor: &dyn MotorController) -> Error {
    Error::InvalidState(format!("{} has no encoder", motor.describe()))
}

/// CTRE Talon SRX / Victor SPX
pub struct PhoenixController {
    device: Box<dyn PhoenixMotor>,
    motor_type: MotorType,
    can_id: u8,
    inverted: bool,
    neutral_mode: NeutralMode,
}

impl PhoenixController {
    /// Open the controller and apply the `MotorSpec` neutral mode and inversion
    pub(crate) fn open(backend: &dyn Backend, model: PhoenixModel, spec: &MotorSpec) -> DeviceResult<Self> {
        let can_id = spec.bus_id();
        let mut device = backend.open_phoenix(model, can_id)?;
        device.set_neutral_mode(spec.neutral_mode)?;
        device.set_inverted(spec.inverted)?;
        Ok(Self {
            device,
            motor_type: spec.motor_type,
            can_id,
            inverted: spec.inverted,
            neutral_mode: spec.neutral_mode,
        })
    }
}

impl MotorController for PhoenixController {
    fn motor_type(&self) -> MotorType {
        self.motor_type
    }

    fn can_id(&self) -> u8 {
        self.can_id
    }

    fn set(&mut self, power: f64) -> Result<()> {
        check_unit("motor power", power)?;
        self.device
            .set_percent_output(power)
            .map_err(|e| hardware_error(self, "set output", e))
    }

    fn get(&self) -> f64 {
        self.device.motor_output_percent()
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<()> {
        self.device
            .set_inverted(inverted)
            .map_err(|e| hardware_error(self, "set inversion", e))?;
        self.inverted = inverted;
        Ok(())
    }

    fn inverted(&self) -> bool {
        self.inverted
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result<()> {
        self.device
            .set_neutral_mode(mode)
            .map_err(|e| hardware_error(self, "set neutral mode", e))?;
        self.neutral_mode = mode;
        Ok(())
    }

    fn neutral_mode(&self) -> NeutralMode {
        self.neutral_mode
    }

    fn position(&self) -> Result<f64> {
        if !self.has_encoder() {
            return Err(no_encoder(self));
        }
        self.device
            .selected_sensor_position()
            .map(|ticks| ticks / PHOENIX_TICKS_PER_REV)
            .map_err(|e| hardware_error(self, "read position", e))
    }

    fn velocity(&self) -> Result<f64> {
        if !self.has_encoder() {
            return Err(no_encoder(self));
        }
        // native velocity is ticks per 100 ms
        self.device
            .selected_sensor_velocity()
            .map(|v| v * 10.0 / PHOENIX_TICKS_PER_REV)
            .map_err(|e| hardware_error(self, "read velocity", e))
    }

    fn set_position(&mut self, rotations: f64) -> Result<()> {
        if !self.has_encoder() {
            return Err(no_encoder(self));
        }
        self.device
            .set_selected_sensor_position(rotations * PHOENIX_TICKS_PER_REV)
            .map_err(|e| hardware_error(self, "reset position", e))
    }
}

/// REV Spark MAX, brushed or brushless
pub struct SparkMaxController {
    device: Box<dyn RevMotor>,
    motor_type: MotorType,
    can_id: u8,
    inverted: bool,
    neutral_mode: NeutralMode,
}

impl SparkMaxController {
    /// Open the controller and apply the `MotorSpec` idle mode and inversion
    pub(crate) fn open(backend: &dyn Backend, kind: SparkMotorKind, spec: &MotorSpec) -> DeviceResult<Self> {
        let can_id = spec.bus_id();
        let mut device = backend.open_spark_max(can_id, kind)?;
        device.set_idle_mode(IdleMode::from(spec.neutral_mode))?;
        device.set_inverted(spec.inverted)?;
        Ok(Self {
            device,
            motor_type: spec.motor_type,
            can_id,
            inverted: spec.inverted,
            neutral_mode: spec.neutral_mode,
        })
    }
}

impl MotorController for SparkMaxController {
    fn motor_type(&self) -> MotorType {
        self.motor_type
    }

    fn can_id(&self) -> u8 {
        self.can_id
    }

    fn set(&mut self, power: f64) -> Result<()> {
        check_unit("motor power", power)?;
        self.device
            .set(power)
            .map_err(|e| hardware_error(self, "set output", e))
    }

    fn get(&self) -> f64 {
        self.device.get()
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<()> {
        self.device
            .set_inverted(inverted)
            .map_err(|e| hardware_error(self, "set inversion", e))?;
        self.inverted = inverted;
        Ok(())
    }

    fn inverted(&self) -> bool {
        self.inverted
    }

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> Result<()> {
        self.device
            .set_idle_mode(IdleMode::from(mode))
            .map_err(|e| hardware_error(self, "set idle mode", e))?;
        self.neutral_mode = mode;
        Ok(())
    }

    fn neutral_mode(&self) -> NeutralMode {
        self.neutral_mode
    }

    fn position(&self) -> Result<f64> {
        self.device
            .encoder_position()
            .map_err(|e| hardware_error(self, "read position", e))
    }

    fn velocity(&self) -> Result<f64> {
        self.device
            .encoder_velocity()
            .map(|rpm| rpm / 60.0)
            .map_err(|e| hardware_error(self, "read velocity", e))
    }

    fn set_position(&mut self, rotations: f64) -> Result<()> {
        self.device
            .set_encoder_position(rotations)
            .map_err(|e| hardware_error(self, "reset position", e))
    }
}
