//! Vendor and host device traits
//!
//! These mirror the surface of the CTRE Phoenix and REV SDKs and the
//! WPILib host classes this crate is built on. They are the only place
//! that talks to hardware; everything above goes through [`Backend`].

use std::sync::Arc;

use super::types::{
    EncodingType, GyroType, IdleMode, ModuleType, NeutralMode, PhoenixModel, SparkMotorKind,
};
use crate::nt::NetworkTablesBackend;

/// Error raised by a vendor SDK or host call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DeviceError(pub String);

impl DeviceError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Result of a vendor or host call
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// CTRE Phoenix motor controller (Talon SRX, Victor SPX)
pub trait PhoenixMotor: Send {
    /// Command percent output in [-1, 1]
    fn set_percent_output(&mut self, output: f64) -> DeviceResult<()>;

    /// Last applied percent output
    fn motor_output_percent(&self) -> f64;

    fn set_inverted(&mut self, inverted: bool) -> DeviceResult<()>;

    fn set_neutral_mode(&mut self, mode: NeutralMode) -> DeviceResult<()>;

    /// Selected sensor position in native ticks
    fn selected_sensor_position(&self) -> DeviceResult<f64>;

    /// Selected sensor velocity in native ticks per 100 ms
    fn selected_sensor_velocity(&self) -> DeviceResult<f64>;

    fn set_selected_sensor_position(&mut self, ticks: f64) -> DeviceResult<()>;
}

/// REV Spark MAX motor controller
pub trait RevMotor: Send {
    /// Command duty cycle in [-1, 1]
    fn set(&mut self, speed: f64) -> DeviceResult<()>;

    fn get(&self) -> f64;

    fn set_inverted(&mut self, inverted: bool) -> DeviceResult<()>;

    fn set_idle_mode(&mut self, mode: IdleMode) -> DeviceResult<()>;

    /// Built-in encoder position in rotations
    fn encoder_position(&self) -> DeviceResult<f64>;

    /// Built-in encoder velocity in RPM
    fn encoder_velocity(&self) -> DeviceResult<f64>;

    fn set_encoder_position(&mut self, rotations: f64) -> DeviceResult<()>;
}

/// Digital input on a DIO channel
pub trait DigitalInputDevice: Send {
    fn get(&self) -> DeviceResult<bool>;
}

pub trait GyroDevice: Send {
    /// Heading in degrees, clockwise positive
    fn angle(&self) -> DeviceResult<f64>;
    /// Turn rate in degrees per second
    fn rate(&self) -> DeviceResult<f64>;
    fn reset(&mut self) -> DeviceResult<()>;
    fn calibrate(&mut self) -> DeviceResult<()>;
}

pub trait SolenoidDevice: Send {
    fn set(&mut self, on: bool) -> DeviceResult<()>;
    fn get(&self) -> DeviceResult<bool>;
}

pub trait CompressorDevice: Send {
    /// Enable closed-loop control off the digital pressure switch
    fn enable_digital(&mut self) -> DeviceResult<()>;
    fn disable(&mut self) -> DeviceResult<()>;
    fn is_enabled(&self) -> DeviceResult<bool>;
    /// Pressure in PSI, `None` if the module has no analog sensor
    fn pressure(&self) -> Option<f64>;
}

/// PWM servo
pub trait ServoDevice: Send {
    /// Position in [0, 1]
    fn set_position(&mut self, position: f64) -> DeviceResult<()>;
    fn position(&self) -> DeviceResult<f64>;
}

/// Quadrature encoder on two DIO channels
pub trait EncoderDevice: Send {
    fn raw(&self) -> DeviceResult<i64>;
    /// Distance in user units (raw count times distance per pulse)
    fn distance(&self) -> DeviceResult<f64>;
    /// Rate in user units per second
    fn rate(&self) -> DeviceResult<f64>;
    fn set_distance_per_pulse(&mut self, distance: f64) -> DeviceResult<()>;
    fn reset(&mut self) -> DeviceResult<()>;
}

/// 12-bit analog input
pub trait AnalogInputDevice: Send {
    fn voltage(&self) -> DeviceResult<f64>;
    fn average_voltage(&self) -> DeviceResult<f64>;
    fn value(&self) -> DeviceResult<i32>;
    fn set_average_bits(&mut self, bits: u32) -> DeviceResult<()>;
    fn set_oversample_bits(&mut self, bits: u32) -> DeviceResult<()>;
}

/// Opens devices on the host
///
/// Implementations: the simulated [`SimBackend`](super::SimBackend), or a
/// bridge to the real vendor SDKs on the roboRIO. Opening an address that
/// is already claimed must fail.
pub trait Backend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    fn open_phoenix(&self, model: PhoenixModel, can_id: u8) -> DeviceResult<Box<dyn PhoenixMotor>>;

    fn open_spark_max(&self, can_id: u8, kind: SparkMotorKind) -> DeviceResult<Box<dyn RevMotor>>;

    fn open_digital_input(&self, channel: u8) -> DeviceResult<Box<dyn DigitalInputDevice>>;

    fn open_gyro(&self, gyro_type: GyroType, port: u8) -> DeviceResult<Box<dyn GyroDevice>>;

    fn open_solenoid(
        &self,
        module: ModuleType,
        module_id: u8,
        channel: u8,
    ) -> DeviceResult<Box<dyn SolenoidDevice>>;

    fn open_compressor(
        &self,
        module: ModuleType,
        module_id: u8,
    ) -> DeviceResult<Box<dyn CompressorDevice>>;

    fn open_servo(&self, channel: u8) -> DeviceResult<Box<dyn ServoDevice>>;

    fn open_quadrature_encoder(
        &self,
        channel_a: u8,
        channel_b: u8,
        encoding: EncodingType,
        reversed: bool,
    ) -> DeviceResult<Box<dyn EncoderDevice>>;

    fn open_analog_input(&self, channel: u8) -> DeviceResult<Box<dyn AnalogInputDevice>>;

    /// Handle to the host's NetworkTables instance
    fn network_tables(&self) -> DeviceResult<Arc<dyn NetworkTablesBackend>>;
}
