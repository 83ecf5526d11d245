//! Hardware abstraction layer
//!
//! Vendor SDKs (CTRE Phoenix, REV) and host devices (DIO, analog, PWM,
//! pneumatics, NetworkTables) are reached only through the traits in this
//! module. [`SimBackend`] implements all of them in-process.

mod sim;
mod traits;
mod types;

pub use sim::{
    SimAnalog, SimBackend, SimCompressor, SimEncoder, SimGyro, SimMotor, SimMotorKind,
    DEFAULT_FREE_SPEED_RPS, PHOENIX_TICKS_PER_REV,
};
pub use traits::{
    AnalogInputDevice, Backend, CompressorDevice, DeviceError, DeviceResult, DigitalInputDevice,
    EncoderDevice, GyroDevice, PhoenixMotor, RevMotor, ServoDevice, SolenoidDevice,
};
pub use types::{
    DeviceAddress, EncodingType, GyroType, IdleMode, ModuleType, NeutralMode, PhoenixModel,
    SparkMotorKind,
};

/// Highest CAN id a motor controller may use
pub const MAX_CAN_ID: i32 = 62;

/// Number of DIO channels on the roboRIO
pub const DIO_CHANNELS: u8 = 10;

/// Number of PWM channels on the roboRIO
pub const PWM_CHANNELS: u8 = 10;

/// Number of on-board analog inputs
pub const ANALOG_CHANNELS: u8 = 4;
