//! Subsystem wrappers
//!
//! Each wrapper owns its devices, validates its config before opening
//! anything, and logs through the [`Logger`](crate::Logger) it was given.
//! Gyro, pneumatics, servo, encoder and analog wrappers are early-stage.

mod analog;
mod arm;
mod encoder;
mod gyro;
mod pneumatics;
mod servo;
mod switch;
mod vision;

pub use analog::{AnalogConfig, AnalogInput, ANALOG_FULL_SCALE};
pub use arm::{Arm, ArmConfig, RetractionLimit, HOMING_POWER};
pub use encoder::{Encoder, EncoderConfig, EncoderSource};
pub use gyro::{Gyro, GyroConfig};
pub use pneumatics::{Compressor, Pneumatics, PneumaticsConfig, Solenoid, SOLENOID_CHANNELS};
pub use servo::{Servo, ServoConfig};
pub use switch::{LimitSwitch, LimitSwitchConfig};
pub use vision::{TargetData, Vision, VisionConfig, DEFAULT_VISION_TABLE};

pub use crate::hardware::{EncodingType, GyroType, ModuleType};
