//! simplibot-core: config-driven building blocks for FRC robots
//!
//! Declares a robot as data (motor types, CAN ids, subsystem settings) and
//! turns that description into working hardware handles on top of the
//! vendor motor SDKs and the host robot framework.
//!
//! # Modules
//!
//! - [`motors`] - Motor types, motor specs, per-vendor adapters and the factory
//! - [`drive`] - Two-sided differential drive
//! - [`subsystems`] - Arm, vision, gyro, pneumatics, servo, encoder, analog
//! - [`control`] - PID controller
//! - [`nt`] - NetworkTables key/value access
//! - [`robot`] - Robot configuration, builder and lifecycle hooks
//! - [`hardware`] - Vendor/host boundary traits and the simulated backend
//! - [`settings`] - Key/value store for tuning constants
//! - [`logging`] - Component-scoped log handles
//!
//! # Architecture
//!
//! ```text
//! RobotConfig (TOML / code)          simplibot-core                 host + vendor SDKs
//! ┌──────────────┐   validate   ┌──────────────────┐   open    ┌──────────────────┐
//! │ drive, arm,  │─────────────►│   RobotBuilder   │──────────►│ dyn Backend      │
//! │ vision, ...  │              │  MotorFactory    │           │ (real or SimBack)│
//! └──────────────┘              └──────────────────┘           └──────────────────┘
//! ```
//!
//! Validation happens before any device is opened, so a bad config never
//! leaves half-constructed hardware behind.

#![warn(unused_must_use)]

pub mod control;
pub mod drive;
pub mod hardware;
pub mod logging;
pub mod motors;
pub mod nt;
pub mod robot;
pub mod settings;
pub mod subsystems;

// Re-exports for convenience
pub use control::{PidConfig, PidController};
pub use drive::{Drive, DriveConfig, DriveOutput};
pub use hardware::{Backend, SimBackend};
pub use logging::Logger;
pub use motors::{MotorController, MotorFactory, MotorSpec, MotorType, NeutralMode};
pub use nt::{LocalNetworkTables, NetworkTable, Value};
pub use robot::{
    create_robot, Behavior, Robot, RobotBuilder, RobotConfig, RobotLifecycle, RobotMode,
    SubsystemFault, Subsystems,
};
pub use settings::Settings;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for simplibot-core
///
/// Configuration errors are always raised before any hardware is touched.
/// Hardware errors come from a vendor SDK or the host framework and carry
/// the device that failed.
///
/// # Example
/// ```ignore
/// match RobotBuilder::new(backend).build(&config) {
///     Ok(robot) => { /* run it */ },
///     Err(Error::Config(msg)) => eprintln!("Fix robot.toml: {}", msg),
///     Err(e) => return Err(e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[must_use = "errors must be handled or explicitly ignored with let _ = ..."]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration: bad motor type, CAN id out of range, duplicate ids.
    /// Handle by: fixing the robot description. Nothing was opened.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A vendor SDK or host call failed.
    /// Handle by: checking wiring and CAN ids, disabling the affected subsystem.
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// A runtime command argument is out of range.
    /// Handle by: clamping or scaling inputs before commanding.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation attempted in invalid state (e.g., extending an arm without an encoder).
    /// Handle by: checking subsystem state before operations.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A NetworkTables listener lost its source.
    /// Handle by: re-subscribing to the entry.
    #[error("Channel closed")]
    ChannelClosed,
}

impl Error {
    /// Whether this error came from configuration validation
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Whether this error came from a device call
    pub fn is_hardware(&self) -> bool {
        matches!(self, Error::Hardware(_))
    }

    /// Prefix a configuration error with the field path it came from
    pub(crate) fn in_field(self, path: &str) -> Self {
        match self {
            Error::Config(msg) => Error::Config(format!("{}: {}", path, msg)),
            other => other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Config(format!("I/O error: {}", e))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(format!("TOML parse error: {}", e))
    }
}

/// Result type alias for simplibot-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Check that `value` lies in `[min, max]`, producing a config error naming `field`
pub(crate) fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    // written this way so NaN fails
    if !(value >= min && value <= max) {
        return Err(Error::Config(format!(
            "{} must be between {} and {}, got {}",
            field, min, max, value
        )));
    }
    Ok(())
}

/// Check a runtime command argument lies in `[-1, 1]`
pub(crate) fn check_unit(what: &str, value: f64) -> Result<()> {
    if !(-1.0..=1.0).contains(&value) {
        return Err(Error::Validation(format!(
            "{} must be between -1 and 1, got {}",
            what, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(Error::Config("x".into()).is_config());
        assert!(Error::Hardware("x".into()).is_hardware());
        assert!(!Error::Validation("x".into()).is_config());
    }

    #[test]
    fn test_check_range() {
        assert!(check_range("can_id", 62, 0, 62).is_ok());
        let err = check_range("can_id", 63, 0, 62).unwrap_err();
        assert!(err.to_string().contains("can_id"));
    }

    #[test]
    fn test_check_unit() {
        assert!(check_unit("speed", -1.0).is_ok());
        assert!(matches!(check_unit("speed", 1.5), Err(Error::Validation(_))));
        assert!(check_unit("speed", f64::NAN).is_err());
    }
}
