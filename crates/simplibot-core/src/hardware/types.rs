//! Vendor-facing enums shared by the device traits and the configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Motor behavior when commanded to zero (CTRE "neutral mode")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeutralMode {
    /// Let the motor spin down freely
    #[default]
    Coast,
    /// Short the windings to hold position
    Brake,
}

impl fmt::Display for NeutralMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coast => write!(f, "coast"),
            Self::Brake => write!(f, "brake"),
        }
    }
}

impl FromStr for NeutralMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "coast" => Ok(Self::Coast),
            "brake" => Ok(Self::Brake),
            other => Err(Error::Config(format!("unknown neutral mode '{}'", other))),
        }
    }
}

/// REV idle mode, the Spark MAX name for neutral mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdleMode {
    Coast,
    Brake,
}

impl From<NeutralMode> for IdleMode {
    fn from(mode: NeutralMode) -> Self {
        match mode {
            NeutralMode::Coast => IdleMode::Coast,
            NeutralMode::Brake => IdleMode::Brake,
        }
    }
}

/// CTRE Phoenix motor controller models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhoenixModel {
    TalonSrx,
    VictorSpx,
}

impl PhoenixModel {
    /// Whether the controller has a sensor port
    pub fn has_sensor(&self) -> bool {
        matches!(self, Self::TalonSrx)
    }
}

impl fmt::Display for PhoenixModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TalonSrx => write!(f, "Talon SRX"),
            Self::VictorSpx => write!(f, "Victor SPX"),
        }
    }
}

/// Motor attached to a Spark MAX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SparkMotorKind {
    Brushless,
    Brushed,
}

/// Gyro hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GyroType {
    /// Analog gyro on one of the roboRIO analog ports
    #[default]
    Analog,
    /// Kauai Labs navX on the MXP port
    #[serde(rename = "navx")]
    NavX,
}

impl FromStr for GyroType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "analog" => Ok(Self::Analog),
            "navx" => Ok(Self::NavX),
            other => Err(Error::Config(format!("unknown gyro type '{}'", other))),
        }
    }
}

/// Pneumatics control module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    /// CTRE Pneumatics Control Module
    #[default]
    Ctre,
    /// REV Pneumatic Hub
    Rev,
}

impl FromStr for ModuleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ctre" | "ctrepcm" => Ok(Self::Ctre),
            "rev" | "revph" => Ok(Self::Rev),
            other => Err(Error::Config(format!("unknown pneumatics module '{}'", other))),
        }
    }
}

/// Quadrature decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncodingType {
    #[serde(rename = "k1x")]
    K1X,
    #[serde(rename = "k2x")]
    K2X,
    #[default]
    #[serde(rename = "k4x")]
    K4X,
}

impl EncodingType {
    /// Counts per quadrature cycle
    pub fn multiplier(&self) -> u32 {
        match self {
            Self::K1X => 1,
            Self::K2X => 2,
            Self::K4X => 4,
        }
    }
}

/// A claimable hardware resource on the roboRIO or CAN bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceAddress {
    Can(u8),
    Dio(u8),
    Pwm(u8),
    Analog(u8),
    Mxp,
    Pneumatics { module_id: u8, channel: Option<u8> },
    NetworkTables,
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Can(id) => write!(f, "CAN {}", id),
            Self::Dio(ch) => write!(f, "DIO {}", ch),
            Self::Pwm(ch) => write!(f, "PWM {}", ch),
            Self::Analog(ch) => write!(f, "AIN {}", ch),
            Self::Mxp => write!(f, "MXP"),
            Self::Pneumatics {
                module_id,
                channel: Some(ch),
            } => write!(f, "pneumatics {} channel {}", module_id, ch),
            Self::Pneumatics {
                module_id,
                channel: None,
            } => write!(f, "pneumatics {}", module_id),
            Self::NetworkTables => write!(f, "NetworkTables"),
        }
    }
}
