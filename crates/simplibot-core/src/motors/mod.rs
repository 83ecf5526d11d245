//! Motor controllers
//!
//! A [`MotorSpec`] names a controller type, CAN id and a few settings.
//! [`MotorFactory`] turns specs into [`MotorController`] handles, hiding
//! the differences between the CTRE and REV SDKs.

mod controller;
mod factory;

pub use controller::{MotorController, PhoenixController, SparkMaxController};
pub use factory::MotorFactory;
pub use crate::hardware::NeutralMode;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::hardware::MAX_CAN_ID;
use crate::{Error, Result};

/// Supported motor controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MotorType {
    /// CTRE Talon SRX
    TalonSrx,
    /// CTRE Victor SPX (no sensor port)
    VictorSpx,
    /// REV Spark MAX driving a brushless motor
    SparkMax,
    /// REV Spark MAX, brushless, spelled out
    SparkMaxBrushless,
    /// REV Spark MAX driving a brushed motor
    SparkMaxBrushed,
}

impl MotorType {
    /// All types, in declaration order
    pub const ALL: [MotorType; 5] = [
        Self::TalonSrx,
        Self::VictorSpx,
        Self::SparkMax,
        Self::SparkMaxBrushless,
        Self::SparkMaxBrushed,
    ];

    /// Configuration tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TalonSrx => "talon_srx",
            Self::VictorSpx => "victor_spx",
            Self::SparkMax => "spark_max",
            Self::SparkMaxBrushless => "spark_max_brushless",
            Self::SparkMaxBrushed => "spark_max_brushed",
        }
    }

    /// Whether this is a CTRE Phoenix controller
    pub fn is_phoenix(&self) -> bool {
        matches!(self, Self::TalonSrx | Self::VictorSpx)
    }

    /// Whether position and velocity can be read back
    pub fn has_encoder(&self) -> bool {
        !matches!(self, Self::VictorSpx)
    }
}

impl fmt::Display for MotorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| {
                Error::Config(format!(
                    "unknown motor type '{}' (expected one of: talon_srx, victor_spx, spark_max, spark_max_brushless, spark_max_brushed)",
                    s
                ))
            })
    }
}

impl TryFrom<String> for MotorType {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MotorType> for String {
    fn from(t: MotorType) -> Self {
        t.as_str().to_string()
    }
}

/// Declarative description of one motor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorSpec {
    #[serde(rename = "type", alias = "motor_type")]
    pub motor_type: MotorType,
    /// CAN bus id, 0..=62
    pub can_id: i32,
    /// Reverse the motor direction at the controller
    #[serde(default)]
    pub inverted: bool,
    #[serde(default)]
    pub neutral_mode: NeutralMode,
}

impl MotorSpec {
    /// Create a non-inverted, coasting motor spec
    pub fn new(motor_type: MotorType, can_id: i32) -> Self {
        Self {
            motor_type,
            can_id,
            inverted: false,
            neutral_mode: NeutralMode::Coast,
        }
    }

    /// Set inversion
    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Set neutral mode
    pub fn neutral_mode(mut self, mode: NeutralMode) -> Self {
        self.neutral_mode = mode;
        self
    }

    /// Check the CAN id without touching hardware
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_CAN_ID).contains(&self.can_id) {
            return Err(Error::Config(format!(
                "CAN id {} for {} is out of range 0..={}",
                self.can_id, self.motor_type, MAX_CAN_ID
            )));
        }
        Ok(())
    }

    /// CAN id as sent on the bus; only meaningful after [`validate`](Self::validate)
    pub(crate) fn bus_id(&self) -> u8 {
        self.can_id.clamp(0, MAX_CAN_ID) as u8
    }
}

/// Reject any CAN id used by more than one motor
///
/// Each item is the motor's field path (used in the message) and its spec.
pub fn validate_unique_can_ids<'a, I>(motors: I) -> Result<()>
where
    I: IntoIterator<Item = (String, &'a MotorSpec)>,
{
    let mut seen: HashMap<i32, String> = HashMap::new();
    for (path, spec) in motors {
        if let Some(first) = seen.get(&spec.can_id) {
            return Err(Error::Config(format!(
                "duplicate CAN id {}: {} and {}",
                spec.can_id, first, path
            )));
        }
        seen.insert(spec.can_id, path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_motor_type() {
        assert_eq!("talon_srx".parse::<MotorType>().unwrap(), MotorType::TalonSrx);
        assert_eq!("SPARK_MAX".parse::<MotorType>().unwrap(), MotorType::SparkMax);
        let err = "falcon_500".parse::<MotorType>().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("falcon_500"));
    }

    #[test]
    fn test_display_round_trip() {
        for t in MotorType::ALL {
            assert_eq!(t.to_string().parse::<MotorType>().unwrap(), t);
        }
    }

    #[test]
    fn test_spec_validate() {
        assert!(MotorSpec::new(MotorType::TalonSrx, 0).validate().is_ok());
        assert!(MotorSpec::new(MotorType::TalonSrx, 62).validate().is_ok());
        let err = MotorSpec::new(MotorType::TalonSrx, -1).validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("-1"));
        assert!(MotorSpec::new(MotorType::SparkMax, 63).validate().is_err());
    }

    #[test]
    fn test_spec_from_toml() {
        let spec: MotorSpec =
            toml::from_str("type = \"spark_max_brushed\"\ncan_id = 4\ninverted = true").unwrap();
        assert_eq!(spec.motor_type, MotorType::SparkMaxBrushed);
        assert!(spec.inverted);
        assert_eq!(spec.neutral_mode, NeutralMode::Coast);

        let bad: std::result::Result<MotorSpec, _> = toml::from_str("type = \"cim\"\ncan_id = 4");
        assert!(bad.is_err());
    }

    #[test]
    fn test_unique_can_ids() {
        let a = MotorSpec::new(MotorType::TalonSrx, 1);
        let b = MotorSpec::new(MotorType::VictorSpx, 2);
        let c = MotorSpec::new(MotorType::SparkMax, 1);
        assert!(validate_unique_can_ids(vec![("a".to_string(), &a), ("b".to_string(), &b)]).is_ok());
        let err = validate_unique_can_ids(vec![
            ("left[0]".to_string(), &a),
            ("left[1]".to_string(), &b),
            ("right[0]".to_string(), &c),
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("duplicate CAN id 1"));
        assert!(msg.contains("right[0]"));
    }
}
