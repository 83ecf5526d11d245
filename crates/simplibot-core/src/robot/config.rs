//! Whole-robot configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::drive::DriveConfig;
use crate::hardware::GyroType;
use crate::motors::{validate_unique_can_ids, MotorSpec};
use crate::nt::DEFAULT_TABLE;
use crate::subsystems::{
    AnalogConfig, ArmConfig, EncoderConfig, GyroConfig, PneumaticsConfig, ServoConfig,
    VisionConfig,
};
use crate::{Error, Result};

/// Default robot name
pub const DEFAULT_ROBOT_NAME: &str = "simplibot Robot";

/// Robot-wide NetworkTables table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTablesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

fn default_true() -> bool {
    true
}

fn default_table_name() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_robot_name() -> String {
    DEFAULT_ROBOT_NAME.to_string()
}

impl Default for NetworkTablesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            table_name: default_table_name(),
        }
    }
}

/// Every subsystem the robot should build. Absent sections are not built.
///
/// # Example
/// ```
/// use simplibot_core::RobotConfig;
///
/// let config = RobotConfig::from_toml_str(r#"
///     robot_name = "Practice Bot"
///
///     [drive]
///     left_motors = [{ type = "talon_srx", can_id = 1 }]
///     right_motors = [{ type = "talon_srx", can_id = 2 }]
///     max_power = 0.8
/// "#).unwrap();
///
/// assert_eq!(config.robot_name, "Practice Bot");
/// assert!(config.arm.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    #[serde(default = "default_robot_name")]
    pub robot_name: String,
    #[serde(default)]
    pub drive: Option<DriveConfig>,
    #[serde(default)]
    pub arm: Option<ArmConfig>,
    #[serde(default)]
    pub vision: Option<VisionConfig>,
    #[serde(default)]
    pub gyro: Option<GyroConfig>,
    #[serde(default)]
    pub pneumatics: Option<PneumaticsConfig>,
    #[serde(default)]
    pub servos: Vec<ServoConfig>,
    #[serde(default)]
    pub encoders: Vec<EncoderConfig>,
    #[serde(default)]
    pub analog_inputs: Vec<AnalogConfig>,
    #[serde(default)]
    pub network_tables: NetworkTablesConfig,
    /// Install the fmt subscriber and log construction steps
    #[serde(default = "default_true")]
    pub enable_logging: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            robot_name: default_robot_name(),
            drive: None,
            arm: None,
            vision: None,
            gyro: None,
            pneumatics: None,
            servos: Vec::new(),
            encoders: Vec::new(),
            analog_inputs: Vec::new(),
            network_tables: NetworkTablesConfig::default(),
            enable_logging: true,
        }
    }
}

impl RobotConfig {
    pub fn new(robot_name: impl Into<String>) -> Self {
        Self {
            robot_name: robot_name.into(),
            ..Default::default()
        }
    }

    pub fn with_drive(mut self, drive: DriveConfig) -> Self {
        self.drive = Some(drive);
        self
    }

    pub fn with_arm(mut self, arm: ArmConfig) -> Self {
        self.arm = Some(arm);
        self
    }

    pub fn with_vision(mut self, vision: VisionConfig) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_gyro(mut self, gyro: GyroConfig) -> Self {
        self.gyro = Some(gyro);
        self
    }

    pub fn with_pneumatics(mut self, pneumatics: PneumaticsConfig) -> Self {
        self.pneumatics = Some(pneumatics);
        self
    }

    pub fn with_servo(mut self, servo: ServoConfig) -> Self {
        self.servos.push(servo);
        self
    }

    pub fn with_encoder(mut self, encoder: EncoderConfig) -> Self {
        self.encoders.push(encoder);
        self
    }

    pub fn with_analog_input(mut self, input: AnalogConfig) -> Self {
        self.analog_inputs.push(input);
        self
    }

    pub fn with_network_tables(mut self, enabled: bool, table_name: impl Into<String>) -> Self {
        self.network_tables = NetworkTablesConfig {
            enabled,
            table_name: table_name.into(),
        };
        self
    }

    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(format!("cannot serialize config: {}", e)))
    }

    /// Every motor on the robot with its field path
    pub fn motors(&self) -> Vec<(String, &MotorSpec)> {
        let mut motors = Vec::new();
        if let Some(drive) = &self.drive {
            motors.extend(drive.motors().map(|(p, m)| (format!("drive.{}", p), m)));
        }
        if let Some(arm) = &self.arm {
            motors.extend(arm.motors().map(|(p, m)| (format!("arm.{}", p), m)));
        }
        for (i, encoder) in self.encoders.iter().enumerate() {
            if let Some(spec) = encoder.motor_spec() {
                motors.push((format!("encoders[{}].motor", i), spec));
            }
        }
        motors
    }

    /// Every DIO channel in use with its field path
    pub fn dio_channels(&self) -> Vec<(String, u8)> {
        let mut channels = Vec::new();
        if let Some(arm) = &self.arm {
            channels.push(("arm.limit_switch_channel".to_string(), arm.limit_switch_channel));
        }
        for (i, encoder) in self.encoders.iter().enumerate() {
            channels.extend(
                encoder
                    .dio_channels()
                    .into_iter()
                    .map(|ch| (format!("encoders[{}]", i), ch)),
            );
        }
        channels
    }

    /// Every analog input channel in use with its field path
    pub fn analog_channels(&self) -> Vec<(String, u8)> {
        let mut channels = Vec::new();
        if let Some(gyro) = &self.gyro {
            if gyro.gyro_type == GyroType::Analog {
                channels.push(("gyro.port".to_string(), gyro.port));
            }
        }
        for (i, input) in self.analog_inputs.iter().enumerate() {
            channels.push((format!("analog_inputs[{}]", i), input.channel));
        }
        channels
    }

    /// Check every section, then that no DIO channel, analog channel or
    /// CAN id is used twice anywhere on the robot
    pub fn validate(&self) -> Result<()> {
        if self.robot_name.trim().is_empty() {
            return Err(Error::Config("robot_name must not be empty".into()));
        }
        if let Some(drive) = &self.drive {
            drive.validate().map_err(|e| e.in_field("drive"))?;
        }
        if let Some(arm) = &self.arm {
            arm.validate().map_err(|e| e.in_field("arm"))?;
        }
        if let Some(vision) = &self.vision {
            vision.validate().map_err(|e| e.in_field("vision"))?;
        }
        if let Some(gyro) = &self.gyro {
            gyro.validate().map_err(|e| e.in_field("gyro"))?;
        }
        if let Some(pneumatics) = &self.pneumatics {
            pneumatics.validate().map_err(|e| e.in_field("pneumatics"))?;
        }
        for (i, servo) in self.servos.iter().enumerate() {
            servo
                .validate()
                .map_err(|e| e.in_field(&format!("servos[{}]", i)))?;
            if self.servos[..i].iter().any(|s| s.channel == servo.channel) {
                return Err(Error::Config(format!(
                    "servos[{}]: PWM channel {} used twice",
                    i, servo.channel
                )));
            }
        }
        for (i, encoder) in self.encoders.iter().enumerate() {
            encoder
                .validate()
                .map_err(|e| e.in_field(&format!("encoders[{}]", i)))?;
        }
        for (i, input) in self.analog_inputs.iter().enumerate() {
            input
                .validate()
                .map_err(|e| e.in_field(&format!("analog_inputs[{}]", i)))?;
        }
        if self.network_tables.enabled && self.network_tables.table_name.trim().is_empty() {
            return Err(Error::Config(
                "network_tables.table_name must not be empty".into(),
            ));
        }
        validate_unique_channels("DIO", self.dio_channels())?;
        validate_unique_channels("analog", self.analog_channels())?;
        validate_unique_can_ids(self.motors())
    }
}

fn validate_unique_channels(bus: &str, channels: Vec<(String, u8)>) -> Result<()> {
    let mut seen: HashMap<u8, String> = HashMap::new();
    for (path, channel) in channels {
        if let Some(first) = seen.get(&channel) {
            return Err(Error::Config(format!(
                "{} channel {} used by both {} and {}",
                bus, channel, first, path
            )));
        }
        seen.insert(channel, path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motors::MotorType;

    fn drive() -> DriveConfig {
        DriveConfig::new(
            vec![MotorSpec::new(MotorType::TalonSrx, 1)],
            vec![MotorSpec::new(MotorType::TalonSrx, 2)],
        )
    }

    #[test]
    fn test_defaults() {
        let config = RobotConfig::from_toml_str("").unwrap();
        assert_eq!(config.robot_name, DEFAULT_ROBOT_NAME);
        assert!(config.network_tables.enabled);
        assert_eq!(config.network_tables.table_name, "datatable");
        assert!(config.enable_logging);
        assert!(config.drive.is_none());
    }

    #[test]
    fn test_full_toml() {
        let config = RobotConfig::from_toml_str(
            r#"
            robot_name = "Comp Bot"
            enable_logging = false

            [drive]
            left_motors = [
                { type = "talon_srx", can_id = 1 },
                { type = "victor_spx", can_id = 2 },
            ]
            right_motors = [
                { type = "talon_srx", can_id = 3, inverted = true },
                { type = "victor_spx", can_id = 4 },
            ]
            max_power = 0.6

            [arm]
            arm_motor = { type = "spark_max", can_id = 10 }
            roller_motor = { type = "spark_max_brushed", can_id = 11 }
            limit_switch_channel = 2

            [gyro]
            type = "navx"

            [pneumatics]
            module_type = "rev"
            module_id = 1
            solenoid_channels = [0, 1]

            [[servos]]
            channel = 3
            max_angle = 90.0

            [network_tables]
            table_name = "telemetry"
            "#,
        )
        .unwrap();
        let drive = config.drive.as_ref().unwrap();
        assert_eq!(drive.left_motors.len(), 2);
        assert!(drive.right_motors[0].inverted);
        assert_eq!(config.arm.as_ref().unwrap().limit_switch_channel, 2);
        assert_eq!(config.servos[0].channel, 3);
        assert_eq!(config.network_tables.table_name, "telemetry");
        assert!(!config.enable_logging);
        assert_eq!(config.motors().len(), 6);
    }

    #[test]
    fn test_unknown_motor_type() {
        let err = RobotConfig::from_toml_str(
            r#"
            [drive]
            left_motors = [{ type = "falcon", can_id = 1 }]
            right_motors = [{ type = "talon_srx", can_id = 2 }]
            "#,
        )
        .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("falcon"));
    }

    #[test]
    fn test_can_id_shared_between_drive_and_arm() {
        let config = RobotConfig::new("bot")
            .with_drive(drive())
            .with_arm(ArmConfig::new(2));
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("duplicate CAN id 2"));
    }

    #[test]
    fn test_section_errors_name_the_field() {
        let config = RobotConfig::new("bot").with_drive(drive().with_max_power(1.5));
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .starts_with("Configuration error: drive: max_power"));
    }

    #[test]
    fn test_duplicate_servo_channel() {
        let config = RobotConfig::new("bot")
            .with_servo(ServoConfig::new(1))
            .with_servo(ServoConfig::new(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_limit_switch_shares_encoder_channel() {
        let config = RobotConfig::new("bot")
            .with_arm(ArmConfig::new(10).with_limit_switch(0))
            .with_encoder(EncoderConfig::new(0, 1));
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err
            .to_string()
            .contains("DIO channel 0 used by both arm.limit_switch_channel and encoders[0]"));
    }

    #[test]
    fn test_encoders_share_channel() {
        let config = RobotConfig::new("bot")
            .with_encoder(EncoderConfig::new(2, 3))
            .with_encoder(EncoderConfig::new(4, 3));
        assert!(config.validate().unwrap_err().is_config());

        let apart = RobotConfig::new("bot")
            .with_arm(ArmConfig::new(10).with_limit_switch(9))
            .with_encoder(EncoderConfig::new(2, 3))
            .with_encoder(EncoderConfig::new(4, 5));
        assert!(apart.validate().is_ok());
    }

    #[test]
    fn test_analog_gyro_shares_analog_input() {
        let config = RobotConfig::new("bot")
            .with_gyro(GyroConfig::new(GyroType::Analog, 1))
            .with_analog_input(AnalogConfig::new(1));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("analog channel 1"));

        let navx = RobotConfig::new("bot")
            .with_gyro(GyroConfig::new(GyroType::NavX, 1))
            .with_analog_input(AnalogConfig::new(1));
        assert!(navx.validate().is_ok());
    }

    #[test]
    fn test_encoder_motor_joins_can_check() {
        let config = RobotConfig::new("bot")
            .with_drive(drive())
            .with_encoder(EncoderConfig::motor(MotorSpec::new(MotorType::SparkMax, 2)));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate CAN id 2"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = RobotConfig::new("bot")
            .with_drive(drive())
            .with_gyro(GyroConfig::default());
        let text = config.to_toml_string().unwrap();
        assert_eq!(RobotConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RobotConfig::load("/nonexistent/robot.toml").unwrap_err();
        assert!(err.to_string().contains("I/O error"));
    }
}
