//! Differential drive
//!
//! Two groups of motors, left and right. Every motor on a side receives
//! the same power each cycle. Side inversion is applied on top of each
//! motor's own inversion, so a motor that is both device-inverted and on
//! an inverted side turns the way its wiring says.

use serde::{Deserialize, Serialize};

use crate::hardware::Backend;
use crate::logging::Logger;
use crate::motors::{validate_unique_can_ids, MotorController, MotorFactory, MotorSpec};
use crate::{check_range, check_unit, Error, Result};

/// Drive configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Motors on the left side, at least one
    pub left_motors: Vec<MotorSpec>,
    /// Motors on the right side, at least one
    pub right_motors: Vec<MotorSpec>,
    /// Output ceiling applied to each side, in [0, 1]
    #[serde(default = "default_max_power")]
    pub max_power: f64,
    /// Negate every command sent to the left side
    #[serde(default = "default_invert_left")]
    pub invert_left: bool,
    /// Negate every command sent to the right side
    #[serde(default)]
    pub invert_right: bool,
}

fn default_max_power() -> f64 {
    1.0
}

fn default_invert_left() -> bool {
    true
}

impl DriveConfig {
    /// Create a config with default power and inversion
    pub fn new(left_motors: Vec<MotorSpec>, right_motors: Vec<MotorSpec>) -> Self {
        Self {
            left_motors,
            right_motors,
            max_power: default_max_power(),
            invert_left: default_invert_left(),
            invert_right: false,
        }
    }

    /// Set the power ceiling
    pub fn with_max_power(mut self, max_power: f64) -> Self {
        self.max_power = max_power;
        self
    }

    /// Set side inversion
    pub fn with_inversion(mut self, invert_left: bool, invert_right: bool) -> Self {
        self.invert_left = invert_left;
        self.invert_right = invert_right;
        self
    }

    /// Every motor with its field path, left side first
    pub fn motors(&self) -> impl Iterator<Item = (String, &MotorSpec)> {
        let left = self
            .left_motors
            .iter()
            .enumerate()
            .map(|(i, m)| (format!("left_motors[{}]", i), m));
        let right = self
            .right_motors
            .iter()
            .enumerate()
            .map(|(i, m)| (format!("right_motors[{}]", i), m));
        left.chain(right)
    }

    /// Check the config without touching hardware
    pub fn validate(&self) -> Result<()> {
        if self.left_motors.is_empty() {
            return Err(Error::Config("left_motors must not be empty".into()));
        }
        if self.right_motors.is_empty() {
            return Err(Error::Config("right_motors must not be empty".into()));
        }
        check_range("max_power", self.max_power, 0.0, 1.0)?;
        for (path, spec) in self.motors() {
            spec.validate().map_err(|e| e.in_field(&path))?;
        }
        validate_unique_can_ids(self.motors())
    }
}

/// Powers sent to each side on the last command, after inversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveOutput {
    pub left: f64,
    pub right: f64,
}

/// Mix forward and turn inputs into side powers, clamped to `max_power`
///
/// Positive turn speeds up the left side.
#[inline]
pub fn mix(forward: f64, turn: f64, max_power: f64) -> (f64, f64) {
    let left = (forward + turn).clamp(-max_power, max_power);
    let right = (forward - turn).clamp(-max_power, max_power);
    (left, right)
}

/// Curvature ("cheesy") mix: rotation sets the turn radius, not the turn rate
///
/// Without quick turn the turn term is scaled by `|forward|`, so the robot
/// cannot spin in place. Quick turn uses `rotation` directly. Sides are
/// desaturated to keep their ratio, then clamped to `max_power`. Positive
/// rotation speeds up the left side, as in [`mix`].
#[inline]
pub fn curvature_mix(forward: f64, rotation: f64, quick_turn: bool, max_power: f64) -> (f64, f64) {
    let turn = if quick_turn {
        rotation
    } else {
        forward.abs() * rotation
    };
    let mut left = forward + turn;
    let mut right = forward - turn;
    let peak = left.abs().max(right.abs());
    if peak > 1.0 {
        left /= peak;
        right /= peak;
    }
    (
        left.clamp(-max_power, max_power),
        right.clamp(-max_power, max_power),
    )
}

/// Two-sided drive built from a [`DriveConfig`]
pub struct Drive {
    left: Vec<Box<dyn MotorController>>,
    right: Vec<Box<dyn MotorController>>,
    max_power: f64,
    invert_left: bool,
    invert_right: bool,
    last: DriveOutput,
    logger: Logger,
}

impl std::fmt::Debug for Drive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drive")
            .field("left", &self.left.len())
            .field("right", &self.right.len())
            .field("max_power", &self.max_power)
            .field("last", &self.last)
            .finish()
    }
}

impl Drive {
    /// Validate the config, then construct every motor
    ///
    /// Nothing is opened if validation fails.
    pub fn new(config: &DriveConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("drive"))?;
        let logger = logger.child("Drive");

        if config.left_motors.len() != config.right_motors.len() {
            logger.warn(format!(
                "uneven drive: {} left motors, {} right motors",
                config.left_motors.len(),
                config.right_motors.len()
            ));
        }

        let factory = MotorFactory::new(backend, &logger);
        let left = config
            .left_motors
            .iter()
            .map(|spec| factory.create(spec))
            .collect::<Result<Vec<_>>>()?;
        let right = config
            .right_motors
            .iter()
            .map(|spec| factory.create(spec))
            .collect::<Result<Vec<_>>>()?;

        logger.info(format!(
            "drive ready: {} left, {} right, max power {}",
            left.len(),
            right.len(),
            config.max_power
        ));

        Ok(Self {
            left,
            right,
            max_power: config.max_power,
            invert_left: config.invert_left,
            invert_right: config.invert_right,
            last: DriveOutput::default(),
            logger,
        })
    }

    /// Arcade-style drive: forward and turn, each in [-1, 1]
    pub fn drive(&mut self, forward: f64, turn: f64) -> Result<DriveOutput> {
        check_unit("forward", forward)?;
        check_unit("turn", turn)?;
        let (left, right) = mix(forward, turn, self.max_power);
        self.apply(left, right)
    }

    /// Curvature drive: forward and rotation, each in [-1, 1]; see [`curvature_mix`]
    pub fn curvature(&mut self, forward: f64, rotation: f64, quick_turn: bool) -> Result<DriveOutput> {
        check_unit("forward", forward)?;
        check_unit("rotation", rotation)?;
        let (left, right) = curvature_mix(forward, rotation, quick_turn, self.max_power);
        self.apply(left, right)
    }

    /// Tank drive: independent side powers, each in [-1, 1]
    pub fn tank(&mut self, left: f64, right: f64) -> Result<DriveOutput> {
        check_unit("left", left)?;
        check_unit("right", right)?;
        let max = self.max_power;
        self.apply(left.clamp(-max, max), right.clamp(-max, max))
    }

    /// Command zero to every motor
    pub fn stop(&mut self) -> Result<DriveOutput> {
        self.apply(0.0, 0.0)
    }

    /// Change the power ceiling; applies from the next command
    pub fn set_max_power(&mut self, max_power: f64) -> Result<()> {
        check_range("max_power", max_power, 0.0, 1.0)?;
        self.max_power = max_power;
        Ok(())
    }

    pub fn max_power(&self) -> f64 {
        self.max_power
    }

    /// Output of the last successful command
    pub fn last_output(&self) -> DriveOutput {
        self.last
    }

    pub fn left_motors(&self) -> &[Box<dyn MotorController>] {
        &self.left
    }

    pub fn right_motors(&self) -> &[Box<dyn MotorController>] {
        &self.right
    }

    fn apply(&mut self, left: f64, right: f64) -> Result<DriveOutput> {
        let out = DriveOutput {
            left: if self.invert_left { -left } else { left },
            right: if self.invert_right { -right } else { right },
        };

        // keep going after a failure so the other motors are not left at a stale power
        let mut first_err = None;
        let sides = [(&mut self.left, out.left), (&mut self.right, out.right)];
        for (motors, power) in sides {
            for motor in motors.iter_mut() {
                if let Err(e) = motor.set(power) {
                    self.logger.error_with(format!("{} did not take {}", motor.describe(), power), &e);
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                self.last = out;
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{DeviceAddress, SimBackend};
    use crate::motors::MotorType;
    use approx::assert_relative_eq;

    fn talon(id: i32) -> MotorSpec {
        MotorSpec::new(MotorType::TalonSrx, id)
    }

    fn build(sim: &SimBackend, config: &DriveConfig) -> Result<Drive> {
        Drive::new(config, sim, &Logger::quiet("test"))
    }

    #[test]
    fn test_mix() {
        let (l, r) = mix(0.5, 0.25, 1.0);
        assert_relative_eq!(l, 0.75);
        assert_relative_eq!(r, 0.25);
        let (l, r) = mix(1.0, 1.0, 0.8);
        assert_relative_eq!(l, 0.8);
        assert_relative_eq!(r, 0.0);
    }

    #[test]
    fn test_curvature_mix() {
        // no quick turn: turning scales with speed
        let (l, r) = curvature_mix(0.5, 0.5, false, 1.0);
        assert_relative_eq!(l, 0.75);
        assert_relative_eq!(r, 0.25);
        let (l, r) = curvature_mix(0.0, 1.0, false, 1.0);
        assert_relative_eq!(l, 0.0);
        assert_relative_eq!(r, 0.0);

        // quick turn spins in place
        let (l, r) = curvature_mix(0.0, 0.8, true, 1.0);
        assert_relative_eq!(l, 0.8);
        assert_relative_eq!(r, -0.8);

        // desaturation keeps the ratio
        let (l, r) = curvature_mix(1.0, 1.0, true, 1.0);
        assert_relative_eq!(l, 1.0);
        assert_relative_eq!(r, 0.0);
        let (l, r) = curvature_mix(1.0, 0.5, false, 1.0);
        assert_relative_eq!(l, 1.0);
        assert_relative_eq!(r, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_defaults_from_toml() {
        let config: DriveConfig = toml::from_str(
            r#"
            left_motors = [{ type = "talon_srx", can_id = 1 }]
            right_motors = [{ type = "talon_srx", can_id = 2 }]
            "#,
        )
        .unwrap();
        assert_relative_eq!(config.max_power, 1.0);
        assert!(config.invert_left);
        assert!(!config.invert_right);
    }

    #[test]
    fn test_max_power_clamps_both_sides() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1)], vec![talon(2)])
            .with_max_power(0.6)
            .with_inversion(false, false);
        let mut drive = build(&sim, &config).unwrap();
        let out = drive.drive(1.0, 0.0).unwrap();
        assert_relative_eq!(out.left, 0.6);
        assert_relative_eq!(out.right, 0.6);
        assert_relative_eq!(sim.motor(1).unwrap().output, 0.6);
        assert_relative_eq!(sim.motor(2).unwrap().output, 0.6);
    }

    #[test]
    fn test_full_turn_is_equal_and_opposite() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1)], vec![talon(2)])
            .with_max_power(0.6)
            .with_inversion(false, false);
        let mut drive = build(&sim, &config).unwrap();
        let out = drive.drive(0.0, 1.0).unwrap();
        assert_relative_eq!(out.left, 0.6);
        assert_relative_eq!(out.right, -0.6);
        assert_relative_eq!(out.left, -out.right);
        assert_relative_eq!(sim.motor(1).unwrap().output, 0.6);
        assert_relative_eq!(sim.motor(2).unwrap().output, -0.6);
    }

    #[test]
    fn test_full_turn_with_default_inversion() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1)], vec![talon(2)]).with_max_power(0.6);
        let mut drive = build(&sim, &config).unwrap();
        let out = drive.drive(0.0, 1.0).unwrap();
        // the mirrored left side turns a spin into matching device signs
        assert_relative_eq!(out.left, -0.6);
        assert_relative_eq!(out.right, -0.6);
        assert_relative_eq!(sim.motor(1).unwrap().output, -0.6);
        assert_relative_eq!(sim.motor(2).unwrap().output, -0.6);
    }

    #[test]
    fn test_curvature_uses_clamp_and_inversion() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1), talon(3)], vec![talon(2)]).with_max_power(0.5);
        let mut drive = build(&sim, &config).unwrap();

        let out = drive.curvature(0.4, 0.5, false).unwrap();
        assert_relative_eq!(out.left, -0.5);
        assert_relative_eq!(out.right, 0.2, epsilon = 1e-12);
        for id in [1, 3] {
            assert_relative_eq!(sim.motor(id).unwrap().output, -0.5);
        }
        assert_relative_eq!(sim.motor(2).unwrap().output, 0.2, epsilon = 1e-12);

        assert!(matches!(
            drive.curvature(0.0, -1.2, true),
            Err(Error::Validation(_))
        ));
        assert_eq!(drive.last_output(), out);
    }

    #[test]
    fn test_side_inversion() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1)], vec![talon(2)]);
        let mut drive = build(&sim, &config).unwrap();
        drive.drive(0.5, 0.0).unwrap();
        assert_relative_eq!(sim.motor(1).unwrap().output, -0.5);
        assert_relative_eq!(sim.motor(2).unwrap().output, 0.5);
    }

    #[test]
    fn test_device_and_side_inversion_compose() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1).inverted(true)], vec![talon(2)]);
        let mut drive = build(&sim, &config).unwrap();
        drive.drive(0.5, 0.0).unwrap();
        let left = sim.motor(1).unwrap();
        assert_relative_eq!(left.output, -0.5);
        assert_relative_eq!(left.applied_output(), 0.5);
    }

    #[test]
    fn test_same_power_across_side() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1), talon(3)], vec![talon(2), talon(4)])
            .with_inversion(false, false);
        let mut drive = build(&sim, &config).unwrap();
        drive.drive(0.4, 0.2).unwrap();
        for id in [1, 3] {
            assert_relative_eq!(sim.motor(id).unwrap().output, 0.6, epsilon = 1e-9);
        }
        for id in [2, 4] {
            assert_relative_eq!(sim.motor(id).unwrap().output, 0.2, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_duplicate_can_id_rejected_before_hardware() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(3), talon(3)], vec![talon(4)]);
        let err = build(&sim, &config).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("duplicate CAN id 3"));
        assert_eq!(sim.opened_count(), 0);
    }

    #[test]
    fn test_empty_side_rejected() {
        let sim = SimBackend::new();
        let err = build(&sim, &DriveConfig::new(vec![], vec![talon(1)])).unwrap_err();
        assert!(err.to_string().contains("left_motors"));
        assert_eq!(sim.opened_count(), 0);
    }

    #[test]
    fn test_bad_max_power_rejected() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1)], vec![talon(2)]).with_max_power(1.5);
        assert!(build(&sim, &config).unwrap_err().is_config());
    }

    #[test]
    fn test_input_out_of_range() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1)], vec![talon(2)]);
        let mut drive = build(&sim, &config).unwrap();
        assert!(matches!(drive.drive(1.5, 0.0), Err(Error::Validation(_))));
        assert!(drive.set_max_power(-0.1).is_err());
    }

    #[test]
    fn test_stop_zeroes_all() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1)], vec![talon(2)]);
        let mut drive = build(&sim, &config).unwrap();
        drive.tank(0.3, -0.3).unwrap();
        drive.stop().unwrap();
        assert_relative_eq!(sim.motor(1).unwrap().output, 0.0);
        assert_relative_eq!(sim.motor(2).unwrap().output, 0.0);
        assert_eq!(drive.last_output(), DriveOutput::default());
    }

    #[test]
    fn test_failed_motor_does_not_block_others() {
        let sim = SimBackend::new();
        let config = DriveConfig::new(vec![talon(1), talon(3)], vec![talon(2)])
            .with_inversion(false, false);
        let mut drive = build(&sim, &config).unwrap();
        sim.fail_writes(DeviceAddress::Can(1));
        let err = drive.drive(0.5, 0.0).unwrap_err();
        assert!(err.is_hardware());
        assert_relative_eq!(sim.motor(3).unwrap().output, 0.5);
        assert_relative_eq!(sim.motor(2).unwrap().output, 0.5);
    }

    #[test]
    fn test_construction_failure_is_hardware() {
        let sim = SimBackend::new();
        sim.fail_open(DeviceAddress::Can(2));
        let config = DriveConfig::new(vec![talon(1)], vec![talon(2)]);
        assert!(build(&sim, &config).unwrap_err().is_hardware());
    }
}
