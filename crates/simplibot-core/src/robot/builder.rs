//! Robot assembly
//!
//! [`RobotBuilder`] turns a [`RobotConfig`] into a [`Robot`]: it validates
//! the whole config first, then opens each subsystem in turn. A subsystem
//! whose hardware fails to open is left out and recorded as a
//! [`SubsystemFault`]; the rest of the robot still comes up.

use std::fmt;

use super::config::RobotConfig;
use super::lifecycle::{RobotLifecycle, RobotMode};
use crate::drive::Drive;
use crate::hardware::Backend;
use crate::logging::{self, Logger};
use crate::nt::NetworkTable;
use crate::subsystems::{AnalogInput, Arm, Encoder, Gyro, Pneumatics, Servo, Vision};
use crate::{Error, Result};

/// Subsystems that were built; `None` when not configured or faulted
#[derive(Debug, Default)]
pub struct Subsystems {
    pub drive: Option<Drive>,
    pub arm: Option<Arm>,
    pub vision: Option<Vision>,
    pub gyro: Option<Gyro>,
    pub pneumatics: Option<Pneumatics>,
    pub servos: Vec<Servo>,
    pub encoders: Vec<Encoder>,
    pub analog_inputs: Vec<AnalogInput>,
    /// Robot-wide table
    pub nt: Option<NetworkTable>,
}

impl Subsystems {
    /// Stop the drive and the arm. Every actuator is tried; the first
    /// failure is returned.
    pub fn stop_all(&mut self) -> Result<()> {
        let drive = match self.drive.as_mut() {
            Some(drive) => drive.stop().map(|_| ()),
            None => Ok(()),
        };
        let arm = match self.arm.as_mut() {
            Some(arm) => arm.stop(),
            None => Ok(()),
        };
        drive.and(arm)
    }
}

/// A subsystem left out of the robot because its hardware failed
#[derive(Debug)]
pub struct SubsystemFault {
    /// Config path of the subsystem, e.g. `arm` or `servos[1]`
    pub subsystem: String,
    pub error: Error,
}

impl fmt::Display for SubsystemFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subsystem, self.error)
    }
}

/// User robot code, run after the built-in hooks of each mode
///
/// Every hook receives the built subsystems. All hooks default to no-ops.
pub trait Behavior: Send {
    fn robot_init(&mut self, _subsystems: &mut Subsystems) {}
    fn robot_periodic(&mut self, _subsystems: &mut Subsystems) {}
    fn disabled_init(&mut self, _subsystems: &mut Subsystems) {}
    fn disabled_periodic(&mut self, _subsystems: &mut Subsystems) {}
    fn autonomous_init(&mut self, _subsystems: &mut Subsystems) {}
    fn autonomous_periodic(&mut self, _subsystems: &mut Subsystems) {}
    fn teleop_init(&mut self, _subsystems: &mut Subsystems) {}
    fn teleop_periodic(&mut self, _subsystems: &mut Subsystems) {}
    fn test_init(&mut self, _subsystems: &mut Subsystems) {}
    fn test_periodic(&mut self, _subsystems: &mut Subsystems) {}
}

/// No user code
impl Behavior for () {}

/// Builds a [`Robot`] from a [`RobotConfig`]
///
/// Building has no hidden state; the same builder can build any number of
/// robots, as tests do.
///
/// # Example
/// ```
/// use simplibot_core::{DriveConfig, MotorSpec, MotorType, RobotBuilder, RobotConfig, SimBackend};
///
/// let config = RobotConfig::new("Practice Bot").with_drive(DriveConfig::new(
///     vec![MotorSpec::new(MotorType::TalonSrx, 1)],
///     vec![MotorSpec::new(MotorType::TalonSrx, 2)],
/// ));
/// let sim = SimBackend::new();
/// let mut robot = RobotBuilder::new(&sim).build(&config).unwrap();
///
/// assert!(robot.faults().is_empty());
/// robot.subsystems_mut().drive.as_mut().unwrap().drive(0.5, 0.0).unwrap();
/// ```
pub struct RobotBuilder<'a> {
    backend: &'a dyn Backend,
    logger: Option<Logger>,
}

impl<'a> RobotBuilder<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            logger: None,
        }
    }

    /// Log through `logger` instead of one named after the robot
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validate `config` and open every configured subsystem
    ///
    /// Fails only on configuration errors. Hardware errors disable the
    /// subsystem they came from and show up in [`Robot::faults`].
    pub fn build(&self, config: &RobotConfig) -> Result<Robot> {
        config.validate()?;

        let logger = match &self.logger {
            Some(logger) => logger.clone(),
            None if config.enable_logging => {
                logging::init();
                Logger::new(config.robot_name.as_str())
            }
            None => Logger::quiet(config.robot_name.as_str()),
        };
        logger.info(format!(
            "initializing {} on {} backend",
            config.robot_name,
            self.backend.name()
        ));

        let mut assembly = Assembly {
            logger: &logger,
            faults: Vec::new(),
        };
        let backend = self.backend;
        let mut subsystems = Subsystems::default();

        if config.network_tables.enabled {
            subsystems.nt = assembly.attempt("network_tables", || {
                let nt = backend.network_tables().map_err(|e| {
                    Error::Hardware(format!("NetworkTables unavailable: {}", e))
                })?;
                Ok(NetworkTable::new(
                    nt,
                    config.network_tables.table_name.clone(),
                    &logger,
                ))
            })?;
        }
        if let Some(drive) = &config.drive {
            subsystems.drive = assembly.attempt("drive", || Drive::new(drive, backend, &logger))?;
        }
        if let Some(arm) = &config.arm {
            subsystems.arm = assembly.attempt("arm", || Arm::new(arm, backend, &logger))?;
        }
        if let Some(vision) = &config.vision {
            subsystems.vision = assembly.attempt("vision", || {
                let nt = backend.network_tables().map_err(|e| {
                    Error::Hardware(format!("NetworkTables unavailable: {}", e))
                })?;
                Vision::new(vision, nt, &logger)
            })?;
        }
        if let Some(gyro) = &config.gyro {
            subsystems.gyro = assembly.attempt("gyro", || Gyro::new(gyro, backend, &logger))?;
        }
        if let Some(pneumatics) = &config.pneumatics {
            subsystems.pneumatics =
                assembly.attempt("pneumatics", || Pneumatics::new(pneumatics, backend, &logger))?;
        }
        for (i, servo) in config.servos.iter().enumerate() {
            if let Some(built) = assembly.attempt(&format!("servos[{}]", i), || {
                Servo::new(servo, backend, &logger)
            })? {
                subsystems.servos.push(built);
            }
        }
        for (i, encoder) in config.encoders.iter().enumerate() {
            if let Some(built) = assembly.attempt(&format!("encoders[{}]", i), || {
                Encoder::new(encoder, backend, &logger)
            })? {
                subsystems.encoders.push(built);
            }
        }
        for (i, input) in config.analog_inputs.iter().enumerate() {
            if let Some(built) = assembly.attempt(&format!("analog_inputs[{}]", i), || {
                AnalogInput::new(input, backend, &logger)
            })? {
                subsystems.analog_inputs.push(built);
            }
        }

        let faults = assembly.faults;
        if faults.is_empty() {
            logger.info(format!("{} setup complete", config.robot_name));
        } else {
            logger.warn(format!(
                "{} setup complete with {} disabled subsystem(s)",
                config.robot_name,
                faults.len()
            ));
        }

        Ok(Robot {
            config: config.clone(),
            subsystems,
            behavior: (),
            faults,
            mode: RobotMode::Disabled,
            logger,
        })
    }
}

struct Assembly<'l> {
    logger: &'l Logger,
    faults: Vec<SubsystemFault>,
}

impl Assembly<'_> {
    /// Run one subsystem constructor. Config errors abort the build,
    /// hardware errors are recorded and yield `None`.
    fn attempt<T>(&mut self, name: &str, build: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
        match build() {
            Ok(subsystem) => {
                self.logger.info(format!("{} initialized", name));
                Ok(Some(subsystem))
            }
            Err(e) if e.is_config() => Err(e),
            Err(e) => {
                self.logger
                    .error_with(format!("failed to initialize {}, disabling it", name), &e);
                self.faults.push(SubsystemFault {
                    subsystem: name.to_string(),
                    error: e,
                });
                Ok(None)
            }
        }
    }
}

/// An assembled robot driven by the host through [`RobotLifecycle`]
///
/// Built-in hooks run first: entering autonomous or test starts arm
/// homing, which the periodic hooks of those modes keep stepping until the
/// arm settles; entering disabled stops the drive and the arm. The
/// [`Behavior`] hooks run after them.
pub struct Robot<B: Behavior = ()> {
    config: RobotConfig,
    subsystems: Subsystems,
    behavior: B,
    faults: Vec<SubsystemFault>,
    mode: RobotMode,
    logger: Logger,
}

impl<B: Behavior> fmt::Debug for Robot<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Robot")
            .field("name", &self.config.robot_name)
            .field("mode", &self.mode)
            .field("subsystems", &self.subsystems)
            .field("faults", &self.faults)
            .finish_non_exhaustive()
    }
}

impl<B: Behavior> Robot<B> {
    /// Attach user code, replacing any previous behavior
    pub fn with_behavior<B2: Behavior>(self, behavior: B2) -> Robot<B2> {
        Robot {
            config: self.config,
            subsystems: self.subsystems,
            behavior,
            faults: self.faults,
            mode: self.mode,
            logger: self.logger,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.robot_name
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    /// Mode of the last init hook run
    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    pub fn subsystems(&self) -> &Subsystems {
        &self.subsystems
    }

    pub fn subsystems_mut(&mut self) -> &mut Subsystems {
        &mut self.subsystems
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    /// Subsystems that failed to come up
    pub fn faults(&self) -> &[SubsystemFault] {
        &self.faults
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    fn log_hook_error(&self, hook: &str, result: Result<()>) {
        if let Err(e) = result {
            self.logger
                .error_with(format!("{} skipped an action", hook), &e);
        }
    }

    fn step_arm_homing(&mut self, hook: &str) {
        let result = match self.subsystems.arm.as_mut() {
            Some(arm) if !arm.is_initialized() => arm.initialize(),
            _ => Ok(()),
        };
        self.log_hook_error(hook, result);
    }
}

impl<B: Behavior> RobotLifecycle for Robot<B> {
    fn robot_init(&mut self) {
        self.logger.info(format!("{} started", self.config.robot_name));
        self.behavior.robot_init(&mut self.subsystems);
    }

    fn robot_periodic(&mut self) {
        self.behavior.robot_periodic(&mut self.subsystems);
    }

    fn disabled_init(&mut self) {
        self.mode = RobotMode::Disabled;
        let result = self.subsystems.stop_all();
        self.log_hook_error("disabled_init", result);
        self.behavior.disabled_init(&mut self.subsystems);
    }

    fn disabled_periodic(&mut self) {
        self.behavior.disabled_periodic(&mut self.subsystems);
    }

    fn autonomous_init(&mut self) {
        self.mode = RobotMode::Autonomous;
        self.step_arm_homing("autonomous_init");
        self.behavior.autonomous_init(&mut self.subsystems);
    }

    fn autonomous_periodic(&mut self) {
        self.step_arm_homing("autonomous_periodic");
        self.behavior.autonomous_periodic(&mut self.subsystems);
    }

    fn teleop_init(&mut self) {
        self.mode = RobotMode::Teleop;
        self.behavior.teleop_init(&mut self.subsystems);
    }

    fn teleop_periodic(&mut self) {
        self.behavior.teleop_periodic(&mut self.subsystems);
    }

    fn test_init(&mut self) {
        self.mode = RobotMode::Test;
        self.step_arm_homing("test_init");
        self.behavior.test_init(&mut self.subsystems);
    }

    fn test_periodic(&mut self) {
        self.step_arm_homing("test_periodic");
        self.behavior.test_periodic(&mut self.subsystems);
    }
}

/// Build a robot with default logging
pub fn create_robot(config: &RobotConfig, backend: &dyn Backend) -> Result<Robot> {
    RobotBuilder::new(backend).build(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::DriveConfig;
    use crate::hardware::{DeviceAddress, SimBackend};
    use crate::motors::{MotorSpec, MotorType};
    use crate::subsystems::{ArmConfig, EncoderConfig, GyroConfig, ServoConfig, VisionConfig};
    use approx::assert_relative_eq;

    fn quiet(sim: &SimBackend) -> RobotBuilder<'_> {
        RobotBuilder::new(sim).logger(Logger::quiet("test"))
    }

    fn drive() -> DriveConfig {
        DriveConfig::new(
            vec![MotorSpec::new(MotorType::TalonSrx, 1)],
            vec![MotorSpec::new(MotorType::TalonSrx, 2)],
        )
        .with_max_power(0.6)
    }

    fn full_config() -> RobotConfig {
        RobotConfig::new("bot")
            .with_drive(drive())
            .with_arm(ArmConfig::new(10).with_limit_switch(0))
            .with_vision(VisionConfig::default())
            .with_gyro(GyroConfig::default())
            .with_servo(ServoConfig::new(0))
    }

    #[test]
    fn test_build_everything() {
        let sim = SimBackend::new();
        let robot = quiet(&sim).build(&full_config()).unwrap();
        let s = robot.subsystems();
        assert!(s.drive.is_some());
        assert!(s.arm.is_some());
        assert!(s.vision.is_some());
        assert!(s.gyro.is_some());
        assert_eq!(s.servos.len(), 1);
        assert!(s.nt.is_some());
        assert!(robot.faults().is_empty());
        assert_eq!(robot.mode(), RobotMode::Disabled);
    }

    #[test]
    fn test_config_error_opens_nothing() {
        let sim = SimBackend::new();
        let config = RobotConfig::new("bot")
            .with_drive(drive())
            .with_arm(ArmConfig::new(1));
        let err = quiet(&sim).build(&config).unwrap_err();
        assert!(err.is_config());
        assert_eq!(sim.opened_count(), 0);
    }

    #[test]
    fn test_shared_dio_channel_opens_nothing() {
        let sim = SimBackend::new();
        let config = RobotConfig::new("bot")
            .with_arm(ArmConfig::new(10).with_limit_switch(0))
            .with_encoder(EncoderConfig::new(0, 1));
        let err = quiet(&sim).build(&config).unwrap_err();
        assert!(err.is_config());
        assert_eq!(sim.opened_count(), 0);
    }

    #[test]
    fn test_hardware_fault_disables_one_subsystem() {
        let sim = SimBackend::new();
        sim.fail_open(DeviceAddress::Can(10));
        let robot = quiet(&sim).build(&full_config()).unwrap();
        assert!(robot.subsystems().arm.is_none());
        assert!(robot.subsystems().drive.is_some());
        assert!(robot.subsystems().gyro.is_some());
        assert_eq!(robot.faults().len(), 1);
        assert_eq!(robot.faults()[0].subsystem, "arm");
        assert!(robot.faults()[0].error.is_hardware());
    }

    #[test]
    fn test_network_tables_disabled() {
        let sim = SimBackend::new();
        let config = RobotConfig::new("bot").with_network_tables(false, "datatable");
        let robot = quiet(&sim).build(&config).unwrap();
        assert!(robot.subsystems().nt.is_none());
    }

    #[test]
    fn test_network_tables_unavailable() {
        let sim = SimBackend::new();
        sim.fail_open(DeviceAddress::NetworkTables);
        let config = RobotConfig::new("bot").with_vision(VisionConfig::default());
        let robot = quiet(&sim).build(&config).unwrap();
        assert!(robot.subsystems().nt.is_none());
        assert!(robot.subsystems().vision.is_none());
        assert_eq!(robot.faults().len(), 2);
    }

    #[test]
    fn test_builder_is_repeatable() {
        let builder_sim = SimBackend::new();
        let other_sim = SimBackend::new();
        let config = RobotConfig::new("bot").with_drive(drive());
        assert!(quiet(&builder_sim).build(&config).is_ok());
        assert!(quiet(&other_sim).build(&config).is_ok());
        assert_eq!(builder_sim.opened_count(), other_sim.opened_count());
    }

    #[test]
    fn test_rebuild_after_drop_on_same_backend() {
        let sim = SimBackend::new();
        let config = RobotConfig::new("bot").with_drive(drive());

        let first = quiet(&sim).build(&config).unwrap();
        let overlapping = quiet(&sim).build(&config).unwrap();
        assert_eq!(overlapping.faults().len(), 1);
        assert_eq!(overlapping.faults()[0].subsystem, "drive");
        drop(overlapping);
        drop(first);

        let second = quiet(&sim).build(&config).unwrap();
        assert!(second.faults().is_empty());
        assert!(second.subsystems().drive.is_some());
    }

    #[test]
    fn test_disabled_init_stops_drive() {
        let sim = SimBackend::new();
        let config = RobotConfig::new("bot").with_drive(drive());
        let mut robot = quiet(&sim).build(&config).unwrap();
        robot.enter_mode(RobotMode::Teleop);
        robot
            .subsystems_mut()
            .drive
            .as_mut()
            .unwrap()
            .drive(1.0, 0.0)
            .unwrap();
        assert_relative_eq!(sim.motor(2).unwrap().output, 0.6);
        robot.enter_mode(RobotMode::Disabled);
        assert_relative_eq!(sim.motor(1).unwrap().output, 0.0);
        assert_relative_eq!(sim.motor(2).unwrap().output, 0.0);
        assert_eq!(robot.mode(), RobotMode::Disabled);
    }

    #[test]
    fn test_autonomous_homes_arm() {
        let sim = SimBackend::new();
        let config = RobotConfig::new("bot").with_arm(ArmConfig::new(10).with_limit_switch(0));
        let mut robot = quiet(&sim).build(&config).unwrap();
        robot.enter_mode(RobotMode::Autonomous);
        assert!(sim.motor(10).unwrap().output > 0.0);
        robot.run_periodic(RobotMode::Autonomous);
        assert!(!robot.subsystems().arm.as_ref().unwrap().is_initialized());

        sim.set_digital_input(0, true);
        robot.run_periodic(RobotMode::Autonomous);
        let arm = robot.subsystems().arm.as_ref().unwrap();
        assert!(arm.is_initialized());
        assert!(arm.is_calibrated());
        assert_relative_eq!(sim.motor(10).unwrap().output, 0.0);
    }

    struct Counter {
        teleop_cycles: u32,
        last_forward: f64,
    }

    impl Behavior for Counter {
        fn teleop_periodic(&mut self, subsystems: &mut Subsystems) {
            self.teleop_cycles += 1;
            if let Some(drive) = subsystems.drive.as_mut() {
                let _ = drive.drive(self.last_forward, 0.0);
            }
        }
    }

    #[test]
    fn test_behavior_runs_with_subsystems() {
        let sim = SimBackend::new();
        let config = RobotConfig::new("bot").with_drive(drive());
        let mut robot = quiet(&sim).build(&config).unwrap().with_behavior(Counter {
            teleop_cycles: 0,
            last_forward: 0.5,
        });
        robot.enter_mode(RobotMode::Teleop);
        robot.run_periodic(RobotMode::Teleop);
        robot.run_periodic(RobotMode::Teleop);
        assert_eq!(robot.behavior().teleop_cycles, 2);
        assert_relative_eq!(sim.motor(2).unwrap().output, 0.5);
    }

    #[test]
    fn test_create_robot() {
        let sim = SimBackend::new();
        let config = RobotConfig::new("bot").with_logging(false);
        let robot = create_robot(&config, &sim).unwrap();
        assert_eq!(robot.name(), "bot");
    }
}
