//! Python type bindings

use parking_lot::Mutex;
use pyo3::create_exception;
use pyo3::exceptions::{PyException, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use simplibot_core::{
    DriveConfig, Error, MotorSpec, MotorType, NeutralMode, Robot, RobotBuilder, RobotConfig,
    RobotLifecycle, RobotMode, SimBackend,
};

create_exception!(_simplibot, SimplibotError, PyException);
create_exception!(_simplibot, ConfigurationError, SimplibotError);
create_exception!(_simplibot, HardwareError, SimplibotError);

pub(crate) fn to_py_err(e: Error) -> PyErr {
    match e {
        Error::Config(_) => ConfigurationError::new_err(e.to_string()),
        Error::Hardware(_) => HardwareError::new_err(e.to_string()),
        Error::Validation(_) => PyValueError::new_err(e.to_string()),
        _ => SimplibotError::new_err(e.to_string()),
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// One motor controller on the CAN bus
#[pyclass(name = "MotorSpec")]
#[derive(Clone)]
pub struct PyMotorSpec {
    inner: MotorSpec,
}

#[pymethods]
impl PyMotorSpec {
    #[new]
    #[pyo3(signature = (motor_type, can_id, inverted = false, neutral_mode = "coast"))]
    fn new(motor_type: &str, can_id: i32, inverted: bool, neutral_mode: &str) -> PyResult<Self> {
        let motor_type: MotorType = motor_type.parse().map_err(to_py_err)?;
        let neutral_mode: NeutralMode = neutral_mode.parse().map_err(to_py_err)?;
        Ok(Self {
            inner: MotorSpec::new(motor_type, can_id)
                .inverted(inverted)
                .neutral_mode(neutral_mode),
        })
    }

    #[getter]
    fn motor_type(&self) -> &'static str {
        self.inner.motor_type.as_str()
    }

    #[getter]
    fn can_id(&self) -> i32 {
        self.inner.can_id
    }

    #[getter]
    fn inverted(&self) -> bool {
        self.inner.inverted
    }

    #[getter]
    fn neutral_mode(&self) -> String {
        self.inner.neutral_mode.to_string()
    }

    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!(
            "MotorSpec(motor_type='{}', can_id={}, inverted={}, neutral_mode='{}')",
            self.inner.motor_type,
            self.inner.can_id,
            if self.inner.inverted { "True" } else { "False" },
            self.inner.neutral_mode
        )
    }
}

/// Differential drive layout
#[pyclass(name = "DriveConfig")]
#[derive(Clone)]
pub struct PyDriveConfig {
    inner: DriveConfig,
}

#[pymethods]
impl PyDriveConfig {
    #[new]
    #[pyo3(signature = (left_motors, right_motors, max_power = 1.0, invert_left = true, invert_right = false))]
    fn new(
        left_motors: Vec<PyMotorSpec>,
        right_motors: Vec<PyMotorSpec>,
        max_power: f64,
        invert_left: bool,
        invert_right: bool,
    ) -> Self {
        let left = left_motors.into_iter().map(|m| m.inner).collect();
        let right = right_motors.into_iter().map(|m| m.inner).collect();
        Self {
            inner: DriveConfig::new(left, right)
                .with_max_power(max_power)
                .with_inversion(invert_left, invert_right),
        }
    }

    #[getter]
    fn left_motors(&self) -> Vec<PyMotorSpec> {
        self.inner
            .left_motors
            .iter()
            .map(|m| PyMotorSpec { inner: *m })
            .collect()
    }

    #[getter]
    fn right_motors(&self) -> Vec<PyMotorSpec> {
        self.inner
            .right_motors
            .iter()
            .map(|m| PyMotorSpec { inner: *m })
            .collect()
    }

    #[getter]
    fn max_power(&self) -> f64 {
        self.inner.max_power
    }

    #[getter]
    fn invert_left(&self) -> bool {
        self.inner.invert_left
    }

    #[getter]
    fn invert_right(&self) -> bool {
        self.inner.invert_right
    }

    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!(
            "DriveConfig(left={}, right={}, max_power={})",
            self.inner.left_motors.len(),
            self.inner.right_motors.len(),
            self.inner.max_power
        )
    }
}

/// Whole-robot description
#[pyclass(name = "RobotConfig")]
#[derive(Clone)]
pub struct PyRobotConfig {
    inner: RobotConfig,
}

#[pymethods]
impl PyRobotConfig {
    #[new]
    #[pyo3(signature = (robot_name = None, drive = None, enable_logging = true))]
    fn new(robot_name: Option<String>, drive: Option<PyDriveConfig>, enable_logging: bool) -> Self {
        let mut inner = match robot_name {
            Some(name) => RobotConfig::new(name),
            None => RobotConfig::default(),
        };
        inner.drive = drive.map(|d| d.inner);
        inner.enable_logging = enable_logging;
        Self { inner }
    }

    /// Parse and validate a TOML document
    #[staticmethod]
    fn from_toml(text: &str) -> PyResult<Self> {
        RobotConfig::from_toml_str(text)
            .map(|inner| Self { inner })
            .map_err(to_py_err)
    }

    /// Read, parse and validate a TOML file
    #[staticmethod]
    fn load(path: &str) -> PyResult<Self> {
        RobotConfig::load(path)
            .map(|inner| Self { inner })
            .map_err(to_py_err)
    }

    fn to_toml(&self) -> PyResult<String> {
        self.inner.to_toml_string().map_err(to_py_err)
    }

    fn validate(&self) -> PyResult<()> {
        self.inner.validate().map_err(to_py_err)
    }

    #[getter]
    fn robot_name(&self) -> &str {
        &self.inner.robot_name
    }

    #[getter]
    fn drive(&self) -> Option<PyDriveConfig> {
        self.inner
            .drive
            .clone()
            .map(|inner| PyDriveConfig { inner })
    }

    #[getter]
    fn has_arm(&self) -> bool {
        self.inner.arm.is_some()
    }

    #[getter]
    fn enable_logging(&self) -> bool {
        self.inner.enable_logging
    }

    fn __repr__(&self) -> String {
        format!("RobotConfig(robot_name='{}')", self.inner.robot_name)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// A robot built on the in-process simulated backend
#[pyclass(name = "SimRobot")]
pub struct PySimRobot {
    sim: SimBackend,
    robot: Mutex<Robot>,
}

impl PySimRobot {
    fn with_drive<T>(
        &self,
        f: impl FnOnce(&mut simplibot_core::Drive) -> simplibot_core::Result<T>,
    ) -> PyResult<T> {
        let mut robot = self.robot.lock();
        match robot.subsystems_mut().drive.as_mut() {
            Some(drive) => f(drive).map_err(to_py_err),
            None => Err(PyRuntimeError::new_err("robot has no drive")),
        }
    }
}

#[pymethods]
impl PySimRobot {
    #[new]
    fn new(config: &PyRobotConfig) -> PyResult<Self> {
        let sim = SimBackend::new();
        let mut robot = RobotBuilder::new(&sim)
            .build(&config.inner)
            .map_err(to_py_err)?;
        robot.robot_init();
        tracing::debug!(robot = %robot.name(), faults = robot.faults().len(), "sim robot built");
        Ok(Self {
            sim,
            robot: Mutex::new(robot),
        })
    }

    /// Arcade drive; returns the (left, right) powers sent
    fn drive(&self, forward: f64, turn: f64) -> PyResult<(f64, f64)> {
        self.with_drive(|d| d.drive(forward, turn))
            .map(|out| (out.left, out.right))
    }

    /// Curvature drive; returns the (left, right) powers sent
    #[pyo3(signature = (forward, rotation, quick_turn = false))]
    fn curvature(&self, forward: f64, rotation: f64, quick_turn: bool) -> PyResult<(f64, f64)> {
        self.with_drive(|d| d.curvature(forward, rotation, quick_turn))
            .map(|out| (out.left, out.right))
    }

    /// Tank drive; returns the (left, right) powers sent
    fn tank(&self, left: f64, right: f64) -> PyResult<(f64, f64)> {
        self.with_drive(|d| d.tank(left, right))
            .map(|out| (out.left, out.right))
    }

    /// Stop every actuator
    fn stop(&self) -> PyResult<()> {
        self.robot.lock().subsystems_mut().stop_all().map_err(to_py_err)
    }

    /// Run the init hook for `mode` ("disabled", "autonomous", "teleop", "test")
    fn enter_mode(&self, mode: &str) -> PyResult<()> {
        let mode: RobotMode = mode.parse().map_err(to_py_err)?;
        self.robot.lock().enter_mode(mode);
        Ok(())
    }

    /// Run `cycles` periodic cycles in the current mode and advance the
    /// simulation by 20 ms each
    #[pyo3(signature = (cycles = 1))]
    fn periodic(&self, py: Python<'_>, cycles: u32) {
        py.allow_threads(|| {
            let mut robot = self.robot.lock();
            for _ in 0..cycles {
                let mode = robot.mode();
                robot.run_periodic(mode);
                self.sim.step(simplibot_core::control::DEFAULT_PERIOD);
            }
        })
    }

    #[getter]
    fn mode(&self) -> String {
        self.robot.lock().mode().to_string()
    }

    #[getter]
    fn name(&self) -> String {
        self.robot.lock().name().to_string()
    }

    /// Output last sent to the motor on `can_id`, or None if no such motor
    fn motor_output(&self, can_id: u8) -> Option<f64> {
        self.sim.motor(can_id).map(|m| m.output)
    }

    /// Press or release a simulated digital input
    fn set_digital_input(&self, channel: u8, value: bool) {
        self.sim.set_digital_input(channel, value);
    }

    /// Subsystems that failed to build, as "path: error" strings
    fn faults(&self) -> Vec<String> {
        self.robot
            .lock()
            .faults()
            .iter()
            .map(|f| f.to_string())
            .collect()
    }

    fn __repr__(&self) -> String {
        let robot = self.robot.lock();
        format!("SimRobot(name='{}', mode='{}')", robot.name(), robot.mode())
    }
}
