//! Python bindings for simplibot
//!
//! Exposes the configuration types and a simulated robot so robot code can
//! be exercised from Python tests without a roboRIO.

use pyo3::prelude::*;

mod bindings;

use bindings::*;

/// The simplibot Python module
#[pymodule]
fn _simplibot(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let _ = tracing_subscriber::fmt::try_init();

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("VERSION", simplibot_core::VERSION)?;

    // Errors
    m.add("SimplibotError", m.py().get_type::<SimplibotError>())?;
    m.add("ConfigurationError", m.py().get_type::<ConfigurationError>())?;
    m.add("HardwareError", m.py().get_type::<HardwareError>())?;

    // Configuration
    m.add_class::<PyMotorSpec>()?;
    m.add_class::<PyDriveConfig>()?;
    m.add_class::<PyRobotConfig>()?;

    // Simulation
    m.add_class::<PySimRobot>()?;

    m.add(
        "MOTOR_TYPES",
        simplibot_core::MotorType::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>(),
    )?;

    Ok(())
}
