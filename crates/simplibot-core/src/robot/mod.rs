//! Robot assembly and lifecycle
//!
//! - [`RobotConfig`]: the whole robot description, loadable from TOML
//! - [`RobotBuilder`]: validates a config and opens its subsystems
//! - [`Robot`]: built subsystems plus user [`Behavior`], driven through
//!   [`RobotLifecycle`] by the host scheduler

mod builder;
mod config;
mod lifecycle;

pub use builder::{create_robot, Behavior, Robot, RobotBuilder, SubsystemFault, Subsystems};
pub use config::{NetworkTablesConfig, RobotConfig, DEFAULT_ROBOT_NAME};
pub use lifecycle::{RobotLifecycle, RobotMode};
