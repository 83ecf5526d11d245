//! The host framework's per-mode hook contract
//!
//! The host scheduler calls one `*_init` hook on entering a mode, then the
//! mode's periodic hook followed by `robot_periodic` every cycle (20 ms on
//! a roboRIO). A host adapter only needs [`RobotLifecycle::enter_mode`] and
//! [`RobotLifecycle::run_periodic`] to drive any implementor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Match operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotMode {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl RobotMode {
    pub const ALL: [RobotMode; 4] = [
        RobotMode::Disabled,
        RobotMode::Autonomous,
        RobotMode::Teleop,
        RobotMode::Test,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RobotMode::Disabled => "disabled",
            RobotMode::Autonomous => "autonomous",
            RobotMode::Teleop => "teleop",
            RobotMode::Test => "test",
        }
    }

    /// Whether actuators may move in this mode
    pub fn is_enabled(&self) -> bool {
        !matches!(self, RobotMode::Disabled)
    }
}

impl fmt::Display for RobotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RobotMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "auto" => Ok(RobotMode::Autonomous),
            _ => Self::ALL
                .into_iter()
                .find(|m| m.as_str() == tag)
                .ok_or_else(|| Error::Config(format!("unknown robot mode '{}'", s))),
        }
    }
}

/// Lifecycle hooks, all defaulted to no-ops
pub trait RobotLifecycle {
    fn robot_init(&mut self) {}
    fn robot_periodic(&mut self) {}

    fn disabled_init(&mut self) {}
    fn disabled_periodic(&mut self) {}

    fn autonomous_init(&mut self) {}
    fn autonomous_periodic(&mut self) {}

    fn teleop_init(&mut self) {}
    fn teleop_periodic(&mut self) {}

    fn test_init(&mut self) {}
    fn test_periodic(&mut self) {}

    /// Run the init hook for `mode`
    fn enter_mode(&mut self, mode: RobotMode) {
        match mode {
            RobotMode::Disabled => self.disabled_init(),
            RobotMode::Autonomous => self.autonomous_init(),
            RobotMode::Teleop => self.teleop_init(),
            RobotMode::Test => self.test_init(),
        }
    }

    /// One scheduler cycle in `mode`
    fn run_periodic(&mut self, mode: RobotMode) {
        match mode {
            RobotMode::Disabled => self.disabled_periodic(),
            RobotMode::Autonomous => self.autonomous_periodic(),
            RobotMode::Teleop => self.teleop_periodic(),
            RobotMode::Test => self.test_periodic(),
        }
        self.robot_periodic();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl RobotLifecycle for Recorder {
        fn robot_periodic(&mut self) {
            self.calls.push("robot_periodic");
        }

        fn autonomous_init(&mut self) {
            self.calls.push("autonomous_init");
        }

        fn autonomous_periodic(&mut self) {
            self.calls.push("autonomous_periodic");
        }
    }

    #[test]
    fn test_dispatch_order() {
        let mut r = Recorder::default();
        r.enter_mode(RobotMode::Autonomous);
        r.run_periodic(RobotMode::Autonomous);
        r.run_periodic(RobotMode::Teleop);
        assert_eq!(
            r.calls,
            vec![
                "autonomous_init",
                "autonomous_periodic",
                "robot_periodic",
                "robot_periodic"
            ]
        );
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Teleop".parse::<RobotMode>().unwrap(), RobotMode::Teleop);
        assert_eq!("auto".parse::<RobotMode>().unwrap(), RobotMode::Autonomous);
        assert!("practice".parse::<RobotMode>().unwrap_err().is_config());
        assert!(!RobotMode::default().is_enabled());
    }
}
