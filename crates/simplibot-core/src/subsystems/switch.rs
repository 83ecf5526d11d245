//! Limit switch with edge detection

use serde::{Deserialize, Serialize};

use crate::hardware::{Backend, DigitalInputDevice, DIO_CHANNELS};
use crate::logging::Logger;
use crate::{check_range, Error, Result};

/// Limit switch wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSwitchConfig {
    /// DIO channel, 0..=9
    pub channel: u8,
    /// False for a normally-closed switch; its reading is inverted
    #[serde(default = "default_normally_open")]
    pub normally_open: bool,
}

fn default_normally_open() -> bool {
    true
}

impl LimitSwitchConfig {
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            normally_open: true,
        }
    }

    pub fn normally_closed(mut self) -> Self {
        self.normally_open = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_range("channel", self.channel, 0, DIO_CHANNELS - 1)
    }
}

/// A digital limit switch
///
/// [`pressed`](Self::pressed) and [`released`](Self::released) report each
/// transition once. A switch already closed when first polled counts as a
/// press.
pub struct LimitSwitch {
    device: Box<dyn DigitalInputDevice>,
    config: LimitSwitchConfig,
    triggered: bool,
    logger: Logger,
}

impl std::fmt::Debug for LimitSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimitSwitch")
            .field("config", &self.config)
            .field("triggered", &self.triggered)
            .finish()
    }
}

impl LimitSwitch {
    pub fn new(config: LimitSwitchConfig, backend: &dyn Backend, logger: &Logger) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("limit_switch"))?;
        let logger = logger.child("LimitSwitch");
        let device = backend.open_digital_input(config.channel).map_err(|e| {
            Error::Hardware(format!(
                "failed to open limit switch on DIO {}: {}",
                config.channel, e
            ))
        })?;
        logger.info(format!("limit switch on DIO {}", config.channel));
        Ok(Self {
            device,
            config,
            triggered: false,
            logger,
        })
    }

    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    /// Current state, true when pressed. A failed read counts as released.
    pub fn get(&self) -> bool {
        match self.device.get() {
            Ok(raw) => raw == self.config.normally_open,
            Err(e) => {
                self.logger
                    .error(format!("failed to read DIO {}: {}", self.config.channel, e));
                false
            }
        }
    }

    /// True once per press
    pub fn pressed(&mut self) -> bool {
        let current = self.get();
        let edge = current && !self.triggered;
        self.triggered = current;
        if edge {
            self.logger.debug(format!("DIO {} pressed", self.config.channel));
        }
        edge
    }

    /// True once per release
    pub fn released(&mut self) -> bool {
        let current = self.get();
        let edge = !current && self.triggered;
        self.triggered = current;
        if edge {
            self.logger.debug(format!("DIO {} released", self.config.channel));
        }
        edge
    }

    /// State as of the last edge poll
    pub fn is_pressed(&self) -> bool {
        self.triggered
    }

    /// Forget edge history
    pub fn reset(&mut self) {
        self.triggered = false;
    }
}
