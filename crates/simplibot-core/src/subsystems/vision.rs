//! Vision targets over NetworkTables
//!
//! A coprocessor publishes `hasTarget`, `x`, `y`, `area` and `distance`
//! into the vision table; [`Vision::target`] reads them back as one value.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::logging::Logger;
use crate::nt::{NetworkTable, NetworkTablesBackend, Value};
use crate::{Error, Result};

/// Default vision table name
pub const DEFAULT_VISION_TABLE: &str = "vision";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_table")]
    pub table_name: String,
}

fn default_table() -> String {
    DEFAULT_VISION_TABLE.to_string()
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            table_name: default_table(),
        }
    }
}

impl VisionConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(Error::Config("table_name must not be empty".into()));
        }
        Ok(())
    }
}

/// A detected target
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetData {
    /// Horizontal offset, degrees
    pub x: f64,
    /// Vertical offset, degrees
    pub y: f64,
    /// Target area, percent of image
    pub area: f64,
    /// Estimated distance
    pub distance: f64,
}

/// Reads targets from and publishes data to the vision table
#[derive(Debug, Clone)]
pub struct Vision {
    table: NetworkTable,
    logger: Logger,
}

impl Vision {
    pub fn new(
        config: &VisionConfig,
        nt: Arc<dyn NetworkTablesBackend>,
        logger: &Logger,
    ) -> Result<Self> {
        config.validate().map_err(|e| e.in_field("vision"))?;
        let logger = logger.child("Vision");
        let table = NetworkTable::new(nt, config.table_name.clone(), &logger);
        logger.info(format!("vision on table '{}'", config.table_name));
        Ok(Self { table, logger })
    }

    /// Current target, or `None` when nothing is in view
    pub fn target(&self) -> Option<TargetData> {
        if !self.table.get_boolean("hasTarget", false) {
            return None;
        }
        Some(TargetData {
            x: self.table.get_number("x", 0.0),
            y: self.table.get_number("y", 0.0),
            area: self.table.get_number("area", 0.0),
            distance: self.table.get_number("distance", 0.0),
        })
    }

    pub fn has_target(&self) -> bool {
        self.target().is_some()
    }

    /// Publish several entries; stops at the first failure
    pub fn publish<K: AsRef<str>>(&self, entries: &[(K, Value)]) -> Result<()> {
        for (key, value) in entries {
            self.table.put(key.as_ref(), value.clone())?;
        }
        self.logger
            .debug(format!("published {} vision entries", entries.len()));
        Ok(())
    }

    pub fn table(&self) -> &NetworkTable {
        &self.table
    }
}
