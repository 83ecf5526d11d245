//! Tuning constants by dotted key
//!
//! A [`Settings`] store keeps values such as `arm.kp` or `motors.intake`
//! out of robot code. Keys are paths into a TOML tree, so a file with a
//! `[motors.intake]` table and `settings.set("motors.intake", spec)` land
//! in the same place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use toml::{Table, Value};

use crate::motors::MotorSpec;
use crate::{Error, Result};

const MOTORS: &str = "motors";

/// Key/value store for robot constants
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    root: Table,
}

fn split(key: &str) -> Result<Vec<&str>> {
    if key.trim().is_empty() {
        return Err(Error::Config("settings key must be a non-empty string".into()));
    }
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::Config(format!("malformed settings key '{}'", key)));
    }
    Ok(parts)
}

fn merge(into: &mut Table, from: Table) {
    for (k, v) in from {
        match v {
            Value::Table(incoming) => match into.get_mut(&k) {
                Some(Value::Table(existing)) => merge(existing, incoming),
                _ => {
                    into.insert(k, Value::Table(incoming));
                }
            },
            v => {
                into.insert(k, v);
            }
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML into a new store
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut settings = Self::new();
        settings.load_toml_str(s)?;
        Ok(settings)
    }

    /// Merge TOML into the store; existing keys are overwritten
    pub fn load_toml_str(&mut self, s: &str) -> Result<()> {
        let table: Table = s.parse()?;
        merge(&mut self.root, table);
        Ok(())
    }

    fn lookup(&self, key: &str) -> Result<Option<&Value>> {
        let parts = split(key)?;
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return Ok(None),
        };
        let mut table = &self.root;
        for part in parents {
            match table.get(*part) {
                Some(Value::Table(t)) => table = t,
                _ => return Ok(None),
            }
        }
        Ok(table.get(*last))
    }

    /// Store `value` at `key`, creating intermediate tables
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let parts = split(key)?;
        let value = Value::try_from(value)
            .map_err(|e| Error::Config(format!("cannot store '{}': {}", key, e)))?;
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return Ok(()),
        };
        let mut table = &mut self.root;
        for part in parents {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            table = match entry {
                Value::Table(t) => t,
                _ => return Err(Error::Config(format!("cannot store '{}'", key))),
            };
        }
        table.insert(last.to_string(), value);
        Ok(())
    }

    /// Value at `key`; a missing key is a config error naming it
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)?
            .ok_or_else(|| Error::Config(format!("settings key '{}' not found", key)))?;
        value
            .clone()
            .try_into()
            .map_err(|e| Error::Config(format!("settings key '{}': {}", key, e)))
    }

    /// Value at `key`, or `default` when absent
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        if self.has(key) {
            self.get(key)
        } else {
            Ok(default)
        }
    }

    pub fn has(&self, key: &str) -> bool {
        matches!(self.lookup(key), Ok(Some(_)))
    }

    /// Remove `key`, returning whether it was present
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let parts = split(key)?;
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return Ok(false),
        };
        let mut table = &mut self.root;
        for part in parents {
            match table.get_mut(*part) {
                Some(Value::Table(t)) => table = t,
                _ => return Ok(false),
            }
        }
        Ok(table.remove(*last).is_some())
    }

    /// Motor spec stored under `motors.<name>`
    pub fn motor(&self, name: &str) -> Result<MotorSpec> {
        let key = format!("{}.{}", MOTORS, name);
        if !self.has(&key) {
            return Err(Error::Config(format!(
                "motor configuration for '{}' not found",
                name
            )));
        }
        let spec: MotorSpec = self.get(&key)?;
        spec.validate().map_err(|e| e.in_field(&key))?;
        Ok(spec)
    }

    pub fn set_motor(&mut self, name: &str, spec: &MotorSpec) -> Result<()> {
        self.set(&format!("{}.{}", MOTORS, name), spec)
    }

    pub fn clear(&mut self) {
        self.root.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}
