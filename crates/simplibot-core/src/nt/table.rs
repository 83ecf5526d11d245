//! Named table wrapper

use std::sync::Arc;

use super::{EntryListener, NetworkTablesBackend, Value};
use crate::logging::Logger;
use crate::{Error, Result};

/// Default table for general robot data
pub const DEFAULT_TABLE: &str = "datatable";

/// One NetworkTables table with typed getters that fall back to a default
#[derive(Clone)]
pub struct NetworkTable {
    backend: Arc<dyn NetworkTablesBackend>,
    name: String,
    logger: Logger,
}

impl std::fmt::Debug for NetworkTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkTable")
            .field("name", &self.name)
            .finish()
    }
}

impl NetworkTable {
    pub fn new(
        backend: Arc<dyn NetworkTablesBackend>,
        name: impl Into<String>,
        logger: &Logger,
    ) -> Self {
        let name = name.into();
        let logger = logger.child(&format!("NT:{}", name));
        logger.debug("table opened");
        Self {
            backend,
            name,
            logger,
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Publish any value
    pub fn put(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.backend.put(&self.name, key, value).map_err(|e| {
            let err = Error::Hardware(format!("failed to publish {}/{}: {}", self.name, key, e));
            self.logger.error_with("publish failed", &err);
            err
        })
    }

    /// Raw value, if present
    pub fn get(&self, key: &str) -> Option<Value> {
        self.backend.get(&self.name, key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.backend.keys(&self.name)
    }

    pub fn put_number(&self, key: &str, value: f64) -> Result<()> {
        self.put(key, Value::Number(value))
    }

    pub fn put_boolean(&self, key: &str, value: bool) -> Result<()> {
        self.put(key, Value::Bool(value))
    }

    pub fn put_string(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, Value::from(value))
    }

    pub fn get_number(&self, key: &str, default: f64) -> f64 {
        self.typed(key, Value::as_f64).unwrap_or(default)
    }

    pub fn get_boolean(&self, key: &str, default: bool) -> bool {
        self.typed(key, Value::as_bool).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.typed(key, |v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    /// Listen for updates to one entry
    pub fn subscribe(&self, key: &str) -> Result<EntryListener> {
        self.backend
            .subscribe(&self.name, key)
            .map_err(|e| Error::Hardware(format!("failed to subscribe {}/{}: {}", self.name, key, e)))
    }

    fn typed<T>(&self, key: &str, extract: impl Fn(&Value) -> Option<T>) -> Option<T> {
        let value = self.get(key)?;
        let out = extract(&value);
        if out.is_none() {
            self.logger.debug(format!(
                "entry '{}' holds a {}, using default",
                key,
                value.type_name()
            ));
        }
        out
    }
}
