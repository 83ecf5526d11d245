//! NetworkTables access
//!
//! The host owns the real NetworkTables service; this module only forwards
//! to it through [`NetworkTablesBackend`]. [`LocalNetworkTables`] is an
//! in-process implementation with the same latest-value semantics, used by
//! the simulated backend and tests.

mod local;
mod table;

pub use local::LocalNetworkTables;
pub use table::{NetworkTable, DEFAULT_TABLE};

use crossbeam_channel::{self as cc, RecvTimeoutError, TryRecvError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::hardware::DeviceResult;
use crate::{Error, Result};

/// A NetworkTables entry value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Type name for log messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Host NetworkTables service
pub trait NetworkTablesBackend: Send + Sync {
    /// Current value of `table/key`, if any
    fn get(&self, table: &str, key: &str) -> Option<Value>;

    /// Publish a value, replacing the previous one
    fn put(&self, table: &str, key: &str, value: Value) -> DeviceResult<()>;

    /// Listen for updates to `table/key`. The current value, if any, is
    /// delivered first.
    fn subscribe(&self, table: &str, key: &str) -> DeviceResult<EntryListener>;

    /// Keys currently present in `table`
    fn keys(&self, table: &str) -> Vec<String>;
}

/// Receives updates for one entry
#[derive(Debug, Clone)]
pub struct EntryListener {
    pub(crate) inner: cc::Receiver<Value>,
}

impl EntryListener {
    /// Wrap a raw receiver (for backends outside this crate)
    pub fn new(inner: cc::Receiver<Value>) -> Self {
        Self { inner }
    }

    /// Try to receive without blocking
    #[inline]
    pub fn try_recv(&self) -> Result<Option<Value>> {
        match self.inner.try_recv() {
            Ok(v) => Ok(Some(v)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::ChannelClosed),
        }
    }

    /// Receive with a timeout
    #[inline]
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Value>> {
        match self.inner.recv_timeout(timeout) {
            Ok(v) => Ok(Some(v)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::ChannelClosed),
        }
    }

    /// Get the latest update, discarding older ones
    pub fn latest(&self) -> Result<Option<Value>> {
        let mut latest = match self.try_recv()? {
            Some(v) => v,
            None => return Ok(None),
        };
        while let Ok(v) = self.inner.try_recv() {
            latest = v;
        }
        Ok(Some(latest))
    }

    /// Drain all pending updates
    pub fn drain(&self) -> Vec<Value> {
        self.inner.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::from(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from("red").as_str(), Some("red"));
        assert_eq!(Value::from("red").as_f64(), None);
        assert_eq!(Value::from(1.0).type_name(), "number");
    }

    #[test]
    fn test_listener_closed() {
        let (tx, rx) = cc::bounded(4);
        let listener = EntryListener::new(rx);
        tx.send(Value::Number(1.0)).unwrap();
        tx.send(Value::Number(2.0)).unwrap();
        assert_eq!(listener.latest().unwrap(), Some(Value::Number(2.0)));
        drop(tx);
        assert!(matches!(listener.try_recv(), Err(Error::ChannelClosed)));
    }
}
