//! In-process NetworkTables store

use crossbeam_channel::{self as cc, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{EntryListener, NetworkTablesBackend, Value};
use crate::hardware::DeviceResult;

/// Buffered updates per listener before new ones are dropped
const LISTENER_BUFFER: usize = 16;

#[derive(Default)]
struct Entry {
    value: Option<Value>,
    listeners: Vec<cc::Sender<Value>>,
}

impl Entry {
    fn publish(&mut self, value: Value) {
        self.value = Some(value.clone());
        // a full listener is slow, not gone; keep it
        self.listeners
            .retain(|tx| !matches!(tx.try_send(value.clone()), Err(TrySendError::Disconnected(_))));
    }
}

/// Latest-value key/value store keyed by `table/key`
#[derive(Default)]
pub struct LocalNetworkTables {
    entries: RwLock<HashMap<String, Entry>>,
}

impl LocalNetworkTables {
    pub fn new() -> Self {
        Self::default()
    }

    fn path(table: &str, key: &str) -> String {
        format!("/{}/{}", table, key)
    }

    /// Number of entries across all tables
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| e.value.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry and listener
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl std::fmt::Debug for LocalNetworkTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalNetworkTables")
            .field("entries", &self.len())
            .finish()
    }
}

impl NetworkTablesBackend for LocalNetworkTables {
    fn get(&self, table: &str, key: &str) -> Option<Value> {
        self.entries
            .read()
            .get(&Self::path(table, key))
            .and_then(|e| e.value.clone())
    }

    fn put(&self, table: &str, key: &str, value: Value) -> DeviceResult<()> {
        self.entries
            .write()
            .entry(Self::path(table, key))
            .or_default()
            .publish(value);
        Ok(())
    }

    fn subscribe(&self, table: &str, key: &str) -> DeviceResult<EntryListener> {
        let (tx, rx) = cc::bounded(LISTENER_BUFFER);
        let mut entries = self.entries.write();
        let entry = entries.entry(Self::path(table, key)).or_default();
        if let Some(value) = &entry.value {
            let _ = tx.try_send(value.clone());
        }
        entry.listeners.push(tx);
        Ok(EntryListener::new(rx))
    }

    fn keys(&self, table: &str) -> Vec<String> {
        let prefix = format!("/{}/", table);
        let mut keys: Vec<String> = self
            .entries
            .read()
            .iter()
            .filter(|(_, e)| e.value.is_some())
            .filter_map(|(path, _)| path.strip_prefix(&prefix).map(str::to_string))
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let nt = LocalNetworkTables::new();
        assert!(nt.get("vision", "x").is_none());
        nt.put("vision", "x", Value::Number(3.0)).unwrap();
        nt.put("vision", "x", Value::Number(4.0)).unwrap();
        assert_eq!(nt.get("vision", "x"), Some(Value::Number(4.0)));
        assert!(nt.get("other", "x").is_none());
        assert_eq!(nt.len(), 1);
    }

    #[test]
    fn test_subscribe_latched() {
        let nt = LocalNetworkTables::new();
        nt.put("t", "k", Value::Bool(true)).unwrap();
        let listener = nt.subscribe("t", "k").unwrap();
        assert_eq!(listener.try_recv().unwrap(), Some(Value::Bool(true)));
        nt.put("t", "k", Value::Bool(false)).unwrap();
        assert_eq!(listener.try_recv().unwrap(), Some(Value::Bool(false)));
        assert_eq!(listener.try_recv().unwrap(), None);
    }

    #[test]
    fn test_slow_listener_kept() {
        let nt = LocalNetworkTables::new();
        let listener = nt.subscribe("t", "k").unwrap();
        for i in 0..(LISTENER_BUFFER + 5) {
            nt.put("t", "k", Value::Number(i as f64)).unwrap();
        }
        assert_eq!(listener.drain().len(), LISTENER_BUFFER);
        nt.put("t", "k", Value::Number(-1.0)).unwrap();
        assert_eq!(listener.try_recv().unwrap(), Some(Value::Number(-1.0)));
    }

    #[test]
    fn test_keys_per_table() {
        let nt = LocalNetworkTables::new();
        nt.put("vision", "y", 1.0.into()).unwrap();
        nt.put("vision", "x", 1.0.into()).unwrap();
        nt.put("datatable", "z", 1.0.into()).unwrap();
        let _ = nt.subscribe("vision", "pending").unwrap();
        assert_eq!(nt.keys("vision"), vec!["x".to_string(), "y".to_string()]);
    }
}
