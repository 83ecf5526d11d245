//! Component-scoped logging
//!
//! Every wrapper receives a [`Logger`] from whoever builds it instead of
//! reaching for a global. Events go through `tracing` with a `component`
//! field, so any subscriber (the fmt one installed by [`init`], a test
//! capture, the host's own) sees where they came from.

use std::fmt;
use std::sync::{Arc, Once};

use crate::Error;

static INIT: Once = Once::new();

/// Install the default `tracing-subscriber` fmt subscriber.
///
/// Runs at most once per process. If another subscriber is already set
/// globally it is left alone.
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_target(false).try_init();
    });
}

/// A cheap-to-clone logging handle tagged with a component path
#[derive(Debug, Clone)]
pub struct Logger {
    component: Arc<str>,
    enabled: bool,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new("simplibot")
    }
}

impl Logger {
    /// Create a logger for the given component
    pub fn new(component: impl Into<Arc<str>>) -> Self {
        Self {
            component: component.into(),
            enabled: true,
        }
    }

    /// A logger that drops everything below error level
    pub fn quiet(component: impl Into<Arc<str>>) -> Self {
        Self {
            component: component.into(),
            enabled: false,
        }
    }

    /// Derive a logger for a sub-component, e.g. `Robot` -> `Robot/Drive`
    pub fn child(&self, name: &str) -> Self {
        Self {
            component: Arc::from(format!("{}/{}", self.component, name)),
            enabled: self.enabled,
        }
    }

    /// Component path
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Whether non-error events are emitted
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        if self.enabled {
            tracing::debug!(component = %self.component, "{}", msg);
        }
    }

    pub fn info(&self, msg: impl fmt::Display) {
        if self.enabled {
            tracing::info!(component = %self.component, "{}", msg);
        }
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        if self.enabled {
            tracing::warn!(component = %self.component, "{}", msg);
        }
    }

    /// Errors are always emitted, even from a quiet logger
    pub fn error(&self, msg: impl fmt::Display) {
        tracing::error!(component = %self.component, "{}", msg);
    }

    /// Log an error together with its cause
    pub fn error_with(&self, msg: impl fmt::Display, err: &Error) {
        tracing::error!(component = %self.component, error = %err, "{}", msg);
    }
}
