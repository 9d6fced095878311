//! Configuration types

use serde::{Deserialize, Serialize};

use crate::watcher::{WatcherConfig, DEFAULT_DEBOUNCE_MS};

/// Application settings (config.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub watcher: WatcherSettings,
}

impl Settings {
    /// Watcher configuration derived from these settings
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig::new().with_debounce_ms(self.watcher.debounce_ms)
    }
}

/// Session behavior settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSettings {
    /// Subscribe every newly opened session that supports it
    #[serde(default)]
    pub auto_subscribe: bool,
}

/// File watcher settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatcherSettings {
    /// Quiet period before a burst of writes triggers one reload
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
