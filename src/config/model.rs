// src/config/model.rs

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [watch]
/// debounce_ms = 300
/// fire_on_attach = false
/// skip_external_updates = true
/// diagnostics = false
/// excluded_keys = ["password"]
/// exclude_patterns = ["_*"]
/// ```
///
/// The `[watch]` section is optional and every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Fire once for every field when its watcher is attached.
    #[serde(default)]
    pub fire_on_attach: bool,

    /// Drop changes classified as external instead of forwarding them.
    #[serde(default = "default_skip_external_updates")]
    pub skip_external_updates: bool,

    #[serde(default)]
    pub diagnostics: bool,

    /// Keys that are never observed.
    #[serde(default)]
    pub excluded_keys: Vec<String>,

    /// Glob patterns; matching keys are never observed.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_skip_external_updates() -> bool {
    true
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            fire_on_attach: false,
            skip_external_updates: default_skip_external_updates(),
            diagnostics: false,
            excluded_keys: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(watch: WatchSection) -> Self {
        Self { watch }
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(WatchSection::default())
    }
}
