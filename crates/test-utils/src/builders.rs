#![allow(dead_code)]

use std::time::Duration;

use formwatch::config::{ConfigFile, RawConfigFile, WatchSection};
use formwatch::{FormState, WatchOptions};
use serde_json::Value;

/// A `FormState` holding the given fields.
pub fn state_with(fields: &[(&str, Value)]) -> FormState {
    let state = FormState::new();
    for (key, value) in fields {
        state.set(*key, value.clone());
    }
    state
}

/// Default options with a short debounce window, as used by most tests.
pub fn options_ms(delay_ms: u64) -> WatchOptions {
    WatchOptions::new().with_debounce_delay(Duration::from_millis(delay_ms))
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                watch: WatchSection::default(),
            },
        }
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.watch.debounce_ms = ms;
        self
    }

    pub fn fire_on_attach(mut self, val: bool) -> Self {
        self.config.watch.fire_on_attach = val;
        self
    }

    pub fn skip_external_updates(mut self, val: bool) -> Self {
        self.config.watch.skip_external_updates = val;
        self
    }

    pub fn diagnostics(mut self, val: bool) -> Self {
        self.config.watch.diagnostics = val;
        self
    }

    pub fn exclude_key(mut self, key: &str) -> Self {
        self.config.watch.excluded_keys.push(key.to_string());
        self
    }

    pub fn exclude_pattern(mut self, pattern: &str) -> Self {
        self.config.watch.exclude_patterns.push(pattern.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
