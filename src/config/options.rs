// src/config/options.rs

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::config::model::ConfigFile;
use crate::config::validate::validate_excluded_keys;
use crate::diagnostics::{DiagnosticSink, Diagnostics};
use crate::errors::{Result, WatchError};
use crate::types::FieldKey;
use crate::watch::exclude::KeyFilter;
use crate::watch::origin::{ClassifyFn, OriginClassifier};

pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Runtime options for one set of form watchers.
///
/// Immutable once handed to the orchestrator.
#[derive(Clone)]
pub struct WatchOptions {
    pub debounce_delay: Duration,
    pub fire_on_attach: bool,
    pub skip_external_updates: bool,
    pub classify_external: Option<ClassifyFn>,
    pub diagnostics: bool,
    pub diagnostic_sink: Option<Arc<dyn DiagnosticSink>>,
    pub excluded_keys: BTreeSet<FieldKey>,
    pub exclude_patterns: Vec<String>,
}

impl fmt::Debug for WatchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchOptions")
            .field("debounce_delay", &self.debounce_delay)
            .field("fire_on_attach", &self.fire_on_attach)
            .field("skip_external_updates", &self.skip_external_updates)
            .field("classify_external", &self.classify_external.is_some())
            .field("diagnostics", &self.diagnostics)
            .field("excluded_keys", &self.excluded_keys)
            .field("exclude_patterns", &self.exclude_patterns)
            .finish_non_exhaustive()
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce_delay: DEFAULT_DEBOUNCE_DELAY,
            fire_on_attach: false,
            skip_external_updates: true,
            classify_external: None,
            diagnostics: false,
            diagnostic_sink: None,
            excluded_keys: BTreeSet::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Raw options as they arrive from an untyped source (e.g. a JSON blob).
///
/// Both `camelCase` and `snake_case` field names are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawWatchOptions {
    #[serde(default, alias = "debounce_delay", alias = "debounce_ms")]
    debounce_delay: Option<u64>,
    #[serde(default, alias = "fire_on_attach", alias = "immediate")]
    fire_on_attach: Option<bool>,
    #[serde(default, alias = "skip_external_updates")]
    skip_external_updates: Option<bool>,
    #[serde(default, alias = "debug")]
    diagnostics: Option<bool>,
    #[serde(default, alias = "excluded_keys", alias = "excludeFields")]
    excluded_keys: Option<Vec<String>>,
    #[serde(default, alias = "exclude_patterns")]
    exclude_patterns: Option<Vec<String>>,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from a validated config file.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let watch = cfg.watch();
        Self {
            debounce_delay: Duration::from_millis(watch.debounce_ms),
            fire_on_attach: watch.fire_on_attach,
            skip_external_updates: watch.skip_external_updates,
            diagnostics: watch.diagnostics,
            excluded_keys: watch.excluded_keys.iter().cloned().collect(),
            exclude_patterns: watch.exclude_patterns.clone(),
            ..Self::default()
        }
    }

    /// Options from an untyped JSON object, e.g.
    /// `{"debounceDelay": 100, "excludedKeys": ["email"]}`.
    ///
    /// `null` means "all defaults". Anything other than an object, or an
    /// `excludedKeys` that is not a sequence of strings, is an
    /// [`WatchError::InvalidInput`].
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(obj) => obj,
            _ => {
                return Err(WatchError::InvalidInput(
                    "options must be an object".to_string(),
                ));
            }
        };

        for name in ["excludedKeys", "excluded_keys", "excludeFields"] {
            if let Some(keys) = obj.get(name) {
                let is_string_seq = keys
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string));
                if !is_string_seq {
                    return Err(WatchError::InvalidInput(format!(
                        "{name} must be a sequence of strings"
                    )));
                }
            }
        }

        let raw: RawWatchOptions = serde_json::from_value(value.clone())
            .map_err(|e| WatchError::InvalidInput(format!("invalid options: {e}")))?;

        let mut opts = Self::default();
        if let Some(ms) = raw.debounce_delay {
            opts.debounce_delay = Duration::from_millis(ms);
        }
        if let Some(v) = raw.fire_on_attach {
            opts.fire_on_attach = v;
        }
        if let Some(v) = raw.skip_external_updates {
            opts.skip_external_updates = v;
        }
        if let Some(v) = raw.diagnostics {
            opts.diagnostics = v;
        }
        if let Some(keys) = raw.excluded_keys {
            validate_excluded_keys(&keys)?;
            opts.excluded_keys = keys.into_iter().collect();
        }
        if let Some(patterns) = raw.exclude_patterns {
            opts.exclude_patterns = patterns;
        }
        Ok(opts)
    }

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    pub fn with_fire_on_attach(mut self, fire: bool) -> Self {
        self.fire_on_attach = fire;
        self
    }

    pub fn with_skip_external_updates(mut self, skip: bool) -> Self {
        self.skip_external_updates = skip;
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Enables diagnostics and routes them to `sink`.
    pub fn with_diagnostic_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = true;
        self.diagnostic_sink = Some(Arc::new(sink));
        self
    }

    pub fn with_classifier<F>(mut self, classify: F) -> Self
    where
        F: Fn(&str, &Value, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.classify_external = Some(Arc::new(classify));
        self
    }

    pub fn exclude_key(mut self, key: impl Into<FieldKey>) -> Self {
        self.excluded_keys.insert(key.into());
        self
    }

    pub fn exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Check the options and compile the pieces the watchers share.
    pub(crate) fn compile(&self) -> Result<CompiledOptions> {
        let keys: Vec<String> = self.excluded_keys.iter().cloned().collect();
        validate_excluded_keys(&keys)?;

        let filter = KeyFilter::new(keys, self.exclude_patterns.iter().cloned())
            .map_err(|e| WatchError::InvalidInput(format!("{e:#}")))?;

        Ok(CompiledOptions {
            debounce_delay: self.debounce_delay,
            fire_on_attach: self.fire_on_attach,
            skip_external_updates: self.skip_external_updates,
            classifier: OriginClassifier::new(self.classify_external.clone()),
            filter,
            diagnostics: Diagnostics::new(self.diagnostics, self.diagnostic_sink.clone()),
        })
    }
}

/// Options after validation, shared by reference across all watchers.
#[derive(Debug, Clone)]
pub(crate) struct CompiledOptions {
    pub debounce_delay: Duration,
    pub fire_on_attach: bool,
    pub skip_external_updates: bool,
    pub classifier: OriginClassifier,
    pub filter: KeyFilter,
    pub diagnostics: Diagnostics,
}
