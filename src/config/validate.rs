// src/config/validate.rs

use std::collections::BTreeSet;

use tracing::warn;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, WatchError};
use crate::watch::exclude::build_globset;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_excluded_keys(&cfg.watch.excluded_keys)
        .map_err(|e| WatchError::ConfigError(format!("[watch].excluded_keys: {e}")))?;
    validate_exclude_patterns(&cfg.watch.exclude_patterns)?;
    Ok(())
}

/// Every excluded key must be a non-empty string. Duplicates are tolerated
/// but logged.
pub fn validate_excluded_keys(keys: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for (idx, key) in keys.iter().enumerate() {
        if key.is_empty() {
            return Err(WatchError::InvalidInput(format!(
                "excluded key at index {idx} is empty"
            )));
        }
        if !seen.insert(key.as_str()) {
            warn!(%key, "duplicate excluded key");
        }
    }
    Ok(())
}

fn validate_exclude_patterns(patterns: &[String]) -> Result<()> {
    if patterns.is_empty() {
        return Ok(());
    }
    build_globset(patterns)
        .map(|_| ())
        .map_err(|e| WatchError::ConfigError(format!("[watch].exclude_patterns: {e:#}")))
}
