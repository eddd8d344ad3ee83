// src/watch/exclude.rs

use std::collections::BTreeSet;
use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::types::FieldKey;

/// Keys that must never be observed.
///
/// A key is excluded when it is listed verbatim in `excluded_keys` or matches
/// one of the `exclude_patterns` globs (e.g. `"meta.*"`, `"_*"`).
#[derive(Clone, Default)]
pub struct KeyFilter {
    keys: BTreeSet<FieldKey>,
    patterns: Vec<String>,
    pattern_set: Option<GlobSet>,
}

impl fmt::Debug for KeyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFilter")
            .field("keys", &self.keys)
            .field("patterns", &self.patterns)
            .finish()
    }
}

impl KeyFilter {
    pub fn new<I, P>(keys: I, patterns: P) -> Result<Self>
    where
        I: IntoIterator<Item = FieldKey>,
        P: IntoIterator<Item = String>,
    {
        let keys: BTreeSet<FieldKey> = keys.into_iter().collect();
        let patterns: Vec<String> = patterns.into_iter().collect();

        let pattern_set = if patterns.is_empty() {
            None
        } else {
            Some(build_globset(&patterns).context("building exclude pattern set")?)
        };

        Ok(Self {
            keys,
            patterns,
            pattern_set,
        })
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        if self.keys.contains(key) {
            return true;
        }
        match &self.pattern_set {
            Some(set) => set.is_match(key),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.pattern_set.is_none()
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_keys_are_excluded() {
        let f = KeyFilter::new(vec!["email".to_string()], Vec::new()).unwrap();
        assert!(f.is_excluded("email"));
        assert!(!f.is_excluded("name"));
        assert!(!f.is_excluded("email2"));
    }

    #[test]
    fn patterns_match_whole_keys() {
        let f = KeyFilter::new(Vec::new(), vec!["_*".to_string(), "meta.*".to_string()]).unwrap();
        assert!(f.is_excluded("_internal"));
        assert!(f.is_excluded("meta.createdAt"));
        assert!(!f.is_excluded("name_"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let err = KeyFilter::new(Vec::new(), vec!["[".to_string()]).unwrap_err();
        assert!(format!("{err:#}").contains("invalid glob pattern"));
    }

    #[test]
    fn default_filter_excludes_nothing() {
        let f = KeyFilter::default();
        assert!(f.is_empty());
        assert!(!f.is_excluded(""));
    }
}
