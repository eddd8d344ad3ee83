// src/watch/origin.rs

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::types::Origin;

/// Custom "is this external?" heuristic: `(key, new, old) -> bool`.
pub type ClassifyFn = Arc<dyn Fn(&str, &Value, Option<&Value>) -> bool + Send + Sync>;

/// Decides whether a change is `user` or `external`.
///
/// Priority:
/// 1. the external-update flag is set → `External`
/// 2. a custom classifier is configured → its answer
/// 3. `User`
#[derive(Clone, Default)]
pub struct OriginClassifier {
    custom: Option<ClassifyFn>,
}

impl fmt::Debug for OriginClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OriginClassifier")
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

impl OriginClassifier {
    pub fn new(custom: Option<ClassifyFn>) -> Self {
        Self { custom }
    }

    pub fn classify(
        &self,
        key: &str,
        new: &Value,
        old: Option<&Value>,
        external_flag: bool,
    ) -> Origin {
        if external_flag {
            return Origin::External;
        }
        match &self.custom {
            Some(custom) if custom(key, new, old) => Origin::External,
            _ => Origin::User,
        }
    }
}
