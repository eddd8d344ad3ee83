use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical field key type used throughout the crate.
pub type FieldKey = String;

/// Where a change came from.
///
/// - `User`: the consuming application's own logic wrote the value.
/// - `External`: the value was written inside a
///   [`FormWatchers::mark_update_as_external`](crate::engine::FormWatchers::mark_update_as_external)
///   scope, or a custom classifier said so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    User,
    External,
}

impl Default for Origin {
    fn default() -> Self {
        Origin::User
    }
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::User => "user",
            Origin::External => "external",
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Origin::External)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Origin::User),
            "external" => Ok(Origin::External),
            other => Err(format!(
                "invalid origin: {other} (expected \"user\" or \"external\")"
            )),
        }
    }
}

/// A single debounced update delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldUpdate {
    pub key: FieldKey,
    pub value: Value,
    pub origin: Origin,
}

impl FieldUpdate {
    pub fn new(key: impl Into<FieldKey>, value: Value, origin: Origin) -> Self {
        Self {
            key: key.into(),
            value,
            origin,
        }
    }
}
