// src/replay.rs

//! JSON-lines mutation scripts for the `formwatch` binary.
//!
//! One step per line:
//!
//! ```text
//! {"set": {"key": "name", "value": "John"}}
//! {"remove": "nickname"}
//! {"external": [{"set": {"key": "id", "value": 7}}]}
//! {"sleep_ms": 150}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::engine::FormWatchers;
use crate::errors::{Result, WatchError};
use crate::state::FormState;
use crate::types::FieldKey;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum ScriptStep {
    Set { key: FieldKey, value: Value },
    Remove(FieldKey),
    /// Apply the nested steps inside one external-update scope.
    External(Vec<ScriptStep>),
    SleepMs(u64),
}

impl ScriptStep {
    fn contains_sleep(&self) -> bool {
        match self {
            ScriptStep::SleepMs(_) => true,
            ScriptStep::External(steps) => steps.iter().any(ScriptStep::contains_sleep),
            ScriptStep::Set { .. } | ScriptStep::Remove(_) => false,
        }
    }
}

/// Read a script from a path, or from stdin when `source` is `-`.
pub fn read_script(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(source)?)
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let step: ScriptStep = serde_json::from_str(line)
            .map_err(|e| WatchError::InvalidInput(format!("script line {line_no}: {e}")))?;

        // External scopes are synchronous; time cannot pass inside one.
        if matches!(&step, ScriptStep::External(_)) && step.contains_sleep() {
            return Err(WatchError::InvalidInput(format!(
                "script line {line_no}: sleep_ms is not allowed inside external"
            )));
        }

        steps.push(step);
    }

    Ok(steps)
}

/// Apply every step to `state`, in order.
pub async fn apply(steps: &[ScriptStep], state: &FormState, watchers: &FormWatchers) {
    for step in steps {
        match step {
            ScriptStep::SleepMs(ms) => {
                debug!(ms, "script sleep");
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            ScriptStep::External(inner) => {
                watchers.with_external(|| apply_now(inner, state));
            }
            other => apply_now(std::slice::from_ref(other), state),
        }
    }
}

fn apply_now(steps: &[ScriptStep], state: &FormState) {
    for step in steps {
        match step {
            ScriptStep::Set { key, value } => {
                state.set(key.clone(), value.clone());
            }
            ScriptStep::Remove(key) => {
                state.remove(key);
            }
            ScriptStep::External(inner) => apply_now(inner, state),
            ScriptStep::SleepMs(_) => {}
        }
    }
}
