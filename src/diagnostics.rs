// src/diagnostics.rs

//! Optional diagnostic event stream.
//!
//! When `diagnostics` is enabled in [`WatchOptions`](crate::config::WatchOptions),
//! every [`DiagnosticEvent`] is
//! - logged through `tracing` under the `formwatch::diagnostics` target, and
//! - handed to the configured [`DiagnosticSink`], if any.
//!
//! Diagnostics never influence forwarding.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::types::{FieldKey, Origin};

/// Why a change did not reach the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The key is excluded; no watcher was attached.
    Excluded,
    /// The change was classified external and `skip_external_updates` is on.
    ExternalUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    ValueChanged {
        key: FieldKey,
        old: Option<Value>,
        new: Value,
        origin: Origin,
    },
    UpdateSkipped {
        key: FieldKey,
        reason: SkipReason,
    },
    DebouncedUpdate {
        key: FieldKey,
        value: Value,
        origin: Origin,
    },
    KeysAdded {
        keys: Vec<FieldKey>,
    },
    Destroyed,
}

/// Receiver for structured diagnostic events.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &DiagnosticEvent);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&DiagnosticEvent) + Send + Sync,
{
    fn record(&self, event: &DiagnosticEvent) {
        self(event)
    }
}

/// Emitter shared by every watcher of one orchestrator.
#[derive(Clone, Default)]
pub struct Diagnostics {
    enabled: bool,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Diagnostics {
    pub fn new(enabled: bool, sink: Option<Arc<dyn DiagnosticSink>>) -> Self {
        Self { enabled, sink }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn emit(&self, event: DiagnosticEvent) {
        if !self.enabled {
            return;
        }

        match &event {
            DiagnosticEvent::ValueChanged {
                key,
                old,
                new,
                origin,
            } => debug!(
                target: "formwatch::diagnostics",
                %key, ?old, %new, %origin,
                "value changed"
            ),
            DiagnosticEvent::UpdateSkipped { key, reason } => debug!(
                target: "formwatch::diagnostics",
                %key, ?reason,
                "update skipped"
            ),
            DiagnosticEvent::DebouncedUpdate { key, value, origin } => debug!(
                target: "formwatch::diagnostics",
                %key, %value, %origin,
                "debounced update"
            ),
            DiagnosticEvent::KeysAdded { keys } => debug!(
                target: "formwatch::diagnostics",
                ?keys,
                "new properties detected"
            ),
            DiagnosticEvent::Destroyed => debug!(
                target: "formwatch::diagnostics",
                "destroying watchers"
            ),
        }

        if let Some(sink) = &self.sink {
            sink.record(&event);
        }
    }
}
