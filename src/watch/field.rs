// src/watch/field.rs

//! Per-field watchers.
//!
//! A field watcher has two halves:
//! - the observation callback, which runs synchronously inside the container
//!   mutation, filters no-op writes and captures the external-update flag
//!   before handing a change event to the engine loop, and
//! - [`evaluate_change`], which the engine loop runs to classify the change
//!   and decide whether it goes to the debouncer.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::diagnostics::{DiagnosticEvent, SkipReason};
use crate::engine::context::WatchContext;
use crate::engine::WatchEvent;
use crate::state::ObserveOptions;
use crate::types::Origin;
use crate::watch::origin::OriginClassifier;

pub struct FieldWatcher;

impl FieldWatcher {
    /// Attach a watcher for `key` and register it.
    ///
    /// Returns false without observing anything when the orchestrator is
    /// destroyed, the key is excluded, or the key is already watched.
    pub(crate) fn attach(ctx: &Arc<WatchContext>, key: &str) -> bool {
        if ctx.is_destroyed() {
            return false;
        }

        if ctx.options.filter.is_excluded(key) {
            debug!(%key, "key excluded from watching");
            ctx.options.diagnostics.emit(DiagnosticEvent::UpdateSkipped {
                key: key.to_string(),
                reason: SkipReason::Excluded,
            });
            return false;
        }

        if ctx.is_watching(key) {
            trace!(%key, "key already watched");
            return false;
        }

        let options = ObserveOptions::deep().immediate(ctx.options.fire_on_attach);
        let weak = Arc::downgrade(ctx);
        let watched_key = key.to_string();
        let handle = ctx.state.observe_field(
            key,
            options,
            Arc::new(move |new: Option<&Value>, old: Option<&Value>| {
                if let Some(ctx) = weak.upgrade() {
                    on_field_change(&ctx, &watched_key, new, old);
                }
            }),
        );

        let registered = ctx.register_field(key, handle);
        if registered {
            trace!(%key, immediate = options.immediate, "field watcher attached");
        }
        registered
    }
}

/// Observation callback: drop no-op writes and removals, forward the rest to
/// the engine loop.
fn on_field_change(ctx: &WatchContext, key: &str, new: Option<&Value>, old: Option<&Value>) {
    if ctx.is_destroyed() {
        return;
    }

    let Some(new) = new else {
        trace!(%key, "field removed; not forwarded");
        return;
    };

    if old == Some(new) {
        return;
    }

    ctx.send(WatchEvent::FieldChanged {
        key: key.to_string(),
        new: new.clone(),
        old: old.cloned(),
        external: ctx.external.is_set(),
    });
}

/// Result of evaluating one change on the engine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeOutcome {
    pub origin: Origin,
    /// Whether the change should be scheduled on the debouncer.
    pub forward: bool,
}

/// Classify a change and decide whether it is forwarded.
pub fn evaluate_change(
    classifier: &OriginClassifier,
    skip_external_updates: bool,
    key: &str,
    new: &Value,
    old: Option<&Value>,
    external_flag: bool,
) -> ChangeOutcome {
    let origin = classifier.classify(key, new, old, external_flag);
    let forward = !(origin.is_external() && skip_external_updates);
    ChangeOutcome { origin, forward }
}
