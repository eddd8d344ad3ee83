// src/engine/event_handlers.rs

//! Event handling logic for the core.

use serde_json::Value;
use tokio::time::Instant;
use tracing::trace;

use crate::diagnostics::{DiagnosticEvent, SkipReason};
use crate::engine::external::ExternalFlag;
use crate::types::{FieldKey, FieldUpdate};
use crate::watch::debounce::Debouncer;
use crate::watch::field::evaluate_change;
use crate::watch::origin::OriginClassifier;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Publish a diagnostic event (subject to the diagnostics switch).
    Emit(DiagnosticEvent),
}

/// Decision returned by the core after handling a single `WatchEvent`.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a field change:
/// 1. classify its origin,
/// 2. report it,
/// 3. drop it if it is external and external updates are skipped,
/// 4. otherwise put it on the debouncer, replacing whatever was pending.
#[allow(clippy::too_many_arguments)]
pub fn handle_field_change(
    classifier: &OriginClassifier,
    skip_external_updates: bool,
    debouncer: &mut Debouncer<FieldUpdate>,
    external_flag: bool,
    key: FieldKey,
    new: Value,
    old: Option<Value>,
    now: Instant,
) -> CoreStep {
    let outcome = evaluate_change(
        classifier,
        skip_external_updates,
        &key,
        &new,
        old.as_ref(),
        external_flag,
    );

    let mut commands = vec![CoreCommand::Emit(DiagnosticEvent::ValueChanged {
        key: key.clone(),
        old,
        new: new.clone(),
        origin: outcome.origin,
    })];

    if !outcome.forward {
        commands.push(CoreCommand::Emit(DiagnosticEvent::UpdateSkipped {
            key,
            reason: SkipReason::ExternalUpdate,
        }));
        return CoreStep::running(commands);
    }

    let superseded = debouncer.schedule(FieldUpdate::new(key, new, outcome.origin), now);
    trace!(superseded, "update scheduled");

    CoreStep::running(commands)
}

/// Handle the deferred end of an external scope.
pub fn handle_scope_ended(external: &ExternalFlag, epoch: u64) -> CoreStep {
    external.reset_if_current(epoch);
    CoreStep::running(Vec::new())
}

/// Handle shutdown: drop the pending debounced call and stop.
pub fn handle_shutdown(debouncer: &mut Debouncer<FieldUpdate>) -> CoreStep {
    if let Some(dropped) = debouncer.cancel() {
        trace!(key = %dropped.key, "pending update cancelled by shutdown");
    }
    CoreStep {
        commands: Vec::new(),
        keep_running: false,
    }
}
