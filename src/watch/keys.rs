// src/watch/keys.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::diagnostics::DiagnosticEvent;
use crate::engine::context::WatchContext;
use crate::state::ObserveOptions;
use crate::types::FieldKey;
use crate::watch::field::FieldWatcher;

/// Keys present in `current` but not in `previous`. Removals are ignored.
pub fn added_keys(previous: &BTreeSet<FieldKey>, current: &BTreeSet<FieldKey>) -> Vec<FieldKey> {
    current.difference(previous).cloned().collect()
}

/// Watches the container's key set and attaches field watchers to keys
/// that show up after initialisation.
pub struct KeySetWatcher;

impl KeySetWatcher {
    /// Install the key-set observation, then attach a field watcher for
    /// every key currently present.
    ///
    /// The known-key lock is held from before the observation is installed
    /// until the initial snapshot is stored, so a concurrent key-set callback
    /// always diffs against that snapshot and a key added during
    /// construction is picked up exactly once.
    pub(crate) fn attach(ctx: &Arc<WatchContext>) {
        let initial = {
            let mut known = ctx.known_keys();
            let weak = Arc::downgrade(ctx);
            let handle = ctx.state.observe_keys(
                ObserveOptions::deep(),
                Arc::new(
                    move |current: &BTreeSet<FieldKey>, _previous: Option<&BTreeSet<FieldKey>>| {
                        if let Some(ctx) = weak.upgrade() {
                            KeySetWatcher::on_keys_changed(&ctx, current);
                        }
                    },
                ),
            );
            ctx.register(handle);

            let initial = ctx.state.keys();
            *known = initial.clone();
            initial
        };

        let mut attached = 0usize;
        for key in &initial {
            if FieldWatcher::attach(ctx, key) {
                attached += 1;
            }
        }
        debug!(keys = initial.len(), attached, "initial field watchers attached");
    }

    fn on_keys_changed(ctx: &Arc<WatchContext>, current: &BTreeSet<FieldKey>) {
        if ctx.is_destroyed() {
            return;
        }

        // Diagnostics and attaching may re-enter through the container, so
        // the lock only covers the diff.
        let added = {
            let mut known = ctx.known_keys();
            let added = added_keys(&known, current);
            *known = current.clone();
            added
        };

        if added.is_empty() {
            return;
        }

        debug!(?added, "new keys detected");
        ctx.options.diagnostics.emit(DiagnosticEvent::KeysAdded {
            keys: added.clone(),
        });

        for key in &added {
            FieldWatcher::attach(ctx, key);
        }
    }
}
