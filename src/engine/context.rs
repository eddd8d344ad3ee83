// src/engine/context.rs

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::options::CompiledOptions;
use crate::diagnostics::DiagnosticEvent;
use crate::engine::external::{ExternalFlag, ExternalScope};
use crate::engine::WatchEvent;
use crate::state::{Observable, Subscription};
use crate::types::FieldKey;
use crate::watch::registry::WatcherRegistry;

/// State shared by the orchestrator handle, the engine loop and every
/// watcher callback.
///
/// Watcher callbacks only hold a `Weak` to this, so the container never keeps
/// an orchestrator alive.
pub(crate) struct WatchContext {
    pub state: Arc<dyn Observable>,
    pub options: CompiledOptions,
    pub external: ExternalFlag,
    destroyed: AtomicBool,
    registry: Mutex<WatcherRegistry>,
    known_keys: Mutex<BTreeSet<FieldKey>>,
    events: mpsc::UnboundedSender<WatchEvent>,
}

impl fmt::Debug for WatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchContext")
            .field("options", &self.options)
            .field("external", &self.external)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl WatchContext {
    pub fn new(
        state: Arc<dyn Observable>,
        options: CompiledOptions,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Self {
        Self {
            state,
            options,
            external: ExternalFlag::new(),
            destroyed: AtomicBool::new(false),
            registry: Mutex::new(WatcherRegistry::new()),
            known_keys: Mutex::new(BTreeSet::new()),
            events,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Queue an event for the engine loop. Returns false once the loop is
    /// gone.
    pub fn send(&self, event: WatchEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn registry(&self) -> MutexGuard<'_, WatcherRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn known_keys(&self) -> MutexGuard<'_, BTreeSet<FieldKey>> {
        self.known_keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_watching(&self, key: &str) -> bool {
        self.registry().is_watching(key)
    }

    /// Register a handle. After destroy the handle is released instead.
    pub fn register(&self, handle: Subscription) {
        let mut registry = self.registry();
        if self.is_destroyed() {
            drop(registry);
            handle.unsubscribe();
            return;
        }
        registry.register(handle);
    }

    pub fn register_field(&self, key: &str, handle: Subscription) -> bool {
        let mut registry = self.registry();
        if self.is_destroyed() {
            drop(registry);
            handle.unsubscribe();
            return false;
        }
        registry.register_field(key, handle)
    }

    /// Run `mutator` with the external-update flag set.
    ///
    /// On success the reset is queued on the engine loop behind every change
    /// the mutator produced. On error (or panic) the flag is reset right away
    /// and the error is handed back unchanged.
    pub fn mark_update_as_external<T, E, F>(&self, mutator: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let scope = ExternalScope::enter(&self.external);
        let result = mutator();

        match &result {
            Ok(_) => {
                let epoch = scope.epoch();
                if self.send(WatchEvent::ExternalScopeEnded { epoch }) {
                    scope.defer();
                } else {
                    scope.reset_now();
                }
            }
            Err(_) => {
                debug!("external mutator failed; resetting flag immediately");
                scope.reset_now();
            }
        }

        result
    }

    /// Tear everything down. Returns false if already destroyed.
    pub fn destroy(&self) -> bool {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.options.diagnostics.emit(DiagnosticEvent::Destroyed);

        // Lets the loop drop its pending debounced call and exit.
        self.send(WatchEvent::Shutdown);

        let handles = self.registry().drain();
        let count = handles.len();
        for handle in handles {
            handle.unsubscribe();
        }

        info!(handles = count, "form watchers destroyed");
        true
    }
}
