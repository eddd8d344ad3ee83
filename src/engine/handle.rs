// src/engine/handle.rs

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::sync::{Arc, Weak};

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::WatchOptions;
use crate::engine::context::WatchContext;
use crate::engine::core::WatchCore;
use crate::engine::runtime::{Runtime, UpdateHandler};
use crate::engine::WatchEvent;
use crate::errors::{Result, WatchError};
use crate::state::Observable;
use crate::types::FieldKey;
use crate::watch::keys::KeySetWatcher;

/// A running set of form watchers over one container.
///
/// Created with [`FormWatchers::spawn`], [`create_form_watchers`] or
/// [`FormWatchers::builder`]. Must be created inside a Tokio runtime: the
/// event loop that classifies, debounces and delivers updates is spawned on
/// it.
///
/// Dropping the handle destroys the watchers.
pub struct FormWatchers {
    ctx: Arc<WatchContext>,
    task: Option<JoinHandle<Result<()>>>,
}

impl fmt::Debug for FormWatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormWatchers")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

/// Cheap, cloneable control handle for a [`FormWatchers`].
///
/// Does not keep the watchers alive. Useful inside the update handler, e.g.
/// to call [`destroy`](Self::destroy) from a callback.
#[derive(Clone)]
pub struct WatchController {
    ctx: Weak<WatchContext>,
}

impl fmt::Debug for WatchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchController")
            .field("alive", &(self.ctx.strong_count() > 0))
            .finish()
    }
}

/// Shorthand for [`FormWatchers::spawn`].
pub fn create_form_watchers(
    state: impl Observable,
    handler: impl UpdateHandler,
    options: WatchOptions,
) -> Result<FormWatchers> {
    FormWatchers::spawn(state, handler, options)
}

impl FormWatchers {
    /// Start watching `state`, forwarding debounced updates to `handler`.
    ///
    /// Options are validated before anything is observed; on error nothing
    /// has been installed.
    pub fn spawn(
        state: impl Observable,
        handler: impl UpdateHandler,
        options: WatchOptions,
    ) -> Result<Self> {
        Self::spawn_inner(Arc::new(state), Box::new(handler), options)
    }

    pub fn builder() -> FormWatchersBuilder {
        FormWatchersBuilder::default()
    }

    fn spawn_inner(
        state: Arc<dyn Observable>,
        handler: Box<dyn UpdateHandler>,
        options: WatchOptions,
    ) -> Result<Self> {
        let compiled = options.compile()?;
        let rt = tokio::runtime::Handle::try_current().map_err(|e| {
            WatchError::Other(anyhow!("form watchers need a Tokio runtime: {e}"))
        })?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<WatchEvent>();
        let core = WatchCore::new(
            compiled.classifier.clone(),
            compiled.skip_external_updates,
            compiled.debounce_delay,
        );
        let ctx = Arc::new(WatchContext::new(state, compiled, event_tx));

        KeySetWatcher::attach(&ctx);

        let runtime = Runtime::new(core, Arc::clone(&ctx), event_rx, handler);
        let task = rt.spawn(runtime.run());

        info!(
            watched = ctx.registry().watched_keys().len(),
            delay_ms = ctx.options.debounce_delay.as_millis() as u64,
            "form watchers started"
        );

        Ok(Self {
            ctx,
            task: Some(task),
        })
    }

    /// Run `mutator` with changes marked as external.
    ///
    /// Every change the mutator makes to the container is classified
    /// `External` (and dropped if `skip_external_updates` is set). The flag
    /// stays set until the engine has processed those changes.
    ///
    /// If the mutator returns an error (or panics) the flag is cleared
    /// immediately and the error is returned as-is.
    pub fn mark_update_as_external<T, E, F>(&self, mutator: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        self.ctx.mark_update_as_external(mutator)
    }

    /// Infallible variant of [`mark_update_as_external`](Self::mark_update_as_external).
    pub fn with_external<T>(&self, mutator: impl FnOnce() -> T) -> T {
        match self
            .ctx
            .mark_update_as_external(|| Ok::<T, Infallible>(mutator()))
        {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Stop all watching. Pending debounced updates are never delivered.
    /// Calling this more than once is a no-op.
    pub fn destroy(&self) {
        if !self.ctx.destroy() {
            debug!("destroy called on already destroyed watchers");
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.ctx.is_destroyed()
    }

    pub fn controller(&self) -> WatchController {
        WatchController {
            ctx: Arc::downgrade(&self.ctx),
        }
    }

    /// Keys that currently have a field watcher.
    pub fn watched_keys(&self) -> BTreeSet<FieldKey> {
        self.ctx.registry().watched_keys().clone()
    }

    /// Number of active observations (field watchers plus the key-set watcher).
    pub fn active_watchers(&self) -> usize {
        self.ctx.registry().len()
    }

    /// Destroy and wait for the engine loop to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        self.destroy();
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| WatchError::Other(anyhow!("form watcher runtime failed: {e}")))?,
            None => Ok(()),
        }
    }
}

impl Drop for FormWatchers {
    fn drop(&mut self) {
        self.ctx.destroy();
    }
}

impl WatchController {
    /// See [`FormWatchers::mark_update_as_external`]. Once the watchers are
    /// gone the mutator still runs, just without any flag.
    pub fn mark_update_as_external<T, E, F>(&self, mutator: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        match self.ctx.upgrade() {
            Some(ctx) => ctx.mark_update_as_external(mutator),
            None => mutator(),
        }
    }

    pub fn destroy(&self) {
        if let Some(ctx) = self.ctx.upgrade() {
            ctx.destroy();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.ctx.upgrade().is_none_or(|ctx| ctx.is_destroyed())
    }
}

/// Step-by-step construction with explicit validation of missing inputs.
#[derive(Default)]
pub struct FormWatchersBuilder {
    state: Option<Arc<dyn Observable>>,
    handler: Option<Box<dyn UpdateHandler>>,
    options: WatchOptions,
}

impl fmt::Debug for FormWatchersBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormWatchersBuilder")
            .field("state", &self.state.is_some())
            .field("handler", &self.handler.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl FormWatchersBuilder {
    pub fn state(mut self, state: impl Observable) -> Self {
        self.state = Some(Arc::new(state));
        self
    }

    pub fn handler(mut self, handler: impl UpdateHandler) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn options(mut self, options: WatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<FormWatchers> {
        let state = self
            .state
            .ok_or_else(|| WatchError::InvalidInput("container is required".to_string()))?;
        let handler = self
            .handler
            .ok_or_else(|| WatchError::InvalidInput("update handler is required".to_string()))?;
        FormWatchers::spawn_inner(state, handler, self.options)
    }
}
