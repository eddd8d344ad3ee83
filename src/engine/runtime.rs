// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::diagnostics::DiagnosticEvent;
use crate::engine::context::WatchContext;
use crate::engine::core::WatchCore;
use crate::engine::{CoreCommand, WatchEvent};
use crate::errors::Result;
use crate::types::FieldUpdate;
use crate::watch::debounce::sleep_until_deadline;

/// Consumer of debounced updates.
///
/// Errors are logged and otherwise ignored: one failing update does not stop
/// later ones from being delivered.
pub trait UpdateHandler: Send + 'static {
    fn on_update(&mut self, update: FieldUpdate) -> anyhow::Result<()>;
}

impl<F> UpdateHandler for F
where
    F: FnMut(FieldUpdate) -> anyhow::Result<()> + Send + 'static,
{
    fn on_update(&mut self, update: FieldUpdate) -> anyhow::Result<()> {
        self(update)
    }
}

/// Drives the core in response to `WatchEvent`s and the debounce timer, and
/// delivers due updates to the `UpdateHandler`.
///
/// All watcher work for one orchestrator is serialized on this one task.
pub(crate) struct Runtime {
    core: WatchCore,
    ctx: Arc<WatchContext>,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    handler: Box<dyn UpdateHandler>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: WatchCore,
        ctx: Arc<WatchContext>,
        event_rx: mpsc::UnboundedReceiver<WatchEvent>,
        handler: Box<dyn UpdateHandler>,
    ) -> Self {
        Self {
            core,
            ctx,
            event_rx,
            handler,
        }
    }

    /// Main event loop.
    ///
    /// - Consumes `WatchEvent`s in FIFO order and feeds them to the core.
    /// - Sleeps until the debounce deadline and delivers the due update.
    /// - Exits on shutdown or once the orchestrator is destroyed.
    pub async fn run(mut self) -> Result<()> {
        debug!("form watcher runtime started");

        loop {
            let deadline = self.core.next_deadline();

            tokio::select! {
                biased;

                maybe_event = self.event_rx.recv() => {
                    let Some(event) = maybe_event else {
                        debug!("watch event channel closed; exiting");
                        break;
                    };
                    if !self.handle_event(event) {
                        break;
                    }
                }

                _ = sleep_until_deadline(deadline) => {
                    if let Some(update) = self.core.take_due(Instant::now()) {
                        self.deliver(update);
                    }
                }
            }
        }

        if let Some(dropped) = self.core.cancel_pending() {
            debug!(key = %dropped.key, "dropping pending update on exit");
        }
        info!("form watcher runtime exiting");
        Ok(())
    }

    /// Returns false when the loop should stop.
    fn handle_event(&mut self, event: WatchEvent) -> bool {
        if self.ctx.is_destroyed() {
            return false;
        }

        let step = self.core.step(event, &self.ctx.external, Instant::now());
        for command in step.commands {
            self.execute_command(command);
        }
        step.keep_running
    }

    fn execute_command(&self, command: CoreCommand) {
        match command {
            CoreCommand::Emit(event) => self.ctx.options.diagnostics.emit(event),
        }
    }

    /// Hand a due update to the consumer, unless a destroy got there first.
    fn deliver(&mut self, update: FieldUpdate) {
        if self.ctx.is_destroyed() {
            debug!(key = %update.key, "destroyed before delivery; dropping update");
            return;
        }

        let diagnostics = &self.ctx.options.diagnostics;
        if diagnostics.is_enabled() {
            diagnostics.emit(DiagnosticEvent::DebouncedUpdate {
                key: update.key.clone(),
                value: update.value.clone(),
                origin: update.origin,
            });
        }

        let key = update.key.clone();
        if let Err(err) = self.handler.on_update(update) {
            warn!(%key, error = %err, "update handler failed");
        }
    }
}
