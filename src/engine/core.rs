// src/engine/core.rs

//! Pure core state machine.
//!
//! The core consumes [`WatchEvent`]s and produces:
//! - an updated debounce slot
//! - a list of commands (diagnostics) for the IO shell
//!
//! The async shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from the channel
//! - sleeping until the debounce deadline
//! - calling the consumer
//!
//! Time is passed in explicitly, so the core is unit tested without a
//! running timer.

use std::time::Duration;

use tokio::time::Instant;

use crate::engine::event_handlers::{
    handle_field_change, handle_scope_ended, handle_shutdown, CoreStep,
};
use crate::engine::external::ExternalFlag;
use crate::engine::WatchEvent;
use crate::types::FieldUpdate;
use crate::watch::debounce::Debouncer;
use crate::watch::origin::OriginClassifier;

/// Pure core state.
///
/// This owns:
/// - the origin classifier
/// - the skip-external switch
/// - the single shared debounce slot
///
/// It has **no** channels and does not call the consumer.
#[derive(Debug)]
pub struct WatchCore {
    classifier: OriginClassifier,
    skip_external_updates: bool,
    debouncer: Debouncer<FieldUpdate>,
}

impl WatchCore {
    pub fn new(
        classifier: OriginClassifier,
        skip_external_updates: bool,
        debounce_delay: Duration,
    ) -> Self {
        Self {
            classifier,
            skip_external_updates,
            debouncer: Debouncer::new(debounce_delay),
        }
    }

    /// Handle a single event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: WatchEvent, external: &ExternalFlag, now: Instant) -> CoreStep {
        match event {
            WatchEvent::FieldChanged {
                key,
                new,
                old,
                external: flag_at_write,
            } => handle_field_change(
                &self.classifier,
                self.skip_external_updates,
                &mut self.debouncer,
                flag_at_write,
                key,
                new,
                old,
                now,
            ),
            WatchEvent::ExternalScopeEnded { epoch } => handle_scope_ended(external, epoch),
            WatchEvent::Shutdown => handle_shutdown(&mut self.debouncer),
        }
    }

    /// When the pending update becomes due, if there is one.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Take the pending update if it is due.
    pub fn take_due(&mut self, now: Instant) -> Option<FieldUpdate> {
        self.debouncer.take_due(now)
    }

    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    pub fn cancel_pending(&mut self) -> Option<FieldUpdate> {
        self.debouncer.cancel()
    }
}
