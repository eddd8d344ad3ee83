// src/engine/mod.rs

//! Orchestration engine for the form watchers.
//!
//! This module ties together:
//! - the shared context (configuration, external-update flag, watcher
//!   registry, destroyed flag)
//! - the event loop that reacts to:
//!   - field changes reported by the watchers
//!   - deferred resets of the external-update flag
//!   - the debounce timer
//!   - shutdown
//! - the public [`FormWatchers`] handle.
//!
//! The pure state machine lives in [`core`]; the async shell that owns the
//! consumer and the timer is implemented in [`runtime`].

use serde_json::Value;

use crate::types::FieldKey;

/// Events flowing into the engine loop from watchers and the handle.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A watched field changed to a structurally different value.
    ///
    /// `old` is `None` for an attach-time firing or a re-added key.
    /// `external` is the external-update flag as it was during the write.
    FieldChanged {
        key: FieldKey,
        new: Value,
        old: Option<Value>,
        external: bool,
    },
    /// A `mark_update_as_external` mutator returned successfully; clear the
    /// flag if this is still the latest scope.
    ExternalScopeEnded { epoch: u64 },
    /// `destroy()` was called.
    Shutdown,
}

pub(crate) mod context;
pub mod core;
pub mod event_handlers;
pub mod external;
pub mod handle;
pub mod runtime;

pub use core::WatchCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use external::{ExternalFlag, ExternalScope};
pub use handle::{create_form_watchers, FormWatchers, FormWatchersBuilder, WatchController};
pub use runtime::UpdateHandler;
