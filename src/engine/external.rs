// src/engine/external.rs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::trace;

/// The "an external update is in progress" flag.
///
/// One per orchestrator. Set by [`ExternalScope::enter`], read by the field
/// watchers while the mutation runs.
///
/// Each scope gets an epoch. A deferred reset only clears the flag if no
/// newer scope has been entered since, so the reset queued by an earlier
/// scope cannot clear the flag under a later one that is still pending.
#[derive(Debug, Default)]
pub struct ExternalFlag {
    active: AtomicBool,
    epoch: AtomicU64,
}

impl ExternalFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Set the flag and return the new scope's epoch.
    pub fn set(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.active.store(true, Ordering::SeqCst);
        epoch
    }

    pub fn reset(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Clear the flag if `epoch` is still the latest scope. Returns whether
    /// the flag was cleared.
    pub fn reset_if_current(&self, epoch: u64) -> bool {
        if self.epoch.load(Ordering::SeqCst) == epoch {
            self.reset();
            true
        } else {
            trace!(epoch, "stale external scope reset ignored");
            false
        }
    }
}

/// Guard for one `mark_update_as_external` call.
///
/// If the guard is dropped without [`defer`](Self::defer) or
/// [`reset_now`](Self::reset_now) (the mutator panicked), the flag is reset
/// immediately.
#[derive(Debug)]
pub struct ExternalScope<'a> {
    flag: &'a ExternalFlag,
    epoch: u64,
    armed: bool,
}

impl<'a> ExternalScope<'a> {
    pub fn enter(flag: &'a ExternalFlag) -> Self {
        let epoch = flag.set();
        trace!(epoch, "external scope entered");
        Self {
            flag,
            epoch,
            armed: true,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Leave the flag set; the caller has queued a reset for `epoch`.
    pub fn defer(mut self) {
        self.armed = false;
    }

    pub fn reset_now(mut self) {
        self.armed = false;
        self.flag.reset();
        trace!(epoch = self.epoch, "external scope reset immediately");
    }
}

impl Drop for ExternalScope<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.flag.reset();
        }
    }
}
