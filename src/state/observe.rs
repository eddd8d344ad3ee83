// src/state/observe.rs

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::types::FieldKey;

/// Callback for a single field: `(new, old)`.
///
/// `new` is `None` when the key has been removed; `old` is `None` on an
/// immediate firing or when the key did not exist before.
pub type FieldCallback = Arc<dyn Fn(Option<&Value>, Option<&Value>) + Send + Sync>;

/// Callback for the key set: `(new_keys, old_keys)`.
pub type KeysCallback = Arc<dyn Fn(&BTreeSet<FieldKey>, Option<&BTreeSet<FieldKey>>) + Send + Sync>;

/// Options accepted by [`Observable::observe_field`] / [`Observable::observe_keys`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    /// Call back once right away with the current value and no old value.
    pub immediate: bool,
    /// Only call back when the value changed structurally. When false, every
    /// write to the field is reported.
    pub deep: bool,
}

impl ObserveOptions {
    pub fn deep() -> Self {
        Self {
            immediate: false,
            deep: true,
        }
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}

/// Change-notification capability over a key-indexed container.
///
/// Callbacks are invoked synchronously on the thread performing the mutation,
/// after the container's own locks have been released, so a callback may
/// read the container or install further observations.
pub trait Observable: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<Value>;

    fn keys(&self) -> BTreeSet<FieldKey>;

    fn observe_field(
        &self,
        key: &str,
        options: ObserveOptions,
        on_change: FieldCallback,
    ) -> Subscription;

    fn observe_keys(&self, options: ObserveOptions, on_change: KeysCallback) -> Subscription;
}

/// Handle for one active observation.
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`]) stops
/// further notifications.
pub struct Subscription {
    label: String,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    pub fn new(label: impl Into<String>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label: label.into(),
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle that observes nothing.
    pub fn noop(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            cancel: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cancel_runs_once_on_unsubscribe() {
        let hits = Arc::new(AtomicUsize::new(0));
        let sub = Subscription::new("field:name", {
            let hits = Arc::clone(&hits);
            move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert!(sub.is_active());
        sub.unsubscribe();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_a_subscription_cancels_it() {
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let _sub = Subscription::new("keys", {
                let hits = Arc::clone(&hits);
                move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn noop_is_inactive() {
        let sub = Subscription::noop("field:email");
        assert!(!sub.is_active());
        assert_eq!(sub.label(), "field:email");
    }
}
