// src/state/store.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use serde_json::{Map, Value};
use tracing::trace;

use crate::errors::{Result, WatchError};
use crate::state::observe::{FieldCallback, KeysCallback, ObserveOptions, Observable, Subscription};
use crate::types::FieldKey;

/// In-memory key/value container with change notification.
///
/// Cloning a `FormState` clones the handle, not the data: every clone sees
/// and mutates the same map.
#[derive(Clone, Default)]
pub struct FormState {
    inner: Arc<StateInner>,
}

#[derive(Default)]
struct StateInner {
    values: RwLock<BTreeMap<FieldKey, Value>>,
    observers: Mutex<ObserverTable>,
}

#[derive(Default)]
struct ObserverTable {
    next_id: u64,
    fields: BTreeMap<u64, FieldObserver>,
    keys: BTreeMap<u64, KeysObserver>,
}

struct FieldObserver {
    key: FieldKey,
    deep: bool,
    callback: FieldCallback,
}

struct KeysObserver {
    callback: KeysCallback,
}

/// What a single mutation has to report once the locks are released.
struct Notification {
    key: FieldKey,
    old: Option<Value>,
    new: Option<Value>,
    /// `(old_keys, new_keys)` when the key set changed.
    key_set: Option<(BTreeSet<FieldKey>, BTreeSet<FieldKey>)>,
}

impl fmt::Debug for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormState")
            .field("values", &*self.read_values())
            .finish_non_exhaustive()
    }
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a container from a JSON value.
    ///
    /// Only objects are accepted; anything else (including `null`) is an
    /// [`WatchError::InvalidInput`].
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::from_map(map.into_iter().collect())),
            Value::Null => Err(WatchError::InvalidInput(
                "container must be a non-null object".to_string(),
            )),
            other => Err(WatchError::InvalidInput(format!(
                "container must be an object (got {})",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_map(values: BTreeMap<FieldKey, Value>) -> Self {
        Self {
            inner: Arc::new(StateInner {
                values: RwLock::new(values),
                observers: Mutex::new(ObserverTable::default()),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.read_values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_values().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.read_values().contains_key(key)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.read_values()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    /// Write `value` under `key`, returning the previous value.
    pub fn set(&self, key: impl Into<FieldKey>, value: Value) -> Option<Value> {
        let key = key.into();
        let notification = {
            let mut values = self.write_values();
            let keys_before: Option<BTreeSet<FieldKey>> =
                (!values.contains_key(&key)).then(|| values.keys().cloned().collect());
            let old = values.insert(key.clone(), value.clone());
            let key_set = keys_before.map(|before| (before, values.keys().cloned().collect()));
            Notification {
                key,
                old,
                new: Some(value),
                key_set,
            }
        };
        let old = notification.old.clone();
        self.dispatch(notification);
        old
    }

    /// Mutate a value in place (e.g. a nested object), creating it as
    /// `Value::Null` first if the key is missing.
    pub fn update<F>(&self, key: impl Into<FieldKey>, f: F)
    where
        F: FnOnce(&mut Value),
    {
        let key = key.into();
        let notification = {
            let mut values = self.write_values();
            let keys_before: Option<BTreeSet<FieldKey>> =
                (!values.contains_key(&key)).then(|| values.keys().cloned().collect());
            let slot = values.entry(key.clone()).or_insert(Value::Null);
            let old = keys_before.is_none().then(|| slot.clone());
            f(slot);
            let new = slot.clone();
            let key_set = keys_before.map(|before| (before, values.keys().cloned().collect()));
            Notification {
                key,
                old,
                new: Some(new),
                key_set,
            }
        };
        self.dispatch(notification);
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let notification = {
            let mut values = self.write_values();
            if !values.contains_key(key) {
                return None;
            }
            let before: BTreeSet<FieldKey> = values.keys().cloned().collect();
            let old = values.remove(key);
            let after = values.keys().cloned().collect();
            Notification {
                key: key.to_string(),
                old,
                new: None,
                key_set: Some((before, after)),
            }
        };
        let old = notification.old.clone();
        self.dispatch(notification);
        old
    }

    fn read_values(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<FieldKey, Value>> {
        self.inner.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_values(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<FieldKey, Value>> {
        self.inner.values.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> std::sync::MutexGuard<'_, ObserverTable> {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Invoke observers for one mutation. Key-set observers run first so a
    /// newly discovered key can get its field observer before anything else
    /// happens to it.
    fn dispatch(&self, n: Notification) {
        let (key_callbacks, field_callbacks) = {
            let table = self.observers();
            let keys: Vec<KeysCallback> = if n.key_set.is_some() {
                table.keys.values().map(|o| Arc::clone(&o.callback)).collect()
            } else {
                Vec::new()
            };
            let changed = n.old != n.new;
            let fields: Vec<FieldCallback> = table
                .fields
                .values()
                .filter(|o| o.key == n.key && (changed || !o.deep))
                .map(|o| Arc::clone(&o.callback))
                .collect();
            (keys, fields)
        };

        if let Some((before, after)) = &n.key_set {
            trace!(key = %n.key, before = before.len(), after = after.len(), "key set changed");
            for cb in &key_callbacks {
                cb(after, Some(before));
            }
        }

        for cb in &field_callbacks {
            cb(n.new.as_ref(), n.old.as_ref());
        }
    }

    fn unsubscribe_field(inner: &Weak<StateInner>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            let mut table = inner.observers.lock().unwrap_or_else(PoisonError::into_inner);
            table.fields.remove(&id);
        }
    }

    fn unsubscribe_keys(inner: &Weak<StateInner>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            let mut table = inner.observers.lock().unwrap_or_else(PoisonError::into_inner);
            table.keys.remove(&id);
        }
    }

    /// Number of installed observers, `(field, key_set)`.
    pub fn observer_count(&self) -> (usize, usize) {
        let table = self.observers();
        (table.fields.len(), table.keys.len())
    }
}

impl Observable for FormState {
    fn get(&self, key: &str) -> Option<Value> {
        self.read_values().get(key).cloned()
    }

    fn keys(&self) -> BTreeSet<FieldKey> {
        self.read_values().keys().cloned().collect()
    }

    fn observe_field(
        &self,
        key: &str,
        options: ObserveOptions,
        on_change: FieldCallback,
    ) -> Subscription {
        let id = {
            let mut table = self.observers();
            let id = table.next_id;
            table.next_id += 1;
            table.fields.insert(
                id,
                FieldObserver {
                    key: key.to_string(),
                    deep: options.deep,
                    callback: Arc::clone(&on_change),
                },
            );
            id
        };

        if options.immediate {
            let current = self.get(key);
            on_change(current.as_ref(), None);
        }

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(format!("field:{key}"), move || {
            FormState::unsubscribe_field(&weak, id)
        })
    }

    fn observe_keys(&self, options: ObserveOptions, on_change: KeysCallback) -> Subscription {
        let id = {
            let mut table = self.observers();
            let id = table.next_id;
            table.next_id += 1;
            table.keys.insert(
                id,
                KeysObserver {
                    callback: Arc::clone(&on_change),
                },
            );
            id
        };

        if options.immediate {
            let current = self.keys();
            on_change(&current, None);
        }

        let weak = Arc::downgrade(&self.inner);
        Subscription::new("keys", move || FormState::unsubscribe_keys(&weak, id))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
