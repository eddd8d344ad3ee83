// src/watch/mod.rs

//! Change watching and filtering.
//!
//! This module is responsible for:
//! - Per-field watchers ([`FieldWatcher`]) that turn container writes into
//!   change events for the engine.
//! - Discovering keys added at runtime ([`KeySetWatcher`]).
//! - Deciding the origin of a change ([`OriginClassifier`]).
//! - Excluding keys from observation ([`KeyFilter`]).
//! - The single-slot trailing [`Debouncer`].
//! - Tracking every active observation for teardown ([`WatcherRegistry`]).
//!
//! It does **not** own the event loop or the consumer; that is `engine`.

pub mod debounce;
pub mod exclude;
pub mod field;
pub mod keys;
pub mod origin;
pub mod registry;

pub use debounce::{sleep_until_deadline, Debouncer};
pub use exclude::KeyFilter;
pub use field::{evaluate_change, ChangeOutcome, FieldWatcher};
pub use keys::{added_keys, KeySetWatcher};
pub use origin::{ClassifyFn, OriginClassifier};
pub use registry::WatcherRegistry;
