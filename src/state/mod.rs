// src/state/mod.rs

//! The observed key/value container.
//!
//! This module provides:
//! - [`Observable`]: the change-notification capability the watchers are
//!   built on ("observe a field or the key set, call me back with new and old").
//! - [`FormState`]: the in-memory container implementing it.
//! - [`Subscription`]: a handle for one active observation.
//!
//! It knows nothing about origins, debouncing or exclusion; that lives in
//! `watch` and `engine`.

pub mod observe;
pub mod store;

pub use observe::{FieldCallback, KeysCallback, ObserveOptions, Observable, Subscription};
pub use store::FormState;
