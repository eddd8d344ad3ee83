// src/config/mod.rs

//! Configuration for the form watchers.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it (`validate.rs`).
//! - Provide the runtime [`WatchOptions`] handed to the orchestrator
//!   (`options.rs`), built from a config file, from raw JSON options, or in
//!   code.

pub mod loader;
pub mod model;
pub mod options;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, RawConfigFile, WatchSection};
pub use options::{WatchOptions, DEFAULT_DEBOUNCE_DELAY};
pub use validate::validate_excluded_keys;
