// src/lib.rs

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod replay;
pub mod state;
pub mod types;
pub mod watch;

pub use config::WatchOptions;
pub use diagnostics::{DiagnosticEvent, DiagnosticSink, SkipReason};
pub use engine::{
    create_form_watchers, FormWatchers, FormWatchersBuilder, UpdateHandler, WatchController,
};
pub use errors::WatchError;
pub use state::{FormState, Observable, ObserveOptions, Subscription};
pub use types::{FieldKey, FieldUpdate, Origin};

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, ConfigFile};

/// Extra time after the script ends before shutting down, so the last
/// debounced update is delivered.
const SETTLE_MARGIN: Duration = Duration::from_millis(50);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the initial form state
/// - the form watchers, printing every forwarded update as a JSON line
/// - script replay
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let source = args
        .script
        .as_deref()
        .ok_or_else(|| anyhow!("--script is required unless --dry-run is given"))?;
    let steps = replay::parse_script(&replay::read_script(source)?)?;

    let initial = match args.initial.as_deref() {
        Some(json) => serde_json::from_str::<Value>(json)?,
        None => Value::Object(Default::default()),
    };
    let state = FormState::from_value(initial)?;

    let options = WatchOptions::from_config(&cfg);
    let delay = options.debounce_delay;

    let print_update = |update: FieldUpdate| -> Result<()> {
        println!("{}", serde_json::to_string(&update)?);
        Ok(())
    };
    let watchers = FormWatchers::spawn(state.clone(), print_update, options)?;
    info!(steps = steps.len(), "replaying script");

    let replay_and_settle = async {
        replay::apply(&steps, &state, &watchers).await;
        tokio::time::sleep(delay + SETTLE_MARGIN).await;
    };

    tokio::select! {
        _ = replay_and_settle => debug!("script finished"),
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => info!("interrupted; shutting down"),
            Err(e) => warn!(error = %e, "failed to listen for Ctrl+C"),
        },
    }

    watchers.shutdown().await?;
    Ok(())
}

/// Explicit path must exist; the default path is optional.
fn load_config(path: Option<&str>) -> Result<ConfigFile> {
    match path {
        Some(path) => Ok(load_and_validate(path)?),
        None => {
            let path = default_config_path();
            if path.exists() {
                Ok(load_and_validate(&path)?)
            } else {
                debug!(path = %path.display(), "no config file; using defaults");
                Ok(ConfigFile::default())
            }
        }
    }
}

fn print_dry_run(cfg: &ConfigFile) {
    let watch = cfg.watch();
    println!("formwatch dry-run");
    println!("  watch.debounce_ms = {}", watch.debounce_ms);
    println!("  watch.fire_on_attach = {}", watch.fire_on_attach);
    println!(
        "  watch.skip_external_updates = {}",
        watch.skip_external_updates
    );
    println!("  watch.diagnostics = {}", watch.diagnostics);
    if !watch.excluded_keys.is_empty() {
        println!("  watch.excluded_keys = {:?}", watch.excluded_keys);
    }
    if !watch.exclude_patterns.is_empty() {
        println!("  watch.exclude_patterns = {:?}", watch.exclude_patterns);
    }

    debug!("dry-run complete (nothing watched)");
}
