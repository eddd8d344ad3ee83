// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `formwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "formwatch",
    version,
    about = "Replay a mutation script against a watched form and print the debounced updates.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `formwatch.toml` in the current working directory is used
    /// when it exists; otherwise built-in defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// JSON-lines mutation script. Use `-` to read from stdin.
    #[arg(long, value_name = "PATH")]
    pub script: Option<String>,

    /// Initial form contents as a JSON object, e.g. `{"name": ""}`.
    #[arg(long, value_name = "JSON")]
    pub initial: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FORMWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print the effective options and exit.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_replay_arguments() {
        let args = CliArgs::try_parse_from([
            "formwatch",
            "--script",
            "-",
            "--initial",
            r#"{"name":""}"#,
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.script.as_deref(), Some("-"));
        assert_eq!(args.initial.as_deref(), Some(r#"{"name":""}"#));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.config.is_none());
        assert!(!args.dry_run);
    }
}
