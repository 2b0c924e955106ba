//! Structured logging for the CLI
//!
//! All diagnostics go through `tracing` and are written to stderr, so command
//! output on stdout (for example `aemon list --format json`) stays machine
//! readable.
//!
//! ## Environment Variables
//!
//! - `AEMON_LOG` - filter directives (e.g. `debug`, `aemon::loader=trace`)
//! - `AEMON_LOG_FORMAT` - `plain` (default), `pretty` or `json`
//!
//! `--verbose` raises the default level to `debug` and switches the plain
//! format to one that includes timestamps and targets.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Message only, the way a CLI talks to a human
    Plain,
    /// Multi-line human readable output with targets and locations
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Plain,
        }
    }
}

/// Logging configuration resolved from the environment and CLI flags
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level when `AEMON_LOG` is unset
    pub level: Level,
    pub format: LogFormat,
    /// Extra filter directives (comma-separated)
    pub filter: Option<String>,
    /// Include timestamps and targets in plain output
    pub verbose: bool,
}

impl LogConfig {
    /// Read `AEMON_LOG` / `AEMON_LOG_FORMAT`, then apply the `--verbose` flag.
    pub fn from_env(verbose: bool) -> Self {
        Self {
            level: if verbose { Level::DEBUG } else { Level::INFO },
            format: LogFormat::parse(
                &env::var("AEMON_LOG_FORMAT").unwrap_or_else(|_| "plain".to_string()),
            ),
            filter: env::var("AEMON_LOG").ok(),
            verbose,
        }
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter = EnvFilter::new(config.level.as_str());
    // tiny_http logs every accepted connection at debug
    if let Ok(directive) = "tiny_http=warn".parse() {
        env_filter = env_filter.add_directive(directive);
    }
    if let Some(filter) = &config.filter {
        for directive in filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(d) => env_filter = env_filter.add_directive(d),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
            }
        }
    }
    env_filter
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber has already been installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Plain if config.verbose => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Plain => tracing_subscriber::fmt::layer()
            .without_time()
            .with_target(false)
            .with_level(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}
