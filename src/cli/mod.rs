//! # CLI Module
//!
//! Command-line interface of the `aemon` binary.
//!
//! ## Commands
//!
//! | Command       | Effect                                                     |
//! |---------------|------------------------------------------------------------|
//! | `init`        | write `aemon.yaml` (or `aemon.json`) with default settings |
//! | `generate`    | snapshot an application's schema as a new version          |
//! | `render-html` | re-render the index and every version page                 |
//! | `validate`    | check one or all versions, `--strict` fails on warnings    |
//! | `list`        | print versions as a table, JSON or YAML                    |
//! | `serve`       | serve the docs directory over HTTP                         |
//!
//! ## Examples
//!
//! ```bash
//! # Schema file holding the application (or a namespace of applications)
//! aemon generate --module openapi.yaml
//!
//! # Exporter command: stdout is the module document, AEMON_APP names the attribute
//! aemon generate -m "cargo run -q --bin export-openapi" --app admin
//!
//! # Overwrite a fixed version, then check everything strictly
//! aemon generate -m openapi.yaml --version v2 --force
//! aemon validate --strict
//!
//! aemon list --format json --detailed
//! aemon serve --port 9000 --open
//! ```
//!
//! Every command exits `0` on success and `1` on failure; errors are logged
//! to stderr so `list` output on stdout stays machine-readable.

mod commands;


pub use commands::{
    handle_generate, handle_init, handle_render_html, handle_validate, render_list, run, run_cli,
    Cli, Commands, GenerateRequest, InitFormat, ListFormat,
};
#[cfg(test)]
pub(crate) use commands::usage_status;
