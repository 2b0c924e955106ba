//! # aemon
//!
//! **aemon** turns a web application's [OpenAPI](https://spec.openapis.org/oas/v3.1.0) schema into
//! versioned, browsable documentation. Each `aemon generate` run snapshots the schema as a new
//! immutable version directory, renders a Swagger UI viewer for it, and refreshes an index page
//! listing every version.
//!
//! ## Architecture
//!
//! - **[`config`]** - Settings with defaults, loaded from YAML, JSON, TOML or `setup.cfg`
//! - **[`loader`]** - Resolves a module reference and attribute name to an application document
//! - **[`schema`]** - Extracts the document to persist and counts routes
//! - **[`versions`]** - Discovers version directories and picks the next target
//! - **[`writer`]** - Writes and reads `api_config.yaml`, `api_config.json` and `metadata.json`
//! - **[`validator`]** - Structural checks on schemas and version directories
//! - **[`html`]** - Askama-rendered index and viewer pages plus bundled assets
//! - **[`server`]** - Blocking static file server for the docs directory
//! - **[`cli`]** - The `aemon` command line
//! - **[`logging`]** - `tracing-subscriber` setup
//!
//! ### Generate Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant User
//!     participant CLI as cli
//!     participant Loader as loader::load_app
//!     participant Schema as schema::extract_schema
//!     participant Validator as validator
//!     participant Versions as versions::prepare_version
//!     participant Writer as writer::write_artifacts
//!     participant Html as html
//!
//!     User->>CLI: aemon generate -m openapi.yaml
//!     CLI->>Loader: load_app(module, "app")
//!     Loader-->>CLI: LoadedApp
//!     CLI->>Schema: extract_schema(&app, &settings)
//!     CLI->>Validator: validate_document(&spec)
//!     CLI->>Versions: prepare_version(&settings, None, force)
//!     Versions-->>CLI: ("v3", docs/api/v3)
//!     CLI->>Writer: write_artifacts(dir, &spec, &record)
//!     CLI->>Html: render_version_page + render_index
//! ```
//!
//! ## Output Layout
//!
//! ```text
//! docs/
//! ├── index.html
//! ├── assets/
//! └── api/
//!     ├── v1/
//!     │   ├── api_config.yaml
//!     │   ├── api_config.json
//!     │   ├── metadata.json
//!     │   └── index.html
//!     └── v2/
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use aemon::{config::Settings, html, loader, schema, validator};
//!
//! # fn main() -> aemon::Result<()> {
//! let settings = Settings::load(None)?;
//! let app = loader::load_app("openapi.yaml", "app")?;
//! let spec = schema::extract_schema(&app, &settings);
//! for finding in validator::validate_document(&spec) {
//!     println!("{finding}");
//! }
//! html::render_all(&settings)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod html;
pub mod loader;
pub mod logging;
pub mod schema;
pub mod server;
pub mod validator;
pub mod versions;
pub mod writer;

pub use error::{AemonError, LoadError, Result};
