//! # HTML Renderer
//!
//! Renders the static documentation site:
//!
//! ```text
//! docs/
//! ├── index.html          # version table (IndexTemplate)
//! ├── assets/             # aemon.css, aemon.js, viewer.css
//! └── api/
//!     └── v1/index.html   # Swagger UI viewer (VersionTemplate)
//! ```
//!
//! Pages are askama templates compiled into the binary. Assets are embedded
//! and written to disk only when missing, so hand-edited copies survive.

use crate::config::{default_swagger_ui_config, Settings};
use crate::error::{AemonError, IoContext, Result};
use crate::versions::existing_versions;
use crate::writer::{read_record, VERSION_PAGE};
use askama::Template;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the index page written to the docs directory.
pub const INDEX_PAGE: &str = "index.html";

/// Directory, relative to the docs directory, holding the shared assets.
pub const ASSETS_DIR: &str = "assets";

const ASSETS: [(&str, &str); 3] = [
    ("aemon.css", include_str!("../assets/aemon.css")),
    ("aemon.js", include_str!("../assets/aemon.js")),
    ("viewer.css", include_str!("../assets/viewer.css")),
];

/// One row of the version table.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub version: String,
    /// Raw timestamp, exposed to the page script as `data-date`
    pub generated_at: String,
    /// Human readable timestamp
    pub date: String,
    /// Route count, or `?` when unknown
    pub routes: String,
}

/// Template data for the docs index page.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub description: String,
    /// Output directory relative to the docs directory (e.g. `api`)
    pub api_dir: String,
    /// Newest version first
    pub rows: Vec<IndexRow>,
}

/// Template data for a version's viewer page.
#[derive(Template)]
#[template(path = "version.html")]
pub struct VersionTemplate {
    pub title: String,
    pub version: String,
    pub cdn: String,
    /// Relative link from the version directory to the shared assets
    pub assets: String,
    /// Relative link from the version directory to the docs index
    pub index_href: String,
    /// Viewer options as a JSON object literal, safe to embed in `<script>`
    pub ui_config: String,
}

/// Write the embedded assets into `<docs_dir>/assets`, leaving existing
/// files untouched.
pub fn ensure_assets(docs_dir: &Path) -> Result<()> {
    let assets_dir = docs_dir.join(ASSETS_DIR);
    fs::create_dir_all(&assets_dir).at(&assets_dir)?;
    for (name, content) in ASSETS {
        let path = assets_dir.join(name);
        if path.exists() {
            continue;
        }
        fs::write(&path, content).at(&path)?;
        debug!(path = %path.display(), "wrote asset");
    }
    Ok(())
}

/// Viewer options: built-in defaults, then the configured
/// `swagger_ui_config` on top.
#[must_use]
pub fn ui_config(settings: &Settings) -> Map<String, Value> {
    let mut config = default_swagger_ui_config();
    config.insert("tryItOutEnabled".into(), Value::Bool(true));
    config.insert("requestSnippetsEnabled".into(), Value::Bool(true));
    config.insert(
        "supportedSubmitMethods".into(),
        Value::Array(
            ["get", "post", "put", "delete", "patch", "head", "options"]
                .into_iter()
                .map(|m| Value::String(m.into()))
                .collect(),
        ),
    );
    if !settings.include_schemas {
        config.insert("defaultModelsExpandDepth".into(), Value::from(-1));
    }
    for (key, value) in &settings.swagger_ui_config {
        config.insert(key.clone(), value.clone());
    }
    config
}

/// Serialize for inline `<script>` use: `</` would close the element.
fn script_json(value: &Map<String, Value>) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn render_failed(what: &str, e: askama::Error) -> AemonError {
    AemonError::generation(format!("Failed to render {what}: {e}"))
}

/// `../` repeated once per component of `path`.
fn up_levels(path: &Path) -> String {
    path.components()
        .filter(|c| matches!(c, std::path::Component::Normal(_)))
        .map(|_| "../")
        .collect()
}

/// Output directory as seen from the docs directory.
fn api_dir(settings: &Settings) -> PathBuf {
    let docs_dir = settings.docs_dir();
    settings
        .output_dir
        .strip_prefix(&docs_dir)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| {
            settings
                .output_dir
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default()
        })
}

fn url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Render `<version_dir>/index.html`.
pub fn render_version_page(
    version_dir: &Path,
    version: &str,
    settings: &Settings,
) -> Result<PathBuf> {
    // version_dir sits at <docs>/<api_dir>/<version>
    let back = format!("{}../", up_levels(&api_dir(settings)));
    let page = VersionTemplate {
        title: settings.title.clone(),
        version: version.to_string(),
        cdn: settings.swagger_ui_cdn.trim_end_matches('/').to_string(),
        assets: format!("{back}{ASSETS_DIR}"),
        index_href: format!("{back}{INDEX_PAGE}"),
        ui_config: script_json(&ui_config(settings))?,
    };
    let rendered = page
        .render()
        .map_err(|e| render_failed("version page", e))?;

    fs::create_dir_all(version_dir).at(version_dir)?;
    let path = version_dir.join(VERSION_PAGE);
    fs::write(&path, rendered).at(&path)?;
    debug!(path = %path.display(), "wrote version page");
    Ok(path)
}

/// Rows for every version under `settings.output_dir`, newest first.
pub fn index_rows(settings: &Settings) -> Result<Vec<IndexRow>> {
    let mut versions = existing_versions(&settings.output_dir, &settings.version_prefix)?;
    versions.reverse();
    Ok(versions
        .into_iter()
        .map(|v| {
            let record = read_record(&v.path);
            IndexRow {
                generated_at: record
                    .as_ref()
                    .map(|r| r.generated_at.clone())
                    .unwrap_or_default(),
                date: record
                    .as_ref()
                    .map_or_else(|| "Unknown".to_string(), |r| r.display_date()),
                routes: record
                    .as_ref()
                    .and_then(|r| r.routes_count)
                    .map_or_else(|| "?".to_string(), |n| n.to_string()),
                version: v.name,
            }
        })
        .collect())
}

/// Render `<docs_dir>/index.html` and make sure the assets exist.
pub fn render_index(settings: &Settings) -> Result<PathBuf> {
    let docs_dir = settings.docs_dir();
    fs::create_dir_all(&docs_dir).at(&docs_dir)?;
    ensure_assets(&docs_dir)?;

    let page = IndexTemplate {
        title: settings.title.clone(),
        description: settings.description.clone(),
        api_dir: url_path(&api_dir(settings)),
        rows: index_rows(settings)?,
    };
    let rendered = page.render().map_err(|e| render_failed("index", e))?;

    let path = docs_dir.join(INDEX_PAGE);
    fs::write(&path, rendered).at(&path)?;
    info!(path = %path.display(), versions = page.rows.len(), "updated documentation index");
    Ok(path)
}

/// Re-render every version page and the index.
pub fn render_all(settings: &Settings) -> Result<PathBuf> {
    for v in existing_versions(&settings.output_dir, &settings.version_prefix)? {
        render_version_page(&v.path, &v.name, settings)?;
    }
    render_index(settings)
}
