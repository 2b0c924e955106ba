//! # Configuration
//!
//! Settings are built from defaults and overridden by an optional config
//! file. Supported formats:
//!
//! | File                      | Layout                                         |
//! |---------------------------|------------------------------------------------|
//! | `aemon.yaml` / `aemon.yml`| top-level `aemon:` mapping (or a flat mapping) |
//! | `aemon.json`              | top-level `"aemon"` object (or a flat object)  |
//! | `aemon.toml`              | `[aemon]` table                                |
//! | `setup.cfg`               | `[aemon]` section, values parsed as JSON when possible |
//!
//! Without `--config`, the current directory is searched in the order
//! `aemon.yaml`, `aemon.yml`, `aemon.json`, `aemon.toml`, `setup.cfg`,
//! `.aemon.yaml`, `.aemon.yml`. A `setup.cfg` without an `[aemon]` section is
//! skipped.
//!
//! ```yaml
//! aemon:
//!   output_dir: docs/api
//!   title: Pet Store
//!   version_prefix: v
//!   swagger_ui_config:
//!     docExpansion: list
//! ```

use crate::error::{AemonError, IoContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Key under which settings live in every config format.
pub const CONFIG_SECTION: &str = "aemon";

const SEARCH_FILES: [&str; 7] = [
    "aemon.yaml",
    "aemon.yml",
    "aemon.json",
    "aemon.toml",
    "setup.cfg",
    ".aemon.yaml",
    ".aemon.yml",
];

/// Flat, immutable settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one sub-directory per version (`docs/api`)
    pub output_dir: PathBuf,
    pub title: String,
    pub description: String,
    /// Version directories are named `<prefix><n>`
    pub version_prefix: String,
    /// Pick `max + 1` for every generate; when false, `version` is reused
    pub auto_increment: bool,
    /// Fixed target version used when `auto_increment` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Show the schema models section in the viewer
    pub include_schemas: bool,
    /// Base URL of the swagger-ui-dist package loaded by version pages
    pub swagger_ui_cdn: String,
    /// Merged over the viewer defaults, passed verbatim to `SwaggerUIBundle`
    pub swagger_ui_config: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Value>,
}

/// Viewer options in effect before any configured `swagger_ui_config`.
#[must_use]
pub fn default_swagger_ui_config() -> Map<String, Value> {
    [
        ("deepLinking", Value::Bool(true)),
        ("displayRequestDuration", Value::Bool(true)),
        ("docExpansion", Value::String("none".into())),
        ("filter", Value::Bool(true)),
        ("showExtensions", Value::Bool(true)),
        ("showCommonExtensions", Value::Bool(true)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("docs/api"),
            title: "API Documentation".to_string(),
            description: "Generated API documentation".to_string(),
            version_prefix: "v".to_string(),
            auto_increment: true,
            version: None,
            include_schemas: true,
            swagger_ui_cdn: "https://unpkg.com/swagger-ui-dist@5".to_string(),
            swagger_ui_config: default_swagger_ui_config(),
            contact: None,
            license: None,
            servers: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the first config file found in the
    /// current directory, or fall back to defaults.
    ///
    /// # Errors
    ///
    /// An explicit `path` that does not exist, an unreadable or malformed
    /// file, and invalid values are all configuration errors.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(AemonError::configuration(format!(
                        "Configuration file not found: {}",
                        p.display()
                    )));
                }
                Self::from_file(p)
            }
            None => match find_config_file(Path::new(".")) {
                Some(found) => Self::from_file(&found),
                None => {
                    debug!("no configuration file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Parse a config file, selecting the format by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading configuration");
        let content = fs::read_to_string(path).at(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let fail = |e: &dyn std::fmt::Display| {
            AemonError::configuration(format!(
                "Failed to load config from {}: {e}",
                path.display()
            ))
        };
        let raw: Value = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| fail(&e))?,
            "json" => serde_json::from_str(&content).map_err(|e| fail(&e))?,
            "toml" => toml::from_str(&content).map_err(|e| fail(&e))?,
            "cfg" | "ini" => parse_cfg_section(&content, CONFIG_SECTION),
            other => {
                return Err(AemonError::configuration(format!(
                    "Unsupported config format: .{other}"
                )))
            }
        };

        Self::from_value(raw).map_err(|e| match e {
            AemonError::Configuration(msg) => AemonError::configuration(format!(
                "Failed to load config from {}: {msg}",
                path.display()
            )),
            other => other,
        })
    }

    /// Build settings from an already parsed document. A top-level `aemon`
    /// key is unwrapped; an empty document yields defaults.
    pub fn from_value(raw: Value) -> Result<Self> {
        let section = match raw {
            Value::Null => return Ok(Self::default()),
            Value::Object(mut map) => match map.remove(CONFIG_SECTION) {
                Some(Value::Null) => return Ok(Self::default()),
                Some(section) => section,
                None => Value::Object(map),
            },
            other => {
                return Err(AemonError::configuration(format!(
                    "expected a mapping, found {}",
                    value_kind(&other)
                )))
            }
        };
        let settings: Settings = serde_json::from_value(section)
            .map_err(|e| AemonError::configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(AemonError::configuration("output_dir must not be empty"));
        }
        if self.version_prefix.is_empty() {
            return Err(AemonError::configuration("version_prefix must not be empty"));
        }
        if self.version_prefix.contains(['/', '\\']) {
            return Err(AemonError::configuration(format!(
                "version_prefix '{}' must not contain path separators",
                self.version_prefix
            )));
        }
        Ok(())
    }

    /// Replace the output directory (the `render-html --output-dir` override).
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Directory that holds `index.html` and `assets/`: the parent of
    /// `output_dir`.
    #[must_use]
    pub fn docs_dir(&self) -> PathBuf {
        match self.output_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// The fixed version used when auto-increment is off.
    #[must_use]
    pub fn fixed_version(&self) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| format!("{}1", self.version_prefix))
    }
}

/// Output format for `aemon init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Default file name for this format.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "aemon.yaml",
            ConfigFormat::Json => "aemon.json",
        }
    }
}

/// Serialize `settings` under the `aemon` key.
pub fn render_config(settings: &Settings, format: ConfigFormat) -> Result<String> {
    let mut root = Map::new();
    root.insert(CONFIG_SECTION.to_string(), serde_json::to_value(settings)?);
    let root = Value::Object(root);
    Ok(match format {
        ConfigFormat::Yaml => serde_yaml::to_string(&root)?,
        ConfigFormat::Json => {
            let mut s = serde_json::to_string_pretty(&root)?;
            s.push('\n');
            s
        }
    })
}

/// First config file present in `dir`, in search order.
#[must_use]
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    SEARCH_FILES.iter().map(|name| dir.join(name)).find(|path| {
        if !path.is_file() {
            return false;
        }
        if path.file_name().is_some_and(|n| n == "setup.cfg") {
            return fs::read_to_string(path)
                .map(|c| has_cfg_section(&c, CONFIG_SECTION))
                .unwrap_or(false);
        }
        true
    })
}

fn has_cfg_section(content: &str, section: &str) -> bool {
    content
        .lines()
        .filter_map(|l| l.trim().strip_prefix('[')?.strip_suffix(']'))
        .any(|name| name.trim() == section)
}

/// Read one `[section]` of an INI-style file into a JSON object.
///
/// Values that parse as JSON keep their type (`true`, `3`, `{"a": 1}`),
/// everything else is a string.
fn parse_cfg_section(content: &str, section: &str) -> Value {
    let mut map = Map::new();
    let mut in_section = false;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim() == section;
            continue;
        }
        if !in_section {
            continue;
        }
        let Some(idx) = line.find(['=', ':']) else {
            continue;
        };
        let key = line[..idx].trim();
        let raw = line[idx + 1..].trim();
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Value::Object(map)
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}
