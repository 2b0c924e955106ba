//! Artifact writers for a version directory.
//!
//! ```text
//! docs/api/v3/
//! ├── api_config.yaml   # schema, loaded by the viewer
//! ├── api_config.json   # same schema as JSON
//! ├── metadata.json     # VersionRecord
//! └── index.html        # viewer page (see `html`)
//! ```

use crate::error::{IoContext, Result};
use crate::schema::SchemaDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SPEC_YAML: &str = "api_config.yaml";
pub const SPEC_JSON: &str = "api_config.json";
pub const METADATA: &str = "metadata.json";
pub const VERSION_PAGE: &str = "index.html";

/// Settings snapshot stored with each version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    pub output_dir: String,
    pub title: String,
    pub description: String,
}

/// Metadata persisted as `metadata.json` next to a version's schema.
///
/// Every field is optional on read so records written by older releases
/// still load; unknown keys are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionRecord {
    pub version: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub generator: String,
    pub generator_version: String,
    pub module_path: String,
    pub app_name: String,
    pub routes_count: Option<usize>,
    pub title: String,
    pub config: RecordConfig,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VersionRecord {
    /// Parsed `generated_at`, if it is a valid timestamp.
    #[must_use]
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.generated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                // naive ISO timestamps written without an offset
                chrono::NaiveDateTime::parse_from_str(&self.generated_at, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    /// `generated_at` formatted for humans, or `Unknown`.
    #[must_use]
    pub fn display_date(&self) -> String {
        match self.generated_at() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
            None if self.generated_at.is_empty() => "Unknown".to_string(),
            None => self.generated_at.clone(),
        }
    }
}

/// Write the YAML schema, the JSON schema and the metadata file.
pub fn write_artifacts(
    version_dir: &Path,
    spec: &SchemaDocument,
    record: &VersionRecord,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(version_dir).at(version_dir)?;

    let yaml_path = version_dir.join(SPEC_YAML);
    fs::write(&yaml_path, serde_yaml::to_string(spec)?).at(&yaml_path)?;

    let json_path = version_dir.join(SPEC_JSON);
    fs::write(&json_path, to_pretty_json(spec)?).at(&json_path)?;

    let metadata_path = version_dir.join(METADATA);
    fs::write(&metadata_path, to_pretty_json(record)?).at(&metadata_path)?;

    debug!(
        yaml = %yaml_path.display(),
        json = %json_path.display(),
        "saved schema artifacts"
    );
    Ok(vec![yaml_path, json_path, metadata_path])
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut s = serde_json::to_string_pretty(value)?;
    s.push('\n');
    Ok(s)
}

/// Read the YAML schema of a version.
pub fn read_schema(version_dir: &Path) -> Result<SchemaDocument> {
    let path = version_dir.join(SPEC_YAML);
    let content = fs::read_to_string(&path).at(&path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Read the JSON schema of a version, if present.
pub fn read_json_schema(version_dir: &Path) -> Result<Option<SchemaDocument>> {
    let path = version_dir.join(SPEC_JSON);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path).at(&path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Read `metadata.json`. Missing files yield `None`; unreadable ones are
/// logged and yield `None`.
#[must_use]
pub fn read_record(version_dir: &Path) -> Option<VersionRecord> {
    let path = version_dir.join(METADATA);
    if !path.is_file() {
        return None;
    }
    match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|c| serde_json::from_str(&c).map_err(|e| e.to_string()))
    {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load metadata");
            None
        }
    }
}
