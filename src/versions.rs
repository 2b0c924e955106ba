//! # Version Manager
//!
//! Versions are directories named `<prefix><n>` under the output directory
//! (`docs/api/v1`, `docs/api/v2`, ...). Numbering is monotonic: a new version
//! is always `max + 1`, gaps are never reused.

use crate::config::Settings;
use crate::error::{AemonError, IoContext, Result};
use crate::writer::SPEC_YAML;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A version directory found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDir {
    /// Directory name, e.g. `v3`
    pub name: String,
    /// Numeric part, e.g. `3`
    pub number: u64,
    pub path: PathBuf,
}

/// Directory names considered versions when scanning.
fn version_pattern(prefix: &str) -> Result<Regex> {
    build_pattern(prefix, "[0-9]+")
}

/// Identifiers accepted for new versions: ASCII digits without leading zeros,
/// so every number has exactly one spelling.
fn target_pattern(prefix: &str) -> Result<Regex> {
    build_pattern(prefix, "[1-9][0-9]*")
}

fn build_pattern(prefix: &str, digits: &str) -> Result<Regex> {
    Regex::new(&format!("^{}({digits})$", regex::escape(prefix)))
        .map_err(|e| AemonError::configuration(format!("invalid version prefix: {e}")))
}

/// Version directories in `output_dir`, sorted by number ascending.
///
/// A missing output directory has no versions.
pub fn existing_versions(output_dir: &Path, prefix: &str) -> Result<Vec<VersionDir>> {
    if !output_dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = version_pattern(prefix)?;
    let mut versions = Vec::new();
    for entry in fs::read_dir(output_dir).at(output_dir)? {
        let entry = entry.at(output_dir)?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Some(number) = pattern
            .captures(&name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        else {
            continue;
        };
        versions.push(VersionDir { name, number, path });
    }
    versions.sort_by_key(|v| v.number);
    Ok(versions)
}

/// Identifier the next auto-incremented version would get.
pub fn next_version(output_dir: &Path, prefix: &str) -> Result<String> {
    let next = match existing_versions(output_dir, prefix)?.last() {
        None => 1,
        Some(last) => last.number.checked_add(1).ok_or_else(|| {
            AemonError::configuration(format!(
                "version {} is the highest representable version number",
                last.name
            ))
        })?,
    };
    Ok(format!("{prefix}{next}"))
}

/// Whether `version_dir` already holds a generated schema.
#[must_use]
pub fn version_exists(version_dir: &Path) -> bool {
    version_dir.join(SPEC_YAML).is_file()
}

/// Pick the target version for a generate run and create its directory.
///
/// The target is `requested` when given, the fixed `settings.version` when
/// auto-increment is off, and `next_version` otherwise.
///
/// # Errors
///
/// - [`AemonError::Configuration`] when an explicit version does not match
///   `<prefix><n>` with `n` a positive integer without leading zeros, or when
///   the next number would overflow
/// - [`AemonError::VersionConflict`] when the target already exists and
///   `force` is false
pub fn prepare_version(
    settings: &Settings,
    requested: Option<&str>,
    force: bool,
) -> Result<(String, PathBuf)> {
    let output_dir = &settings.output_dir;
    let prefix = &settings.version_prefix;

    let version = match requested {
        Some(v) => v.to_string(),
        None if !settings.auto_increment => settings.fixed_version(),
        None => next_version(output_dir, prefix)?,
    };
    let valid_number = target_pattern(prefix)?
        .captures(&version)
        .and_then(|c| c.get(1))
        .is_some_and(|m| m.as_str().parse::<u64>().is_ok());
    if !valid_number {
        return Err(AemonError::configuration(format!(
            "version '{version}' does not match the pattern {prefix}<number> \
             (ASCII digits, no leading zeros)"
        )));
    }

    let version_dir = output_dir.join(&version);
    if version_exists(&version_dir) {
        if !force {
            return Err(AemonError::VersionConflict {
                version,
                path: version_dir,
            });
        }
        info!(%version, "overwriting existing version");
    }

    fs::create_dir_all(&version_dir).at(&version_dir)?;
    debug!(path = %version_dir.display(), "version directory ready");
    Ok((version, version_dir))
}
