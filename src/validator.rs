//! # Schema Validator
//!
//! A fixed checklist run against a schema document, either freshly extracted
//! (before anything is written) or read back from a version directory.
//!
//! ## Checks Performed
//!
//! 1. **Document shape** - the root must be a mapping
//! 2. **OpenAPI version** - `openapi` (or `swagger`) must be present
//! 3. **Info block** - `info.title` and `info.version` should be present
//! 4. **Paths** - `paths` must be present and should not be empty
//! 5. **Responses** - every operation must define at least one response
//!
//! On disk, a version is also checked for a missing or unparsable schema, a
//! missing `metadata.json`, and a JSON artifact that disagrees with the YAML
//! one.
//!
//! A report is valid when it has no errors. In strict mode warnings count as
//! failures too.

use crate::schema::HTTP_METHODS;
use crate::writer::{read_json_schema, read_schema, METADATA, SPEC_YAML};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::{error, info, warn};


/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The schema is unusable or violates the document structure
    Error,
    /// Worth fixing; fatal only in strict mode
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One problem found in a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// Where the problem is (e.g. `info`, `paths./pets.get`)
    pub location: String,
    /// Stable identifier of the check (e.g. `missing_paths`)
    pub kind: &'static str,
    pub message: String,
}

impl Finding {
    fn error(location: impl Into<String>, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location: location.into(),
            kind,
            message: message.into(),
        }
    }

    fn warning(location: impl Into<String>, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location: location.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Findings for one version (or for an in-memory document)
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub version: String,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    /// No error-level findings.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Valid, and in strict mode also free of warnings.
    #[must_use]
    pub fn passes(&self, strict: bool) -> bool {
        self.is_valid() && (!strict || self.warnings().next().is_none())
    }
}

/// Run the checklist against a schema document.
#[must_use]
pub fn validate_document(spec: &Value) -> Vec<Finding> {
    let mut findings = Vec::new();

    let Some(root) = spec.as_object() else {
        findings.push(Finding::error(
            "$",
            "invalid_document",
            "Schema document must be a mapping",
        ));
        return findings;
    };

    let has_version = ["openapi", "swagger"]
        .iter()
        .any(|k| root.get(*k).is_some_and(|v| !is_blank(v)));
    if !has_version {
        findings.push(Finding::error(
            "openapi",
            "missing_openapi_version",
            "Missing OpenAPI version",
        ));
    }

    let info = root.get("info");
    if info.and_then(|i| i.get("title")).map_or(true, is_blank) {
        findings.push(Finding::warning("info.title", "missing_title", "Missing API title"));
    }
    if info.and_then(|i| i.get("version")).map_or(true, is_blank) {
        findings.push(Finding::warning(
            "info.version",
            "missing_api_version",
            "Missing API version",
        ));
    }

    match root.get("paths") {
        None | Some(Value::Null) => findings.push(Finding::error(
            "paths",
            "missing_paths",
            "Missing paths object",
        )),
        Some(Value::Object(paths)) if paths.is_empty() => findings.push(Finding::warning(
            "paths",
            "empty_paths",
            "No API paths defined",
        )),
        Some(Value::Object(paths)) => {
            for (path, item) in paths {
                check_path_item(&mut findings, path, item);
            }
        }
        Some(_) => findings.push(Finding::error(
            "paths",
            "invalid_paths",
            "paths must be a mapping",
        )),
    }

    findings
}

fn check_path_item(findings: &mut Vec<Finding>, path: &str, item: &Value) {
    let Some(item) = item.as_object() else {
        findings.push(Finding::error(
            format!("paths.{path}"),
            "invalid_path_item",
            "Path item must be a mapping",
        ));
        return;
    };
    for (method, operation) in item {
        if !HTTP_METHODS.contains(&method.to_ascii_lowercase().as_str()) {
            continue;
        }
        let has_responses = operation
            .get("responses")
            .and_then(Value::as_object)
            .is_some_and(|r| !r.is_empty());
        if !has_responses {
            findings.push(Finding::error(
                format!("paths.{path}.{method}"),
                "missing_responses",
                format!("Operation {} {path} has no response definition", method.to_uppercase()),
            ));
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Validate the artifacts of one version directory.
#[must_use]
pub fn validate_version(version_dir: &Path, version: &str) -> ValidationReport {
    let mut report = ValidationReport {
        version: version.to_string(),
        findings: Vec::new(),
    };

    let spec_path = version_dir.join(SPEC_YAML);
    if !spec_path.is_file() {
        report.findings.push(Finding::error(
            SPEC_YAML,
            "spec_not_found",
            format!("Spec file not found: {}", spec_path.display()),
        ));
        return report;
    }

    let spec = match read_schema(version_dir) {
        Ok(spec) => spec,
        Err(e) => {
            report.findings.push(Finding::error(
                SPEC_YAML,
                "unparsable_spec",
                format!("Failed to parse spec: {e}"),
            ));
            return report;
        }
    };
    report.findings.extend(validate_document(&spec));

    match read_json_schema(version_dir) {
        Ok(Some(json)) if json != spec => report.findings.push(Finding::warning(
            crate::writer::SPEC_JSON,
            "artifact_mismatch",
            "JSON artifact does not match the YAML artifact",
        )),
        Ok(_) => {}
        Err(e) => report.findings.push(Finding::warning(
            crate::writer::SPEC_JSON,
            "artifact_mismatch",
            format!("JSON artifact is unreadable: {e}"),
        )),
    }

    if !version_dir.join(METADATA).is_file() {
        report.findings.push(Finding::warning(
            METADATA,
            "missing_metadata",
            "metadata.json is missing",
        ));
    }

    report
}

/// Log a report the way the `validate` command presents it.
pub fn log_report(report: &ValidationReport) {
    if report.is_valid() {
        info!("✅ {}: Valid", report.version);
    } else {
        error!("❌ {}: Invalid", report.version);
        for finding in report.errors() {
            error!("   • {finding}");
        }
    }
    for finding in report.warnings() {
        warn!("⚠️  {}: {finding}", report.version);
    }
}
