//! # Application Loader
//!
//! Resolves a *module reference* and an *attribute name* to the document of a
//! web application, the same way a framework CLI resolves `module:app`.
//!
//! A module reference is one of:
//!
//! - a schema module file (`.json`, `.yaml`, `.yml`, or any non-executable
//!   file holding JSON/YAML), read from disk;
//! - an exporter command, e.g. `cargo run -q --bin export-openapi`, executed
//!   through the platform shell. Its stdout is the module document and the
//!   attribute name is available to it as `AEMON_APP`.
//!
//! A module document is either a bare application (a mapping with an
//! `openapi` or `swagger` version), or a namespace whose top-level keys are
//! attributes:
//!
//! ```yaml
//! app:
//!   openapi: 3.1.0
//!   info: { title: Public API, version: 1.0.0 }
//!   paths: {}
//! admin:
//!   openapi: 3.1.0
//!   ...
//! ```
//!
//! An unquoted YAML version such as `swagger: 2.0` parses as a number; it is
//! accepted and rewritten as the string `"2.0"`.
//!
//! Running a command module executes arbitrary user code.

use crate::config::value_kind;
use crate::error::LoadError;
use crate::schema::count_routes;
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Environment variable carrying the attribute name to exporter commands.
pub const APP_ENV: &str = "AEMON_APP";

const DOCUMENT_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// An application resolved from a module.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedApp {
    /// The module reference as given on the command line
    pub module: String,
    /// The attribute that selected the application
    pub attribute: String,
    /// The application's API schema
    pub document: Value,
}

impl LoadedApp {
    /// Number of operations declared under `paths`.
    #[must_use]
    pub fn routes_count(&self) -> usize {
        count_routes(&self.document)
    }
}

/// Load the application named `attribute` from `module`.
///
/// # Errors
///
/// See [`LoadError`]: a missing file, a failing exporter command, a document
/// that is neither JSON nor YAML, a missing attribute, or an attribute that
/// does not hold an application.
pub fn load_app(module: &str, attribute: &str) -> Result<LoadedApp, LoadError> {
    let path = Path::new(module);
    let document = if path.is_file() && !is_executable_script(path) {
        load_from_file(module, path)?
    } else if looks_like_document_path(module) {
        return Err(LoadError::ModuleNotFound(path.to_path_buf()));
    } else {
        load_from_command(module, attribute)?
    };

    let mut document = resolve_attribute(module, attribute, document)?;
    quote_numeric_version(&mut document);
    info!(module, attribute, "loaded application");
    Ok(LoadedApp {
        module: module.to_string(),
        attribute: attribute.to_string(),
        document,
    })
}

fn load_from_file(module: &str, path: &Path) -> Result<Value, LoadError> {
    debug!(path = %path.display(), "reading schema module");
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::ImportFailed {
        module: module.to_string(),
        reason: e.to_string(),
    })?;
    let ext = extension(module);
    parse_document(module, &content, ext.as_deref())
}

fn load_from_command(module: &str, attribute: &str) -> Result<Value, LoadError> {
    debug!(command = module, "running exporter command");
    let mut cmd = shell_command(module);
    let output = cmd
        .env(APP_ENV, attribute)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| LoadError::ImportFailed {
            module: module.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LoadError::ImportFailed {
            module: module.to_string(),
            reason: format!("{} ({})", output.status, stderr.trim()),
        });
    }

    let stdout = String::from_utf8(output.stdout).map_err(|e| LoadError::InvalidModule {
        module: module.to_string(),
        reason: e.to_string(),
    })?;
    parse_document(module, &stdout, None)
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

/// Parse by extension when known; otherwise JSON first, then YAML.
fn parse_document(module: &str, content: &str, ext: Option<&str>) -> Result<Value, LoadError> {
    let invalid = |reason: String| LoadError::InvalidModule {
        module: module.to_string(),
        reason,
    };
    match ext {
        Some("json") => serde_json::from_str(content).map_err(|e| invalid(e.to_string())),
        Some("yaml" | "yml") => serde_yaml::from_str(content).map_err(|e| invalid(e.to_string())),
        _ => serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e: serde_yaml::Error| invalid(e.to_string())),
    }
}

fn resolve_attribute(module: &str, attribute: &str, document: Value) -> Result<Value, LoadError> {
    if is_application(&document) {
        debug!(module, "module exports a single application");
        return Ok(document);
    }

    let Value::Object(mut namespace) = document else {
        return Err(LoadError::InvalidModule {
            module: module.to_string(),
            reason: format!("expected a mapping, found {}", value_kind(&document)),
        });
    };

    match namespace.remove(attribute) {
        Some(candidate) if is_application(&candidate) => Ok(candidate),
        Some(other) => Err(LoadError::NotAnApplication {
            module: module.to_string(),
            attribute: attribute.to_string(),
            found: describe(&other),
        }),
        None => {
            let mut available: Vec<String> = namespace
                .keys()
                .filter(|k| !k.starts_with('_'))
                .cloned()
                .collect();
            available.sort();
            Err(LoadError::AttributeNotFound {
                module: module.to_string(),
                attribute: attribute.to_string(),
                available,
            })
        }
    }
}

const VERSION_KEYS: [&str; 2] = ["openapi", "swagger"];

/// An application is a mapping that declares an OpenAPI (or Swagger) version.
#[must_use]
pub fn is_application(value: &Value) -> bool {
    VERSION_KEYS
        .iter()
        .any(|key| value.get(key).is_some_and(|v| v.is_string() || v.is_number()))
}

fn quote_numeric_version(document: &mut Value) {
    for key in VERSION_KEYS {
        if let Some(version) = document.get_mut(key).filter(|v| v.is_number()) {
            debug!(key, %version, "quoting numeric schema version");
            *version = Value::String(version.to_string());
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(_) => "mapping without an `openapi` version".to_string(),
        other => value_kind(other).to_string(),
    }
}

/// Non-fatal sanity checks on a freshly loaded application.
#[must_use]
pub fn app_warnings(app: &LoadedApp) -> Vec<String> {
    let mut warnings = Vec::new();
    if app.routes_count() == 0 {
        warnings.push("application has no routes defined".to_string());
    }
    let info = app.document.get("info");
    let non_empty = |key: &str| {
        info.and_then(|i| i.get(key))
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };
    if !non_empty("title") {
        warnings.push("application has no title defined".to_string());
    }
    if !non_empty("version") {
        warnings.push("application has no version defined".to_string());
    }
    warnings
}

fn extension(module: &str) -> Option<String> {
    Path::new(module)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn looks_like_document_path(module: &str) -> bool {
    !module.contains(char::is_whitespace)
        && extension(module).is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e.as_str()))
}

/// Executable files without a document extension are run, not read.
#[cfg(unix)]
fn is_executable_script(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    let has_doc_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
    !has_doc_ext
        && std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_script(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    const PETSTORE: &str = r#"
openapi: 3.1.0
info:
  title: Test API
  version: 1.0.0
paths:
  /:
    get:
      responses:
        '200':
          description: OK
"#;

    #[test]
    fn test_load_valid_app_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.yaml");
        fs::write(&path, PETSTORE).unwrap();

        let app = load_app(path.to_str().unwrap(), "app").unwrap();
        assert_eq!(app.document["info"]["title"], "Test API");
        assert_eq!(app.routes_count(), 1);
        assert!(app_warnings(&app).is_empty());
    }

    #[test]
    fn test_load_named_attribute_from_namespace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("apps.json");
        let module = json!({
            "app": {"openapi": "3.1.0", "info": {"title": "Public"}, "paths": {}},
            "api": {"openapi": "3.0.3", "info": {"title": "Admin", "version": "2"}, "paths": {}},
            "_private": 1,
            "settings": {"debug": true},
            "name": "demo"
        });
        fs::write(&path, module.to_string()).unwrap();
        let module_ref = path.to_str().unwrap();

        let app = load_app(module_ref, "api").unwrap();
        assert_eq!(app.document["info"]["title"], "Admin");
        assert_eq!(app.attribute, "api");

        match load_app(module_ref, "missing").unwrap_err() {
            LoadError::AttributeNotFound { available, .. } => {
                assert_eq!(available, vec!["api", "app", "name", "settings"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match load_app(module_ref, "settings").unwrap_err() {
            LoadError::NotAnApplication { found, .. } => assert!(found.contains("mapping")),
            other => panic!("unexpected error: {other:?}"),
        }
        match load_app(module_ref, "name").unwrap_err() {
            LoadError::NotAnApplication { found, .. } => assert_eq!(found, "string"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_module_file() {
        let err = load_app("does/not/exist.yaml", "app").unwrap_err();
        assert!(matches!(err, LoadError::ModuleNotFound(_)));
    }

    #[test]
    fn test_invalid_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_app(path.to_str().unwrap(), "app").unwrap_err();
        assert!(matches!(err, LoadError::InvalidModule { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_from_command() {
        let cmd = r#"printf '{"%s": {"openapi": "3.1.0", "info": {"title": "Cmd"}, "paths": {}}}' "$AEMON_APP""#;
        let app = load_app(cmd, "service").unwrap();
        assert_eq!(app.document["info"]["title"], "Cmd");
        assert_eq!(app.module, cmd);
        let warnings = app_warnings(&app);
        assert!(warnings.iter().any(|w| w.contains("no routes")));
        assert!(warnings.iter().any(|w| w.contains("no version")));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command() {
        let err = load_app("echo boom >&2; exit 3", "app").unwrap_err();
        match err {
            LoadError::ImportFailed { reason, .. } => assert!(reason.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_is_application() {
        assert!(is_application(&json!({"openapi": "3.1.0"})));
        assert!(is_application(&json!({"swagger": "2.0"})));
        assert!(is_application(&json!({"swagger": 2.0})));
        assert!(!is_application(&json!({"openapi": true})));
        assert!(!is_application(&json!({"openapi": null})));
        assert!(!is_application(&json!("openapi")));
    }

    #[test]
    fn test_unquoted_yaml_version_is_loaded_as_string() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.yaml");
        fs::write(
            &path,
            "swagger: 2.0\ninfo:\n  title: Legacy\n  version: '1'\npaths:\n  /:\n    get: {}\n",
        )
        .unwrap();

        let app = load_app(path.to_str().unwrap(), "app").unwrap();
        assert_eq!(app.document["swagger"], "2.0");
        assert_eq!(app.document["info"]["title"], "Legacy");

        let namespace = dir.path().join("apps.yaml");
        fs::write(&namespace, "api:\n  openapi: 3.1\n  paths: {}\n").unwrap();
        let app = load_app(namespace.to_str().unwrap(), "api").unwrap();
        assert_eq!(app.document["openapi"], "3.1");
    }
}
