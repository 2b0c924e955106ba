//! Error taxonomy shared by every command.
//!
//! Each command either fully succeeds or aborts with one of these errors; the
//! CLI logs the message and exits non-zero. Nothing is retried.

use std::path::{Path, PathBuf};

/// Convenience alias used throughout the crate.
pub type Result<T, E = AemonError> = std::result::Result<T, E>;

/// Failure to obtain an application from a module reference.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The reference names a schema file that does not exist.
    #[error("module file not found: {0}")]
    ModuleNotFound(PathBuf),

    /// The exporter command could not be spawned or exited unsuccessfully.
    #[error("failed to import module `{module}`: {reason}")]
    ImportFailed { module: String, reason: String },

    /// The module was read but is not a JSON or YAML document.
    #[error("module `{module}` is not a valid JSON or YAML document: {reason}")]
    InvalidModule { module: String, reason: String },

    /// The requested attribute does not exist in the module namespace.
    #[error("variable '{attribute}' not found in {module}. Available attributes: {available:?}")]
    AttributeNotFound {
        module: String,
        attribute: String,
        available: Vec<String>,
    },

    /// The attribute exists but does not hold an application.
    #[error("variable '{attribute}' in {module} is not an application instance. Found: {found}")]
    NotAnApplication {
        module: String,
        attribute: String,
        found: String,
    },
}

/// Top-level error returned by every command.
#[derive(Debug, thiserror::Error)]
pub enum AemonError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("version {version} already exists at {}. Use --force to overwrite", path.display())]
    VersionConflict { version: String, path: PathBuf },

    #[error("validation failed for {failed} version(s)")]
    Validation { failed: usize },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AemonError {
    /// Build a configuration error from any message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Build a generation error from any message.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Attach the offending path to an I/O error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Extension for attaching a path to `std::io::Result`s.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| AemonError::io(path, e))
    }
}
