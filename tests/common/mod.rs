#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch project directory with the fixtures copied in.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for fixture in ["petstore.yaml", "services.json", "no_paths.yaml"] {
            std::fs::copy(fixture_path(fixture), dir.path().join(fixture)).unwrap();
        }
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn docs_api(&self) -> PathBuf {
        self.path().join("docs/api")
    }

    /// Run the `aemon` binary inside the project directory.
    pub fn aemon(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_aemon"))
            .current_dir(self.path())
            .env_remove("AEMON_CONFIG")
            .env_remove("AEMON_LOG")
            .env_remove("AEMON_LOG_FORMAT")
            .args(args)
            .output()
            .expect("run aemon")
    }
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
