mod common;

use common::{stderr, stdout, Project};
use serde_json::Value;
use std::fs;

#[test]
fn test_cli_generate_creates_version() {
    let project = Project::new();
    let out = project.aemon(&["generate", "--module", "petstore.yaml"]);
    assert!(out.status.success(), "{}", stderr(&out));

    let v1 = project.docs_api().join("v1");
    for file in ["api_config.yaml", "api_config.json", "metadata.json", "index.html"] {
        assert!(v1.join(file).is_file(), "missing {file}");
    }
    let index = fs::read_to_string(project.path().join("docs/index.html")).unwrap();
    assert!(index.contains("api/v1/index.html"));
    assert!(stderr(&out).contains("Successfully generated API documentation version v1"));
}

#[test]
fn test_cli_generate_twice_without_force_conflicts() {
    let project = Project::new();
    let first = project.aemon(&["generate", "-m", "petstore.yaml", "--version", "v1"]);
    assert!(first.status.success(), "{}", stderr(&first));

    let second = project.aemon(&["generate", "-m", "petstore.yaml", "--version", "v1"]);
    assert_eq!(second.status.code(), Some(1));
    assert!(stderr(&second).contains("already exists"), "{}", stderr(&second));
}

#[test]
fn test_cli_generate_force_overwrites() {
    let project = Project::new();
    assert!(project
        .aemon(&["generate", "-m", "petstore.yaml", "--version", "v1"])
        .status
        .success());
    let json_path = project.docs_api().join("v1/api_config.json");
    fs::write(&json_path, "{}").unwrap();

    let out = project.aemon(&["generate", "-m", "petstore.yaml", "--version", "v1", "--force"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let spec: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(spec["info"]["title"], "Pet Store");
}

#[test]
fn test_cli_generate_from_namespace_module() {
    let project = Project::new();
    let out = project.aemon(&["generate", "-m", "services.json", "-a", "admin"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let meta: Value = serde_json::from_str(
        &fs::read_to_string(project.docs_api().join("v1/metadata.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(meta["app_name"], "admin");
    assert_eq!(meta["routes_count"], 2);

    let missing = project.aemon(&["generate", "-m", "services.json", "-a", "nope"]);
    assert_eq!(missing.status.code(), Some(1));
    let err = stderr(&missing);
    assert!(err.contains("'nope' not found"), "{err}");
    assert!(err.contains("admin") && !err.contains("_internal"), "{err}");

    let wrong = project.aemon(&["generate", "-m", "services.json", "-a", "settings"]);
    assert_eq!(wrong.status.code(), Some(1));
    assert!(stderr(&wrong).contains("not an application instance"));
}

#[test]
fn test_cli_list_json_matches_version_dirs() {
    let project = Project::new();
    let empty = project.aemon(&["list", "--format", "json"]);
    assert!(empty.status.success());
    let doc: Value = serde_json::from_str(&stdout(&empty)).unwrap();
    assert_eq!(doc["versions"].as_array().unwrap().len(), 0);

    for _ in 0..3 {
        assert!(project.aemon(&["generate", "-m", "petstore.yaml"]).status.success());
    }
    let out = project.aemon(&["list", "--format", "json"]);
    let doc: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(doc["versions"], serde_json::json!(["v1", "v2", "v3"]));

    let detailed = project.aemon(&["list", "--format", "json", "--detailed"]);
    let doc: Value = serde_json::from_str(&stdout(&detailed)).unwrap();
    assert_eq!(doc.as_array().unwrap().len(), 3);
    assert_eq!(doc[2]["routes_count"], 3);
}

#[test]
fn test_cli_validate_strict_fails_on_warnings() {
    let project = Project::new();
    assert!(project.aemon(&["generate", "-m", "petstore.yaml"]).status.success());
    assert!(project.aemon(&["validate", "--strict"]).status.success());

    fs::remove_file(project.docs_api().join("v1/metadata.json")).unwrap();
    assert!(project.aemon(&["validate"]).status.success());
    let strict = project.aemon(&["validate", "v1", "--strict"]);
    assert_eq!(strict.status.code(), Some(1));
}

#[test]
fn test_cli_generate_rejects_schema_without_paths() {
    let project = Project::new();
    let out = project.aemon(&["generate", "-m", "no_paths.yaml"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("missing_paths"), "{}", stderr(&out));
    assert!(!project.docs_api().exists());

    let skipped = project.aemon(&["generate", "-m", "no_paths.yaml", "--no-validate"]);
    assert!(skipped.status.success(), "{}", stderr(&skipped));
    assert_eq!(project.aemon(&["validate"]).status.code(), Some(1));
}

#[test]
fn test_cli_init_and_config_file() {
    let project = Project::new();
    assert!(project.aemon(&["init"]).status.success());
    assert!(project.path().join("aemon.yaml").is_file());
    assert_eq!(project.aemon(&["init"]).status.code(), Some(1));
    assert!(project.aemon(&["init", "--force"]).status.success());

    fs::write(
        project.path().join("aemon.yaml"),
        "aemon:\n  output_dir: site/reference\n  version_prefix: r\n",
    )
    .unwrap();
    let out = project.aemon(&["generate", "-m", "petstore.yaml"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(project.path().join("site/reference/r1/api_config.yaml").is_file());
    assert!(project.path().join("site/index.html").is_file());
}

#[test]
fn test_cli_serve_without_docs_fails() {
    let project = Project::new();
    let out = project.aemon(&["serve", "--port", "0"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("No documentation found"));
}

#[test]
fn test_cli_missing_config_file_fails() {
    let project = Project::new();
    let out = project.aemon(&["--config", "absent.yaml", "list"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Configuration file not found"));
}

#[test]
fn test_cli_usage_errors_exit_with_one() {
    let project = Project::new();
    assert_eq!(project.aemon(&[]).status.code(), Some(1));
    assert_eq!(project.aemon(&["list", "--format", "xml"]).status.code(), Some(1));

    let help = project.aemon(&["--help"]);
    assert_eq!(help.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&help.stdout).contains("generate"));
}
