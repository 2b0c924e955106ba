//! Schema extraction: turns a loaded application into the document that is
//! persisted for a version.

use crate::config::Settings;
use crate::loader::LoadedApp;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A machine-readable API description (an OpenAPI document).
pub type SchemaDocument = Value;

/// Name recorded in `x-generated-by` and in version metadata.
pub const GENERATOR_NAME: &str = "aemon";

/// Operation keys of an OpenAPI path item.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Count operations across all path items.
#[must_use]
pub fn count_routes(document: &Value) -> usize {
    document
        .get("paths")
        .and_then(Value::as_object)
        .map(|paths| {
            paths
                .values()
                .filter_map(Value::as_object)
                .map(|item| {
                    item.keys()
                        .filter(|k| HTTP_METHODS.contains(&k.to_ascii_lowercase().as_str()))
                        .count()
                })
                .sum()
        })
        .unwrap_or(0)
}

/// Build the document to persist for `app`.
///
/// The application's own schema is kept as-is except for the `info` block:
/// missing title/description are filled from settings, generator markers are
/// added, and configured `contact`, `license` and `servers` are applied.
#[must_use]
pub fn extract_schema(app: &LoadedApp, settings: &Settings) -> SchemaDocument {
    let mut spec = app.document.clone();
    let Some(root) = spec.as_object_mut() else {
        return spec;
    };

    let info = root
        .entry("info")
        .or_insert_with(|| Value::Object(Map::new()));
    if !info.is_object() {
        *info = Value::Object(Map::new());
    }
    if let Some(info) = info.as_object_mut() {
        fill_if_blank(info, "title", &settings.title);
        fill_if_blank(info, "description", &settings.description);
        info.insert("x-generated-by".into(), Value::String(GENERATOR_NAME.into()));
        info.insert(
            "x-generated-at".into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        if let Some(contact) = &settings.contact {
            info.insert("contact".into(), contact.clone());
        }
        if let Some(license) = &settings.license {
            info.insert("license".into(), license.clone());
        }
    }

    if let Some(servers) = &settings.servers {
        root.insert("servers".into(), servers.clone());
    }
    spec
}

fn fill_if_blank(info: &mut Map<String, Value>, key: &str, fallback: &str) {
    let blank = info
        .get(key)
        .map_or(true, |v| v.as_str().map_or(v.is_null(), str::is_empty));
    if blank {
        info.insert(key.to_string(), Value::String(fallback.to_string()));
    }
}
