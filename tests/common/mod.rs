//! # Arbor Test Helpers
//!
//! Fixture loading and tree builders shared by the integration tests.

#![allow(dead_code)]

use arbor::value::Value;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One JSON fixture under `tests/fixtures/`.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    #[serde(skip)]
    pub name: String,
    /// Source text the native tree was parsed from, if positions should be filled.
    #[serde(default)]
    pub source: Option<String>,
    pub native: Value,
    pub canonical: Value,
    /// Expected native tree after a round trip; defaults to `native` minus preprocessed fields.
    #[serde(default)]
    pub native_after_round_trip: Option<Value>,
    /// Node types expected to be reported as unmatched, in traversal order.
    #[serde(default)]
    pub unmatched: Vec<String>,
}

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Discovers and parses every `.json` fixture below `dir`, sorted by path.
pub fn load_fixtures(dir: &Path) -> Vec<Fixture> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let text = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("failed to read fixture '{}': {e}", path.display()));
            let mut fixture: Fixture = serde_json::from_str(&text)
                .unwrap_or_else(|e| panic!("failed to parse fixture '{}': {e}", path.display()));
            fixture.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            fixture
        })
        .collect()
}

pub fn json(text: &str) -> Value {
    Value::from_json_str(text).expect("test JSON must parse")
}

/// A node with a type tag and the given fields.
pub fn node(type_name: &str, fields: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    let mut entries: Vec<(&str, Value)> = vec![("type", Value::from(type_name))];
    entries.extend(fields);
    Value::map(entries)
}

/// Role names of `tree`, for compact assertions.
pub fn role_names(tree: &Value) -> Vec<String> {
    tree.role_names().into_iter().map(str::to_string).collect()
}

/// Follows a path of field names and list indices through a tree.
pub fn at<'v>(tree: &'v Value, path: &[&str]) -> &'v Value {
    path.iter().fold(tree, |current, step| {
        let next = match step.parse::<usize>() {
            Ok(index) => current.as_list().and_then(|items| items.get(index)),
            Err(_) => current.get(step),
        };
        next.unwrap_or_else(|| panic!("no '{step}' along {path:?}"))
    })
}
