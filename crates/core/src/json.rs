//! Lenient JSON loading
//!
//! Feature authors frequently keep comments and trailing commas in their
//! devcontainer files. Strict JSON is tried first; on failure the content is
//! retried as JSON5, and the strict parser's error is reported if both fail.

use crate::errors::ConfigError;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, instrument};

/// Parse `content` (read from `path`) into `T`
pub fn parse_lenient<T: DeserializeOwned>(content: &str, path: &Path) -> Result<T, ConfigError> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(strict_err) => {
            debug!(
                "Strict JSON parse of {} failed ({}), retrying as JSON5",
                path.display(),
                strict_err
            );
            json5::from_str(content).map_err(|_| ConfigError::Parsing {
                path: path.display().to_string(),
                message: strict_err.to_string(),
            })
        }
    }
}

/// Read and parse a JSON/JSONC file
#[instrument(level = "debug")]
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_lenient(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::Value;

    #[test]
    fn test_strict_json() {
        let parsed: IndexMap<String, Value> =
            parse_lenient(r#"{"b": 1, "a": 2}"#, Path::new("x.json")).unwrap();
        let keys: Vec<_> = parsed.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_comments_and_trailing_commas() {
        let content = r#"{
            // the first scenario
            "basic": { "image": "ubuntu:22.04", },
        }"#;
        let parsed: IndexMap<String, Value> =
            parse_lenient(content, Path::new("scenarios.json")).unwrap();
        assert_eq!(parsed["basic"]["image"], "ubuntu:22.04");
    }

    #[test]
    fn test_invalid_reports_path() {
        let err = parse_lenient::<Value>("{ not json", Path::new("/f/scenarios.json")).unwrap_err();
        match err {
            ConfigError::Parsing { path, .. } => assert_eq!(path, "/f/scenarios.json"),
            other => panic!("expected Parsing, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_file::<Value>(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
