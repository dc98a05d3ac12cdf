use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonDocumentError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse json{}: {message}", at_field(.field))]
    Parse { field: String, message: String },
}

fn at_field(field: &str) -> String {
    if field.is_empty() || field == "." {
        String::new()
    } else {
        format!(" at {field}")
    }
}

/// Deserializes `raw`, reporting the offending field path on failure.
pub fn parse_json_document<T: DeserializeOwned>(raw: &str) -> Result<T, JsonDocumentError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let value = serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let field = error.path().to_string();
        let source = error.into_inner();
        JsonDocumentError::Parse {
            field,
            message: source.to_string(),
        }
    })?;
    deserializer
        .end()
        .map_err(|error| JsonDocumentError::Parse {
            field: String::new(),
            message: error.to_string(),
        })?;
    Ok(value)
}

pub fn read_json_document<T: DeserializeOwned>(path: &Path) -> Result<T, JsonDocumentError> {
    let raw = fs::read_to_string(path).map_err(|source| JsonDocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_json_document(&raw)
}

pub fn validation_err(path: &str, message: impl Into<String>) -> String {
    format!("validation failed at {path}: {}", message.into())
}

pub fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> String {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Doc {
        name: String,
        slots: Vec<u32>,
    }

    #[test]
    fn parse_reports_field_path() {
        let error = parse_json_document::<Doc>(r#"{"name":"x","slots":[1,"two"]}"#)
            .expect_err("bad slot");
        let text = error.to_string();
        assert!(text.starts_with("parse json at slots[1]:"), "{text}");
    }

    #[test]
    fn parse_rejects_trailing_content() {
        assert!(parse_json_document::<Doc>(r#"{"name":"x","slots":[]} junk"#).is_err());
    }

    #[test]
    fn parse_accepts_valid_document() {
        let doc = parse_json_document::<Doc>(r#"{"name":"x","slots":[1,2]}"#).expect("doc");
        assert_eq!(
            doc,
            Doc {
                name: "x".to_string(),
                slots: vec![1, 2],
            }
        );
    }

    #[test]
    fn read_missing_file_is_read_error() {
        let error = read_json_document::<Doc>(Path::new("definitely/not/here.json"))
            .expect_err("missing");
        assert!(matches!(error, JsonDocumentError::Read { .. }));
    }

    #[test]
    fn expected_actual_formats_validation_message() {
        assert_eq!(
            expected_actual("worlds[0].entry_node", "< 3", 7),
            "validation failed at worlds[0].entry_node: expected < 3, got 7"
        );
    }
}
