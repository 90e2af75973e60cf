//! # Schema Documents
//!
//! Loads a JSON Schema document from JSON or YAML text, or from a file whose
//! extension selects the format (`.yaml`/`.yml` for YAML, anything else for
//! JSON). The loaded document owns its [`serde_json::Value`]; fragments
//! handed to the engine borrow from it.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::schema::SchemaFragment;

/// Error loading a schema document.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    /// The schema file could not be read.
    #[error("cannot read schema '{path}': {source}")]
    Io {
        /// Path to the schema file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid JSON.
    #[error("invalid JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    /// The text is not valid YAML, or uses YAML features with no JSON form
    /// (non-string keys, non-finite numbers).
    #[error("invalid YAML schema: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document root is neither an object nor a boolean.
    #[error("schema root must be an object or a boolean, found {0}")]
    NotASchema(&'static str),
}

/// A parsed schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    value: Value,
}

impl SchemaDocument {
    /// Wraps an already-parsed document.
    pub fn from_value(value: Value) -> Result<Self, SchemaLoadError> {
        match &value {
            Value::Object(_) | Value::Bool(_) => Ok(Self { value }),
            other => Err(SchemaLoadError::NotASchema(kind_of(other))),
        }
    }

    /// Parses a JSON schema document.
    pub fn from_json_str(text: &str) -> Result<Self, SchemaLoadError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Parses a YAML schema document.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaLoadError> {
        Self::from_value(serde_yaml::from_str(text)?)
    }

    /// Reads a schema document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }

    /// The root fragment, for handing to the engine.
    pub fn root(&self) -> SchemaFragment<'_> {
        SchemaFragment::root(&self.value)
    }

    /// The parsed document.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
