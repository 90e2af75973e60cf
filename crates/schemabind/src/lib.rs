//! # schemabind — Streaming Decode-and-Validate
//!
//! Reads a JSON document as a stream of tokens and, in a single pass,
//! validates it against a JSON Schema and binds it into a typed Rust
//! destination. Every token is consumed exactly once; the document is never
//! materialized as a tree.
//!
//! ## Layout
//!
//! - [`token`] / [`cursor`]: the token source and its one-token lookahead.
//! - [`schema`]: structural queries over a schema node (type set, property
//!   and item schemas, additional-property policy).
//! - [`checker`]: value-level constraints, delegated to `jsonschema`.
//! - [`destination`]: the [`Destination`] trait, its implementations for
//!   standard types, and the [`record!`] macro for structs.
//! - [`engine`]: the recursive engine and the [`Decoder`] entry point.
//! - [`document`]: loading schema documents from JSON or YAML.
//!
//! ## Example
//!
//! ```
//! use schemabind::{Decoder, SchemaDocument};
//!
//! #[derive(Default)]
//! struct Reading {
//!     sensor: String,
//!     value: f64,
//! }
//!
//! schemabind::record!(Reading { "sensor" => sensor, "value" => value });
//!
//! let schema = SchemaDocument::from_json_str(
//!     r#"{
//!         "type": "object",
//!         "properties": {
//!             "sensor": {"type": "string"},
//!             "value": {"type": "number", "maximum": 10}
//!         }
//!     }"#,
//! )
//! .unwrap();
//!
//! let mut reading = Reading::default();
//! Decoder::new()
//!     .decode_str(r#"{"sensor": "t1", "value": 4.5}"#, &mut reading, Some(schema.root()))
//!     .unwrap();
//! assert_eq!(reading.sensor, "t1");
//!
//! let err = Decoder::new()
//!     .decode_str(r#"{"value": 11}"#, &mut reading, Some(schema.root()))
//!     .unwrap_err();
//! assert_eq!(err.path().unwrap().to_string(), "value");
//! assert_eq!(reading.value, 4.5);
//! ```
//!
//! ## Crate Policy
//!
//! - No destination write happens before every check on that value passed.
//! - Errors are never recovered internally; the first failure aborts the
//!   decode and carries the path of the value that caused it.

pub mod checker;
pub mod cursor;
pub mod destination;
pub mod document;
pub mod engine;
pub mod error;
pub mod path;
pub mod schema;
pub mod token;

pub use checker::{ConstraintChecker, JsonSchemaChecker, NoopChecker};
pub use cursor::TokenCursor;
pub use destination::{
    resolve, Destination, FieldMap, Numeric, Optional, Record, Resolved, Sequence, Slot, Staging,
};
pub use document::{SchemaDocument, SchemaLoadError};
pub use engine::{decode, DecodeOptions, Decoder, DEFAULT_MAX_DEPTH};
pub use error::{DecodeError, ErrorKind, StreamError};
pub use jsonschema::Draft;
pub use path::{Path, Segment};
pub use schema::{JsonType, SchemaFragment, TypeSet};
pub use token::{StreamTokenizer, Token, TokenReplay, Tokenizer};
