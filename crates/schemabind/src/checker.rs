//! # Schema Constraint Checker
//!
//! The engine dispatches on structure itself (object vs. array vs. scalar,
//! type-set membership, property presence) and hands every scalar to a
//! [`ConstraintChecker`] for the remaining value-level rules: numeric
//! bounds, string lengths and patterns, enumerations, formats, `oneOf` and
//! friends. A rejection aborts the decode before the destination is written.
//!
//! [`JsonSchemaChecker`] is the default and delegates to the `jsonschema`
//! crate. Fragments that carry only structural keywords are accepted
//! without compiling a validator.
//!
//! ## Reference Resolution
//!
//! A fragment is compiled on its own, detached from its document. Local
//! references inside it (`#/definitions/...`, `#/$defs/...`) are kept
//! resolvable by copying the document's definition tables into the compiled
//! schema. Remote references never touch the network: the local retriever
//! answers every URI with the permissive empty schema.
//!
//! When the fragment was reached through a `$ref` with sibling keywords, the
//! siblings are compiled separately and both sets of violations are reported.
//!
//! ## Validator Cache
//!
//! Compiled validators are cached per schema node address until
//! [`ConstraintChecker::release`] is called; [`Decoder`](crate::Decoder)
//! releases after every document. A cached entry is reused only while the
//! node at that address still compares equal to the one it was built from.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::{Map, Value};

use crate::schema::SchemaFragment;

/// Keywords answered by the navigator or carrying no constraint on a scalar.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "type",
    "properties",
    "items",
    "additionalProperties",
    "required",
    "$ref",
    "$id",
    "$schema",
    "$comment",
    "definitions",
    "$defs",
    "title",
    "description",
    "default",
    "examples",
    "deprecated",
    "readOnly",
    "writeOnly",
];

/// Definition tables copied from the document into each compiled fragment.
const DEFINITION_TABLES: &[&str] = &["definitions", "$defs"];

/// Evaluates value-level constraints of a schema fragment against a scalar.
pub trait ConstraintChecker {
    /// Returns one message per violated constraint.
    fn check(&self, fragment: SchemaFragment<'_>, instance: &Value) -> Result<(), Vec<String>>;

    /// Drops any state cached for the schema document in use.
    fn release(&self) {}
}

/// Accepts every value; structural validation still applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopChecker;

impl ConstraintChecker for NoopChecker {
    fn check(&self, _fragment: SchemaFragment<'_>, _instance: &Value) -> Result<(), Vec<String>> {
        Ok(())
    }
}

/// Retriever that keeps remote `$ref` resolution offline.
struct OfflineRetriever;

impl Retrieve for OfflineRetriever {
    fn retrieve(
        &self,
        _uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Ok(serde_json::json!({}))
    }
}

/// Node address, document address, and whether `$ref` was stripped.
type CacheKey = (usize, usize, bool);

#[derive(Clone)]
struct Compiled {
    node: Map<String, Value>,
    validator: Result<Rc<Validator>, String>,
}

/// Constraint checker backed by the `jsonschema` crate.
#[derive(Clone)]
pub struct JsonSchemaChecker {
    draft: Draft,
    cache: RefCell<HashMap<CacheKey, Compiled>>,
}

impl fmt::Debug for JsonSchemaChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaChecker")
            .field("draft", &self.draft)
            .field("cached", &self.cached_validators())
            .finish()
    }
}

impl Default for JsonSchemaChecker {
    fn default() -> Self {
        Self {
            draft: Draft::Draft202012,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl JsonSchemaChecker {
    /// Creates a checker for JSON Schema draft 2020-12.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `draft` semantics when compiling fragments.
    pub fn with_draft(mut self, draft: Draft) -> Self {
        self.draft = draft;
        self.cache.get_mut().clear();
        self
    }

    /// The draft fragments are compiled under.
    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// Number of validators currently cached.
    pub fn cached_validators(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Violations of the keywords of `node`, leaving out `$ref` when
    /// `strip_ref` is set.
    fn node_violations(
        &self,
        node: &Map<String, Value>,
        strip_ref: bool,
        document: &Value,
        instance: &Value,
    ) -> Vec<String> {
        if node
            .keys()
            .all(|keyword| STRUCTURAL_KEYWORDS.contains(&keyword.as_str()))
        {
            return Vec::new();
        }

        let key = (
            node as *const Map<String, Value> as usize,
            document as *const Value as usize,
            strip_ref,
        );
        let cached = self
            .cache
            .borrow()
            .get(&key)
            .filter(|entry| entry.node == *node)
            .map(|entry| entry.validator.clone());
        let validator = match cached {
            Some(validator) => validator,
            None => {
                let validator = self.compile(node, strip_ref, document);
                self.cache.borrow_mut().insert(
                    key,
                    Compiled {
                        node: node.clone(),
                        validator: validator.clone(),
                    },
                );
                validator
            }
        };

        match validator {
            Ok(validator) => validator
                .iter_errors(instance)
                .map(|e| e.to_string())
                .collect(),
            Err(message) => vec![message],
        }
    }

    fn compile(
        &self,
        node: &Map<String, Value>,
        strip_ref: bool,
        document: &Value,
    ) -> Result<Rc<Validator>, String> {
        let mut schema = node.clone();
        if strip_ref {
            schema.remove("$ref");
        }
        if let Value::Object(document) = document {
            for table in DEFINITION_TABLES {
                if let Some(definitions) = document.get(*table) {
                    schema
                        .entry(table.to_string())
                        .or_insert_with(|| definitions.clone());
                }
            }
        }
        let schema = Value::Object(schema);

        jsonschema::options()
            .with_draft(self.draft)
            .with_retriever(OfflineRetriever)
            .build(&schema)
            .map(Rc::new)
            .map_err(|e| format!("schema fragment does not compile: {e}"))
    }
}

impl ConstraintChecker for JsonSchemaChecker {
    fn check(&self, fragment: SchemaFragment<'_>, instance: &Value) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        // Boolean schemas are fully described by their type set.
        if let Value::Object(node) = fragment.value() {
            violations.extend(self.node_violations(node, false, fragment.document(), instance));
        }
        if let Some(Value::Object(overlay)) = fragment.overlay() {
            violations.extend(self.node_violations(overlay, true, fragment.document(), instance));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            tracing::debug!(count = violations.len(), "constraint check rejected value");
            Err(violations)
        }
    }

    fn release(&self) {
        self.cache.borrow_mut().clear();
    }
}
