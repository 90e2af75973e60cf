//! # Bind-Validate Engine
//!
//! The recursive core. Each call to `decode_value` consumes exactly one
//! JSON value from the cursor, whichever of the three concerns (stream,
//! schema, destination) fails, and then:
//!
//! 1. dispatches on the first token: `{` → object protocol, `[` → array
//!    protocol, anything else → scalar;
//! 2. with no schema, consumes the value and discards it;
//! 3. otherwise checks the value against the schema's type set, the
//!    destination's shape and the [`ConstraintChecker`], in that order, and
//!    only then writes the destination.
//!
//! ## Mutation Discipline
//!
//! - A scalar is written at most once, after every check has passed.
//! - An array is staged in a detached buffer and assigned to the destination
//!   in one step when `]` is read; a failing element leaves it untouched,
//!   including an empty `Option` in front of it.
//! - Objects bind member by member; a failing member leaves earlier members
//!   as committed.
//!
//! Each recursive step receives a fresh [`BindContext`]; nothing is shared
//! between sibling frames except the cursor.

use std::io::Read;

use serde_json::Value;

use crate::checker::{ConstraintChecker, JsonSchemaChecker};
use crate::cursor::TokenCursor;
use crate::destination::{self, Destination, FieldMap, Resolved, Slot};
use crate::error::{DecodeError, StreamError};
use crate::path::Path;
use crate::schema::{JsonType, SchemaFragment};
use crate::token::{StreamTokenizer, Token, Tokenizer};

/// Default nesting limit, matching serde_json's recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Tunables for a [`Decoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum container nesting depth.
    pub max_depth: usize,
    /// Skip the end-of-document check after the root value.
    pub allow_trailing_data: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            allow_trailing_data: false,
        }
    }
}

/// Entry point: binds and validates documents with a fixed checker and options.
pub struct Decoder {
    options: DecodeOptions,
    checker: Box<dyn ConstraintChecker>,
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            options: DecodeOptions::default(),
            checker: Box::new(JsonSchemaChecker::default()),
        }
    }
}

impl Decoder {
    /// A decoder using [`JsonSchemaChecker`] and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the constraint checker.
    pub fn with_checker(mut self, checker: impl ConstraintChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes one document from `tokenizer` into `destination`.
    ///
    /// With `schema` set to `None` the document is consumed without being
    /// validated or bound.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidDestination`] if `destination` cannot hold a
    /// value; no token is read in that case. Otherwise any error raised while
    /// decoding, carrying the path of the offending value.
    pub fn decode<T: Tokenizer>(
        &self,
        tokenizer: T,
        destination: &mut dyn Destination,
        schema: Option<SchemaFragment<'_>>,
    ) -> Result<(), DecodeError> {
        if let Slot::Void = destination.slot() {
            return Err(DecodeError::InvalidDestination {
                reason: "destination cannot hold a value".to_string(),
            });
        }
        self.run(tokenizer, Some(destination), schema)
    }

    /// Decodes one document read from `source`.
    pub fn decode_reader<R: Read>(
        &self,
        source: R,
        destination: &mut dyn Destination,
        schema: Option<SchemaFragment<'_>>,
    ) -> Result<(), DecodeError> {
        self.decode(StreamTokenizer::new(source), destination, schema)
    }

    /// Decodes one document held in memory.
    pub fn decode_str(
        &self,
        json: &str,
        destination: &mut dyn Destination,
        schema: Option<SchemaFragment<'_>>,
    ) -> Result<(), DecodeError> {
        self.decode_reader(json.as_bytes(), destination, schema)
    }

    /// Validates one document from `tokenizer` without binding it anywhere.
    pub fn validate<T: Tokenizer>(
        &self,
        tokenizer: T,
        schema: SchemaFragment<'_>,
    ) -> Result<(), DecodeError> {
        self.run(tokenizer, None, Some(schema))
    }

    /// Validates one document read from `source`.
    pub fn validate_reader<R: Read>(
        &self,
        source: R,
        schema: SchemaFragment<'_>,
    ) -> Result<(), DecodeError> {
        self.validate(StreamTokenizer::new(source), schema)
    }

    fn run<T: Tokenizer>(
        &self,
        tokenizer: T,
        destination: Option<&mut dyn Destination>,
        schema: Option<SchemaFragment<'_>>,
    ) -> Result<(), DecodeError> {
        let result = self.run_document(tokenizer, destination, schema);
        self.checker.release();
        result
    }

    fn run_document<T: Tokenizer>(
        &self,
        tokenizer: T,
        destination: Option<&mut dyn Destination>,
        schema: Option<SchemaFragment<'_>>,
    ) -> Result<(), DecodeError> {
        let mut engine = Engine {
            cursor: TokenCursor::new(tokenizer),
            checker: self.checker.as_ref(),
            max_depth: self.options.max_depth,
        };
        engine.decode_value(BindContext {
            schema,
            destination,
            path: Path::root(),
            depth: 0,
        })?;
        tracing::trace!(tokens = engine.cursor.tokens_consumed(), "document decoded");
        if self.options.allow_trailing_data {
            return Ok(());
        }
        engine
            .cursor
            .finish()
            .map_err(|source| DecodeError::Stream {
                path: Path::root(),
                source,
            })
    }
}

/// Decodes one document with a default [`Decoder`].
///
/// See [`Decoder::decode`].
pub fn decode<T: Tokenizer>(
    tokenizer: T,
    destination: &mut dyn Destination,
    schema: Option<SchemaFragment<'_>>,
) -> Result<(), DecodeError> {
    Decoder::new().decode(tokenizer, destination, schema)
}

/// The unit of recursion: one per JSON value.
struct BindContext<'s, 'd> {
    schema: Option<SchemaFragment<'s>>,
    destination: Option<&'d mut dyn Destination>,
    path: Path,
    depth: usize,
}

struct Engine<'c, T> {
    cursor: TokenCursor<T>,
    checker: &'c dyn ConstraintChecker,
    max_depth: usize,
}

impl<T: Tokenizer> Engine<'_, T> {
    fn next_token(&mut self, path: &Path) -> Result<Token, DecodeError> {
        self.cursor.next_token().map_err(|source| DecodeError::Stream {
            path: path.clone(),
            source,
        })
    }

    fn peek_is(&mut self, path: &Path, expected: &Token) -> Result<bool, DecodeError> {
        match self.cursor.peek_token() {
            Ok(token) => Ok(token == expected),
            Err(source) => Err(DecodeError::Stream {
                path: path.clone(),
                source,
            }),
        }
    }

    fn decode_value(&mut self, ctx: BindContext<'_, '_>) -> Result<(), DecodeError> {
        let token = self.next_token(&ctx.path)?;
        tracing::trace!(path = %ctx.path, token = %token, "token");
        match token {
            Token::BeginObject | Token::BeginArray if ctx.depth >= self.max_depth => {
                Err(DecodeError::DepthLimitExceeded {
                    path: ctx.path,
                    limit: self.max_depth,
                })
            }
            Token::BeginObject => self.decode_object(ctx),
            Token::BeginArray => self.decode_array(ctx),
            Token::EndObject | Token::EndArray => Err(DecodeError::Stream {
                path: ctx.path,
                source: StreamError::UnexpectedDelimiter(token.to_string()),
            }),
            scalar => self.decode_scalar(ctx, scalar),
        }
    }

    fn decode_scalar(&mut self, ctx: BindContext<'_, '_>, token: Token) -> Result<(), DecodeError> {
        let BindContext {
            schema,
            destination,
            path,
            ..
        } = ctx;
        let Some(schema) = schema else {
            return Ok(());
        };

        if token == Token::Null {
            if let Resolved::Empty(layer) = destination::resolve(destination, true) {
                layer.clear();
            }
            return Ok(());
        }

        let instance = scalar_instance(&token, &path)?;
        let types = schema.type_set();
        let admitted = match &instance {
            Value::String(_) => types.contains(JsonType::String),
            Value::Bool(_) => types.contains(JsonType::Boolean),
            Value::Number(n) => types.admits_number(is_integral(n)),
            _ => false,
        };
        if !admitted {
            return Err(DecodeError::StructuralMismatch {
                path,
                message: format!("schema expects {types}, found {}", token.category()),
            });
        }

        let mut destination = destination;
        if let Some(target) = destination.as_deref_mut() {
            if let Err(message) = destination::check_scalar(target, &token) {
                return Err(DecodeError::StructuralMismatch { path, message });
            }
        }

        if let Err(violations) = self.checker.check(schema, &instance) {
            return Err(DecodeError::ConstraintViolation { path, violations });
        }

        match destination::resolve(destination, false) {
            Resolved::Concrete(slot) => {
                let shape = slot.describe();
                if !destination::write_scalar(slot, token) {
                    return Err(DecodeError::StructuralMismatch {
                        path,
                        message: format!("cannot bind value into a {shape} destination"),
                    });
                }
            }
            Resolved::Absent | Resolved::Empty(_) => {}
        }
        Ok(())
    }

    fn decode_object(&mut self, ctx: BindContext<'_, '_>) -> Result<(), DecodeError> {
        let BindContext {
            schema,
            destination,
            path,
            depth,
        } = ctx;
        let Some(schema) = schema else {
            return self.skip_members(&path, depth);
        };

        let types = schema.type_set();
        if !types.contains(JsonType::Object) {
            return Err(DecodeError::StructuralMismatch {
                path,
                message: format!("unexpected object, schema expects {types}"),
            });
        }

        let mut fields = FieldMap::new();
        match destination::resolve(destination, false) {
            Resolved::Concrete(Slot::Record(record)) => record.describe(&mut fields),
            Resolved::Concrete(other) => {
                return Err(DecodeError::StructuralMismatch {
                    path,
                    message: format!("cannot bind an object into a {} destination", other.describe()),
                });
            }
            Resolved::Absent | Resolved::Empty(_) => {}
        }

        loop {
            let key = match self.next_token(&path)? {
                Token::EndObject => break,
                Token::String(key) => key,
                other => {
                    return Err(DecodeError::MalformedKey {
                        path,
                        found: other.to_string(),
                    });
                }
            };

            let child_schema = match schema.property_schema(&key) {
                Some(child) => Some(child),
                None if schema.allows_additional_properties() => None,
                None => {
                    return Err(DecodeError::UnknownProperty { path, name: key });
                }
            };

            self.decode_value(BindContext {
                schema: child_schema,
                destination: fields.lookup(&key),
                path: path.child(&key),
                depth: depth + 1,
            })?;
        }

        tracing::debug!(path = %path, fields = fields.len(), "object decoded");
        Ok(())
    }

    fn decode_array(&mut self, ctx: BindContext<'_, '_>) -> Result<(), DecodeError> {
        let BindContext {
            schema,
            destination,
            path,
            depth,
        } = ctx;
        let Some(schema) = schema else {
            return self.skip_elements(&path, depth);
        };

        let types = schema.type_set();
        if !types.contains(JsonType::Array) {
            return Err(DecodeError::StructuralMismatch {
                path,
                message: format!("unexpected array, schema expects {types}"),
            });
        }

        // Resolution may fill an empty `Option` in front of the sequence;
        // a failing element must leave it empty again.
        let mut destination = destination;
        let vacant = destination::reborrow(&mut destination).and_then(destination::vacant_layer);
        let result = self.decode_elements(
            schema,
            destination::reborrow(&mut destination),
            &path,
            depth,
        );
        if result.is_err() {
            if let (Some(target), Some(layer)) = (destination, vacant) {
                destination::clear_layer(target, layer);
            }
        }
        result
    }

    /// Stages every element of an array and commits them on `]`.
    fn decode_elements(
        &mut self,
        schema: SchemaFragment<'_>,
        destination: Option<&mut dyn Destination>,
        path: &Path,
        depth: usize,
    ) -> Result<(), DecodeError> {
        let mut staging = match destination::resolve(destination, false) {
            Resolved::Concrete(Slot::Sequence(sequence)) => Some(sequence.stage()),
            Resolved::Concrete(other) => {
                return Err(DecodeError::StructuralMismatch {
                    path: path.clone(),
                    message: format!("cannot bind an array into a {} destination", other.describe()),
                });
            }
            Resolved::Absent | Resolved::Empty(_) => None,
        };

        let items = schema.item_schema();
        let mut index = 0;
        while !self.peek_is(path, &Token::EndArray)? {
            self.decode_value(BindContext {
                schema: Some(items),
                destination: staging.as_mut().map(|s| s.fresh_element()),
                path: path.index(index),
                depth: depth + 1,
            })?;
            if let Some(staging) = staging.as_mut() {
                staging.append();
            }
            index += 1;
        }
        self.next_token(path)?;

        if let Some(staging) = staging {
            tracing::debug!(path = %path, len = staging.staged(), "array committed");
            staging.commit();
        }
        Ok(())
    }

    /// Consumes the remaining members of an object with no schema.
    fn skip_members(&mut self, path: &Path, depth: usize) -> Result<(), DecodeError> {
        loop {
            match self.next_token(path)? {
                Token::EndObject => return Ok(()),
                Token::String(key) => self.decode_value(BindContext {
                    schema: None,
                    destination: None,
                    path: path.child(&key),
                    depth: depth + 1,
                })?,
                other => {
                    return Err(DecodeError::MalformedKey {
                        path: path.clone(),
                        found: other.to_string(),
                    });
                }
            }
        }
    }

    /// Consumes the remaining elements of an array with no schema.
    fn skip_elements(&mut self, path: &Path, depth: usize) -> Result<(), DecodeError> {
        let mut index = 0;
        while !self.peek_is(path, &Token::EndArray)? {
            self.decode_value(BindContext {
                schema: None,
                destination: None,
                path: path.index(index),
                depth: depth + 1,
            })?;
            index += 1;
        }
        self.next_token(path)?;
        Ok(())
    }
}

/// The JSON value of a scalar token, as seen by the constraint checker.
fn scalar_instance(token: &Token, path: &Path) -> Result<Value, DecodeError> {
    Ok(match token {
        Token::String(s) => Value::String(s.clone()),
        Token::Bool(b) => Value::Bool(*b),
        Token::Number(literal) => {
            let number = literal
                .parse::<serde_json::Number>()
                .map_err(|_| DecodeError::Stream {
                    path: path.clone(),
                    source: StreamError::InvalidNumber(literal.clone()),
                })?;
            Value::Number(number)
        }
        _ => Value::Null,
    })
}

fn is_integral(number: &serde_json::Number) -> bool {
    number.is_i64()
        || number.is_u64()
        || number
            .as_f64()
            .is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}
