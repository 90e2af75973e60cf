//! # Tokens and Tokenizers
//!
//! The engine reads lexical JSON events through the [`Tokenizer`] trait. Two
//! implementations ship with the crate:
//!
//! - [`StreamTokenizer`] pulls events from any [`std::io::Read`] using the
//!   `struson` streaming reader. Only the open-container stack is kept in
//!   memory; the document itself is never buffered.
//! - [`TokenReplay`] replays an in-memory token sequence, for callers that
//!   already hold tokens produced elsewhere.
//!
//! Object keys are reported as [`Token::String`]; the engine decides from
//! context whether a string token is a key or a value.

use std::fmt;
use std::io::Read;

use struson::reader::{JsonReader, JsonStreamReader, ValueType};

use crate::error::StreamError;

/// One lexical JSON event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `{`
    BeginObject,
    /// `}`
    EndObject,
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// A string value or an object key.
    String(String),
    /// A number, kept as its source literal.
    Number(String),
    /// `true` or `false`.
    Bool(bool),
    /// `null`
    Null,
}

impl Token {
    /// JSON Schema name of the token's category (`"object"` for `{`, ...).
    pub fn category(&self) -> &'static str {
        match self {
            Token::BeginObject | Token::EndObject => "object",
            Token::BeginArray | Token::EndArray => "array",
            Token::String(_) => "string",
            Token::Number(_) => "number",
            Token::Bool(_) => "boolean",
            Token::Null => "null",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BeginObject => f.write_str("'{'"),
            Token::EndObject => f.write_str("'}'"),
            Token::BeginArray => f.write_str("'['"),
            Token::EndArray => f.write_str("']'"),
            Token::String(s) => write!(f, "string {s:?}"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::Bool(b) => write!(f, "boolean {b}"),
            Token::Null => f.write_str("null"),
        }
    }
}

/// A primitive pull tokenizer.
pub trait Tokenizer {
    /// Consumes and returns the next token.
    fn next_token(&mut self) -> Result<Token, StreamError>;

    /// Verifies nothing but whitespace follows the root value.
    fn finish(self) -> Result<(), StreamError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Object { expect_name: bool },
    Array,
}

enum Position {
    Root,
    Name,
    MemberValue,
    Element,
}

/// Streaming tokenizer over a byte source.
pub struct StreamTokenizer<R: Read> {
    reader: JsonStreamReader<R>,
    frames: Vec<Frame>,
    root_done: bool,
}

impl<R: Read> StreamTokenizer<R> {
    /// Creates a tokenizer reading a single JSON document from `source`.
    pub fn new(source: R) -> Self {
        Self {
            reader: JsonStreamReader::new(source),
            frames: Vec::new(),
            root_done: false,
        }
    }

    fn position(&self) -> Position {
        match self.frames.last() {
            None => Position::Root,
            Some(Frame::Object { expect_name: true }) => Position::Name,
            Some(Frame::Object { expect_name: false }) => Position::MemberValue,
            Some(Frame::Array) => Position::Element,
        }
    }

    /// Marks the value just read as complete in its enclosing container.
    fn value_completed(&mut self) {
        match self.frames.last_mut() {
            Some(Frame::Object { expect_name }) => *expect_name = true,
            Some(Frame::Array) => {}
            None => self.root_done = true,
        }
    }

    fn read_value(&mut self) -> Result<Token, StreamError> {
        let token = match self.reader.peek()? {
            ValueType::Object => {
                self.reader.begin_object()?;
                self.frames.push(Frame::Object { expect_name: true });
                return Ok(Token::BeginObject);
            }
            ValueType::Array => {
                self.reader.begin_array()?;
                self.frames.push(Frame::Array);
                return Ok(Token::BeginArray);
            }
            ValueType::String => Token::String(self.reader.next_string()?),
            ValueType::Number => Token::Number(self.reader.next_number_as_string()?),
            ValueType::Boolean => Token::Bool(self.reader.next_bool()?),
            ValueType::Null => {
                self.reader.next_null()?;
                Token::Null
            }
        };
        self.value_completed();
        Ok(token)
    }
}

impl<R: Read> Tokenizer for StreamTokenizer<R> {
    fn next_token(&mut self) -> Result<Token, StreamError> {
        match self.position() {
            Position::Root if self.root_done => return Err(StreamError::UnexpectedEnd),
            Position::Root | Position::MemberValue => {}
            Position::Name => {
                if self.reader.has_next()? {
                    let name = self.reader.next_name_owned()?;
                    if let Some(Frame::Object { expect_name }) = self.frames.last_mut() {
                        *expect_name = false;
                    }
                    return Ok(Token::String(name));
                }
                self.reader.end_object()?;
                self.frames.pop();
                self.value_completed();
                return Ok(Token::EndObject);
            }
            Position::Element => {
                if !self.reader.has_next()? {
                    self.reader.end_array()?;
                    self.frames.pop();
                    self.value_completed();
                    return Ok(Token::EndArray);
                }
            }
        }
        self.read_value()
    }

    fn finish(self) -> Result<(), StreamError> {
        if !self.root_done {
            return Err(StreamError::UnexpectedEnd);
        }
        self.reader.consume_trailing_whitespace()?;
        Ok(())
    }
}

/// Replays an in-memory token sequence.
#[derive(Debug, Clone)]
pub struct TokenReplay<I> {
    tokens: I,
}

impl<I: Iterator<Item = Token>> TokenReplay<I> {
    /// Creates a tokenizer yielding `tokens` in order.
    pub fn new(tokens: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }
}

impl<I: Iterator<Item = Token>> Tokenizer for TokenReplay<I> {
    fn next_token(&mut self) -> Result<Token, StreamError> {
        self.tokens.next().ok_or(StreamError::UnexpectedEnd)
    }

    fn finish(mut self) -> Result<(), StreamError> {
        match self.tokens.next() {
            Some(_) => Err(StreamError::TrailingData),
            None => Ok(()),
        }
    }
}
