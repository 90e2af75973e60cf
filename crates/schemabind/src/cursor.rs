//! # Token Cursor
//!
//! Wraps a [`Tokenizer`] with a single slot of pushback so that array
//! decoding can test for `]` before committing to decode another element.

use crate::error::StreamError;
use crate::token::{Token, Tokenizer};

/// A tokenizer with one token of lookahead.
#[derive(Debug)]
pub struct TokenCursor<T> {
    tokenizer: T,
    pending: Option<Token>,
    consumed: usize,
}

impl<T: Tokenizer> TokenCursor<T> {
    /// Wraps `tokenizer` with an empty lookahead slot.
    pub fn new(tokenizer: T) -> Self {
        Self {
            tokenizer,
            pending: None,
            consumed: 0,
        }
    }

    /// Consumes the next token, draining the lookahead slot first.
    pub fn next_token(&mut self) -> Result<Token, StreamError> {
        let token = match self.pending.take() {
            Some(token) => token,
            None => self.tokenizer.next_token()?,
        };
        self.consumed += 1;
        Ok(token)
    }

    /// Returns the next token without consuming it.
    ///
    /// Repeated calls return the same token until [`next_token`](Self::next_token).
    pub fn peek_token(&mut self) -> Result<&Token, StreamError> {
        let token = match self.pending.take() {
            Some(token) => token,
            None => self.tokenizer.next_token()?,
        };
        Ok(self.pending.insert(token))
    }

    /// Number of tokens consumed so far. Peeked tokens are not counted.
    pub fn tokens_consumed(&self) -> usize {
        self.consumed
    }

    /// Rejects anything left after the root value.
    pub fn finish(self) -> Result<(), StreamError> {
        if self.pending.is_some() {
            return Err(StreamError::TrailingData);
        }
        self.tokenizer.finish()
    }

    /// Returns the wrapped tokenizer, discarding any peeked token.
    pub fn into_inner(self) -> T {
        self.tokenizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenReplay;

    #[test]
    fn test_peek_is_idempotent() {
        let mut cursor = TokenCursor::new(TokenReplay::new(vec![
            Token::BeginArray,
            Token::EndArray,
        ]));
        assert_eq!(cursor.peek_token().unwrap(), &Token::BeginArray);
        assert_eq!(cursor.peek_token().unwrap(), &Token::BeginArray);
        assert_eq!(cursor.tokens_consumed(), 0);
        assert_eq!(cursor.next_token().unwrap(), Token::BeginArray);
        assert_eq!(cursor.next_token().unwrap(), Token::EndArray);
        assert_eq!(cursor.tokens_consumed(), 2);
        cursor.finish().unwrap();
    }

    #[test]
    fn test_finish_with_pending_token_is_trailing_data() {
        let mut cursor = TokenCursor::new(TokenReplay::new(vec![Token::Null, Token::Null]));
        cursor.next_token().unwrap();
        cursor.peek_token().unwrap();
        assert!(matches!(cursor.finish(), Err(StreamError::TrailingData)));
    }

    #[test]
    fn test_exhausted_stream_errors() {
        let mut cursor = TokenCursor::new(TokenReplay::new(Vec::<Token>::new()));
        assert!(matches!(cursor.peek_token(), Err(StreamError::UnexpectedEnd)));
        assert!(matches!(cursor.next_token(), Err(StreamError::UnexpectedEnd)));
    }
}
