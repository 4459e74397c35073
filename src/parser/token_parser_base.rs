//! Base token parser providing common helper methods for T-SQL parsing.
//!
//! Specialized parsers (the procedure signature parser, the body reference
//! scanner) compose a `TokenParser` and delegate navigation to it:
//!
//! ```ignore
//! pub struct ProcedureTokenParser<'a> {
//!     base: TokenParser,
//!     index: LineIndex<'a>,
//! }
//!
//! impl ProcedureTokenParser<'_> {
//!     fn parse_header(&mut self) -> Option<...> {
//!         self.base.skip_whitespace();
//!         self.base.expect_word_ci("CREATE")?;
//!         // ...
//!     }
//! }
//! ```

use sqlparser::dialect::MsSqlDialect;
use sqlparser::tokenizer::{Token, TokenWithSpan, Tokenizer};

use super::identifier_utils::{is_object_name_word, is_plain_word};

/// Base token parser with common helper methods for T-SQL parsing.
///
/// Comments are produced by the tokenizer as `Token::Whitespace`, so
/// `skip_whitespace` also skips comments.
pub struct TokenParser {
    tokens: Vec<TokenWithSpan>,
    pos: usize,
}

impl TokenParser {
    /// Create a new TokenParser from a SQL string.
    ///
    /// Uses MsSqlDialect for tokenization. Returns `None` if tokenization fails
    /// (unterminated string literal, quoted identifier or block comment).
    pub fn new(sql: &str) -> Option<Self> {
        let dialect = MsSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize_with_location()
            .ok()?;

        Some(Self { tokens, pos: 0 })
    }

    // ========================================================================
    // Position and state
    // ========================================================================

    /// Check if at end of tokens.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Get current position in token stream.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Set current position in token stream.
    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    // ========================================================================
    // Token access
    // ========================================================================

    /// Get current token without consuming.
    #[inline]
    pub fn current_token(&self) -> Option<&TokenWithSpan> {
        self.tokens.get(self.pos)
    }

    /// Advance to next token.
    #[inline]
    pub fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    // ========================================================================
    // Whitespace handling
    // ========================================================================

    /// Skip whitespace and comment tokens.
    pub fn skip_whitespace(&mut self) {
        while let Some(token) = self.current_token() {
            match &token.token {
                Token::Whitespace(_) => self.advance(),
                _ => break,
            }
        }
    }

    // ========================================================================
    // Token type checks
    // ========================================================================

    /// Check if current token is an unquoted word matching (case-insensitive).
    #[inline]
    pub fn check_word_ci(&self, word: &str) -> bool {
        self.current_token()
            .is_some_and(|token| is_plain_word(&token.token, word))
    }

    /// Check if current token matches a specific token type (by discriminant).
    ///
    /// For example, `check_token(&Token::LParen)` matches any left parenthesis.
    #[inline]
    pub fn check_token(&self, expected: &Token) -> bool {
        self.current_token().is_some_and(|token| {
            std::mem::discriminant(&token.token) == std::mem::discriminant(expected)
        })
    }

    // ========================================================================
    // Expect methods (check and advance)
    // ========================================================================

    /// Expect a specific word (case-insensitive), advancing if found.
    pub fn expect_word_ci(&mut self, word: &str) -> Option<()> {
        if self.check_word_ci(word) {
            self.advance();
            Some(())
        } else {
            None
        }
    }

    /// Expect a specific token type, advancing if found.
    pub fn expect_token(&mut self, expected: &Token) -> Option<()> {
        if self.check_token(expected) {
            self.advance();
            Some(())
        } else {
            None
        }
    }

    // ========================================================================
    // Identifier parsing
    // ========================================================================

    /// Parse a single object-name part (bracketed or unbracketed).
    ///
    /// Returns the value without brackets/quotes. Variables (`@x`) and temp
    /// objects (`#x`) are rejected without consuming.
    pub fn parse_identifier(&mut self) -> Option<String> {
        let token = self.current_token()?;
        match &token.token {
            Token::Word(w) if is_object_name_word(w) => {
                let name = w.value.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    /// Parse a dotted multi-part name: `a`, `a.b`, `[a].[b].[c]`, `a..c`.
    ///
    /// Empty middle parts (`db..table`) are returned as empty strings.
    /// Returns `None` without consuming if the current token does not start a name.
    pub fn parse_multipart_name(&mut self) -> Option<Vec<String>> {
        let start = self.pos;
        let mut parts = vec![self.parse_identifier()?];

        loop {
            let checkpoint = self.pos;
            self.skip_whitespace();
            if !self.check_token(&Token::Period) {
                self.pos = checkpoint;
                break;
            }
            self.advance();
            self.skip_whitespace();

            if self.check_token(&Token::Period) {
                // db..table
                parts.push(String::new());
                continue;
            }
            match self.parse_identifier() {
                Some(part) => parts.push(part),
                None => {
                    self.pos = start;
                    return None;
                }
            }
        }

        Some(parts)
    }

    /// Parse a schema-qualified name: [schema].[name] or schema.name or [name] or name.
    ///
    /// Returns `(schema, name)`. Uses the last two parts of longer names; a
    /// missing schema defaults to `default_schema`.
    pub fn parse_schema_qualified_name(&mut self, default_schema: &str) -> Option<(String, String)> {
        let mut parts = self.parse_multipart_name()?;
        let name = parts.pop()?;
        let schema = match parts.pop() {
            Some(s) if !s.is_empty() => s,
            _ => default_schema.to_string(),
        };
        Some((schema, name))
    }
}
