//! Procedure signature parsing for T-SQL
//!
//! Splits a procedure block into schema, name, parameter list and body.
//! Each step is an ordered list of strategies tried until one succeeds:
//!
//! - name: tokenizer, then a header pattern
//! - body boundary: tokenizer (first depth-0 `AS` that is not `EXECUTE AS`),
//!   then `)`-then-`AS`, `AS` at line start, `AS` anywhere
//! - parameters: tokenizer, then a parameter pattern
//!
//! Tokenizer strategies only fail on text sqlparser cannot tokenize
//! (unterminated literals or comments).
//!
//! ## Supported Syntax
//!
//! ```sql
//! CREATE PROCEDURE [schema].[name] AS ...
//! CREATE PROC name;2 AS ...
//! CREATE OR ALTER PROCEDURE db.schema.name AS ...
//! CREATE PROCEDURE [schema].[name] (@p1 TYPE = default, @p2 TYPE OUTPUT) AS ...
//! CREATE PROCEDURE [schema].[name] @items [dbo].[TableType] READONLY
//! WITH EXECUTE AS OWNER, RECOMPILE
//! AS ...
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use sqlparser::tokenizer::Token;

use super::comment_stripper::strip_comments;
use super::identifier_utils::{split_qualified_name, DEFAULT_SCHEMA};
use super::line_index::LineIndex;
use super::token_parser_base::TokenParser;
use crate::util::collapse_whitespace;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)CREATE\s+(?:OR\s+ALTER\s+)?PROC(?:EDURE)?\s+((?:\[[^\]]+\]|[\w@#$]+)(?:\s*\.\s*(?:\[[^\]]*\]|[\w@#$]*))*)",
    )
    .unwrap()
});

static PROC_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*;\s*\d+").unwrap());

static PAREN_THEN_AS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*\(.*?\)\s*(AS)\b").unwrap());

static LINE_START_AS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*(AS)\b").unwrap());

static ANYWHERE_AS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s(AS)(?:\s|$)").unwrap());

static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)(@[\w@#$]+)\s+(?:AS\s+)?((?:\[[^\]]*\]|[\w.])+(?:\s*\([^()]*\))?(?:\s+VARYING)?)(?:\s*=\s*('(?:[^']|'')*'|N'(?:[^']|'')*'|[^,\s)]+(?:\([^()]*\))?))?(?:\s+(READONLY))?(?:\s+(OUTPUT|OUT)\b)?",
    )
    .unwrap()
});

/// Parameter direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterDirection {
    In,
    Output,
}

/// A procedure parameter, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    /// Parameter name including the `@` prefix
    pub name: String,
    /// Declared type with whitespace collapsed (e.g. `decimal(18, 2)`)
    pub data_type: String,
    pub direction: ParameterDirection,
    /// Default value literal as written, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Table-valued parameter declared READONLY
    pub readonly: bool,
}

/// Which strategy located the parameter-list/body boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyBoundary {
    Tokenized,
    ParenThenAs,
    LineStartAs,
    AnywhereAs,
    /// No `AS` found; the whole remainder is treated as body
    None,
}

/// A procedure split into signature and body
#[derive(Debug, Clone)]
pub struct ParsedProcedure<'a> {
    pub schema: String,
    pub name: String,
    pub parameters: Vec<Parameter>,
    /// Executable body after `AS`, borrowed from the dump
    pub body: &'a str,
    pub boundary: BodyBoundary,
}

impl ParsedProcedure<'_> {
    /// `schema.name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

/// Schema, name and where the name ends
struct Header {
    schema: String,
    name: String,
    name_end: usize,
}

/// Token-based procedure header parser
pub struct ProcedureTokenParser<'a> {
    base: TokenParser,
    index: LineIndex<'a>,
    text: &'a str,
}

impl<'a> ProcedureTokenParser<'a> {
    /// Create a new parser for a procedure block. `None` if tokenization fails.
    pub fn new(text: &'a str) -> Option<Self> {
        Some(Self {
            base: TokenParser::new(text)?,
            index: LineIndex::new(text),
            text,
        })
    }

    /// Byte offset of the current token, or the end of the text
    fn current_offset(&self) -> usize {
        self.base
            .current_token()
            .map(|t| self.index.offset(t.span.start))
            .unwrap_or(self.text.len())
    }

    /// Skip leading comments and `SET <option> <value>` lines
    fn skip_preamble(&mut self) {
        loop {
            self.base.skip_whitespace();
            if !self.base.check_word_ci("SET") {
                return;
            }
            self.base.advance();
            for _ in 0..2 {
                self.base.skip_whitespace();
                self.base.advance();
            }
            self.base.skip_whitespace();
            if self.base.check_token(&Token::SemiColon) {
                self.base.advance();
            }
        }
    }

    /// Parse `CREATE [OR ALTER] PROC[EDURE] name[;n]`
    fn parse_header(&mut self) -> Option<Header> {
        self.skip_preamble();

        self.base.expect_word_ci("CREATE")?;
        self.base.skip_whitespace();

        // Check for optional OR ALTER
        if self.base.check_word_ci("OR") {
            self.base.advance();
            self.base.skip_whitespace();
            self.base.expect_word_ci("ALTER")?;
            self.base.skip_whitespace();
        }

        // Expect PROCEDURE or PROC keyword
        if !self.base.check_word_ci("PROCEDURE") && !self.base.check_word_ci("PROC") {
            return None;
        }
        self.base.advance();
        self.base.skip_whitespace();

        let (schema, name) = self.base.parse_schema_qualified_name(DEFAULT_SCHEMA)?;
        if name.is_empty() {
            return None;
        }

        // Numbered procedure group: name;2
        let after_name = self.base.pos();
        self.base.skip_whitespace();
        if self.base.expect_token(&Token::SemiColon).is_some() {
            self.base.skip_whitespace();
            if !matches!(
                self.base.current_token().map(|t| &t.token),
                Some(Token::Number(..))
            ) {
                self.base.set_pos(after_name);
            } else {
                self.base.advance();
            }
        } else {
            self.base.set_pos(after_name);
        }

        Some(Header {
            schema,
            name,
            name_end: self.current_offset(),
        })
    }

    /// Find the `AS` that opens the body: the first one at parenthesis depth 0
    /// that is neither part of an `EXECUTE AS` clause nor an `@param AS type`
    /// declaration.
    ///
    /// Returns the byte offset of the `AS` token.
    fn find_body_as(&mut self) -> Option<usize> {
        let mut depth = 0usize;
        let mut prev_word_binds_as = false;

        while let Some(token) = self.base.current_token() {
            match &token.token {
                Token::Whitespace(_) => {}
                Token::LParen => {
                    depth += 1;
                    prev_word_binds_as = false;
                }
                Token::RParen => {
                    depth = depth.saturating_sub(1);
                    prev_word_binds_as = false;
                }
                Token::Word(w) if w.quote_style.is_none() => {
                    if depth == 0 && w.value.eq_ignore_ascii_case("AS") && !prev_word_binds_as {
                        return Some(self.index.offset(token.span.start));
                    }
                    prev_word_binds_as = w.value.starts_with('@')
                        || w.value.eq_ignore_ascii_case("EXECUTE")
                        || w.value.eq_ignore_ascii_case("EXEC");
                }
                _ => prev_word_binds_as = false,
            }
            self.base.advance();
        }
        None
    }
}

/// Parse a procedure block into signature and body.
///
/// Returns `None` only when no schema/name can be recovered; a block whose
/// body boundary cannot be found still parses, with an empty parameter list.
pub fn parse_procedure(text: &str) -> Option<ParsedProcedure<'_>> {
    let mut token_parser = ProcedureTokenParser::new(text);

    let tokenized_header = token_parser.as_mut().and_then(|p| p.parse_header());
    let (header, token_boundary) = match tokenized_header {
        Some(header) => {
            let boundary = token_parser.as_mut().and_then(|p| p.find_body_as());
            (header, boundary)
        }
        None => (parse_header_pattern(text)?, None),
    };

    let rest = &text[header.name_end..];
    let boundary = token_boundary
        .map(|as_pos| (as_pos - header.name_end, BodyBoundary::Tokenized))
        .or_else(|| find_body_as_pattern(rest));

    let (parameters, body, boundary) = match boundary {
        Some((as_pos, strategy)) => {
            let param_text = &rest[..as_pos];
            let body = rest[as_pos + 2..].trim();
            (parse_parameters(param_text), body, strategy)
        }
        None => (Vec::new(), rest.trim(), BodyBoundary::None),
    };

    Some(ParsedProcedure {
        schema: header.schema,
        name: header.name,
        parameters,
        body,
        boundary,
    })
}

/// Header fallback for blocks the tokenizer rejects
fn parse_header_pattern(text: &str) -> Option<Header> {
    let caps = HEADER_RE.captures(text)?;
    let full_name = caps.get(1)?;
    let (schema, name) = split_qualified_name(full_name.as_str(), DEFAULT_SCHEMA);
    if name.is_empty() {
        return None;
    }

    let mut name_end = full_name.end();
    if let Some(number) = PROC_NUMBER_RE.find(&text[name_end..]) {
        name_end += number.end();
    }

    Some(Header {
        schema,
        name,
        name_end,
    })
}

/// Body-boundary fallbacks, loosest last. Returns the `AS` offset within `rest`.
fn find_body_as_pattern(rest: &str) -> Option<(usize, BodyBoundary)> {
    let strategies: [(&Regex, BodyBoundary); 3] = [
        (&PAREN_THEN_AS_RE, BodyBoundary::ParenThenAs),
        (&LINE_START_AS_RE, BodyBoundary::LineStartAs),
        (&ANYWHERE_AS_RE, BodyBoundary::AnywhereAs),
    ];

    strategies.iter().find_map(|(re, strategy)| {
        re.captures_iter(rest)
            .filter_map(|caps| caps.get(1))
            .find(|m| !follows_parameter_name(rest, m.start()))
            .map(|m| (m.start(), *strategy))
    })
}

/// Whether the word before `pos` is a parameter name (`@Id AS INT`)
fn follows_parameter_name(text: &str, pos: usize) -> bool {
    text[..pos]
        .trim_end()
        .rsplit(|c: char| c.is_whitespace() || c == ',' || c == '(')
        .next()
        .is_some_and(|word| word.starts_with('@'))
}

/// Parse the text between the procedure name and the body `AS`.
///
/// Accepts parenthesized or bare lists, multi-line layouts, nested type
/// parentheses and defaults containing commas or parentheses. Trailing
/// procedure options (`WITH ...`, `FOR REPLICATION`) are ignored.
pub fn parse_parameters(param_text: &str) -> Vec<Parameter> {
    match TokenParser::new(param_text) {
        Some(base) => ParameterTokenParser {
            base,
            index: LineIndex::new(param_text),
            text: param_text,
        }
        .parse_list(),
        None => parse_parameters_pattern(param_text),
    }
}

/// Token-based parameter list parser
struct ParameterTokenParser<'a> {
    base: TokenParser,
    index: LineIndex<'a>,
    text: &'a str,
}

impl ParameterTokenParser<'_> {
    fn current_offset(&self) -> usize {
        self.base
            .current_token()
            .map(|t| self.index.offset(t.span.start))
            .unwrap_or(self.text.len())
    }

    fn at_parameter_name(&self) -> bool {
        matches!(
            self.base.current_token().map(|t| &t.token),
            Some(Token::Word(w)) if w.quote_style.is_none() && w.value.starts_with('@')
        )
    }

    /// Word tokens that end a type or default at depth 0
    fn at_modifier_or_option(&self) -> bool {
        ["OUTPUT", "OUT", "READONLY", "WITH", "FOR"]
            .iter()
            .any(|w| self.base.check_word_ci(w))
    }

    fn parse_list(mut self) -> Vec<Parameter> {
        let mut params = Vec::new();

        self.base.skip_whitespace();
        let has_parens = self.base.expect_token(&Token::LParen).is_some();

        loop {
            self.base.skip_whitespace();
            if self.base.is_at_end() {
                break;
            }
            if self.base.check_token(&Token::RParen) && has_parens {
                break;
            }
            if self.base.check_word_ci("WITH") || self.base.check_word_ci("FOR") {
                break;
            }

            if self.at_parameter_name() {
                if let Some(param) = self.parse_single_parameter() {
                    params.push(param);
                }
            } else {
                // Stray comma or token we do not understand
                self.base.advance();
            }
        }

        params
    }

    /// Parse a single parameter: @name [AS] TYPE [= default] [READONLY] [OUTPUT|OUT]
    fn parse_single_parameter(&mut self) -> Option<Parameter> {
        let name = match &self.base.current_token()?.token {
            Token::Word(w) => w.value.clone(),
            _ => return None,
        };
        self.base.advance();
        self.base.skip_whitespace();
        if self.base.check_word_ci("AS") {
            self.base.advance();
            self.base.skip_whitespace();
        }

        let type_start = self.current_offset();
        self.skip_until_terminator(true);
        let data_type = collapse_whitespace(&strip_comments(
            &self.text[type_start..self.current_offset()],
        ));
        if data_type.is_empty() {
            return None;
        }

        let mut default_value = None;
        let mut readonly = false;
        let mut direction = ParameterDirection::In;

        loop {
            self.base.skip_whitespace();
            if self.base.check_token(&Token::Eq) {
                self.base.advance();
                let default_start = self.current_offset();
                self.skip_until_terminator(false);
                let raw = strip_comments(&self.text[default_start..self.current_offset()]);
                let value = raw.trim().trim_end_matches(',').trim_end();
                if !value.is_empty() {
                    default_value = Some(value.to_string());
                }
                continue;
            }
            if self.base.check_word_ci("READONLY") {
                readonly = true;
                self.base.advance();
                continue;
            }
            if self.base.check_word_ci("OUTPUT") || self.base.check_word_ci("OUT") {
                direction = ParameterDirection::Output;
                self.base.advance();
                continue;
            }
            break;
        }

        Some(Parameter {
            name,
            data_type,
            direction,
            default_value,
            readonly,
        })
    }

    /// Advance to the next depth-0 comma, closing parenthesis, modifier word,
    /// or (for types) `=` / the next parameter name.
    fn skip_until_terminator(&mut self, in_type: bool) {
        let mut depth = 0usize;
        while let Some(token) = self.base.current_token() {
            if depth == 0 {
                let stop = match &token.token {
                    Token::Comma | Token::RParen => true,
                    Token::Eq => in_type,
                    Token::Word(w) if w.quote_style.is_none() => {
                        self.at_modifier_or_option() || (in_type && w.value.starts_with('@'))
                    }
                    _ => false,
                };
                if stop {
                    return;
                }
            }
            match token.token {
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.base.advance();
        }
    }
}

/// Parameter fallback for text the tokenizer rejects
fn parse_parameters_pattern(param_text: &str) -> Vec<Parameter> {
    let stripped = strip_comments(param_text);
    PARAM_RE
        .captures_iter(&stripped)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_string();
            let data_type = collapse_whitespace(caps.get(2)?.as_str());
            let default_value = caps
                .get(3)
                .map(|m| m.as_str().trim().trim_end_matches(',').to_string())
                .filter(|v| !v.is_empty());
            Some(Parameter {
                name,
                data_type,
                direction: if caps.get(5).is_some() {
                    ParameterDirection::Output
                } else {
                    ParameterDirection::In
                },
                default_value,
                readonly: caps.get(4).is_some(),
            })
        })
        .collect()
}
