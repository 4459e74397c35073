//! Identifier handling utilities for T-SQL parsing.
//!
//! Helpers for stripping brackets/quotes, splitting multi-part names and
//! recognizing unquoted keywords in a sqlparser token stream.
//!
//! # Examples
//!
//! ```ignore
//! use crate::parser::identifier_utils::*;
//!
//! assert_eq!(normalize_identifier("[MyTable]"), "MyTable");
//! assert_eq!(split_name_parts("[db]..[Users]"), vec!["db", "", "Users"]);
//! ```

use sqlparser::tokenizer::{Token, Word};

/// Default schema applied to procedures declared without one.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Strips brackets `[]` and double quotes `""` from an identifier.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_identifier("[MyTable]"), "MyTable");
/// assert_eq!(normalize_identifier("\"MyColumn\""), "MyColumn");
/// assert_eq!(normalize_identifier("  [Trimmed]  "), "Trimmed");
/// ```
pub fn normalize_identifier(ident: &str) -> String {
    ident
        .trim()
        .trim_matches(|c| c == '[' || c == ']' || c == '"')
        .to_string()
}

/// Splits a dotted multi-part name into its parts, honoring brackets.
///
/// Dots inside `[...]` do not split. Parts are returned without brackets; an
/// empty part is kept (`db..table` has an empty schema).
pub fn split_name_parts(name: &str) -> Vec<String> {
    let mut parts = Vec::with_capacity(2);
    let mut current = String::new();
    let mut in_bracket = false;

    for c in name.trim().chars() {
        match c {
            '[' if !in_bracket => in_bracket = true,
            ']' if in_bracket => in_bracket = false,
            '.' if !in_bracket => {
                parts.push(normalize_identifier(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    parts.push(normalize_identifier(&current));
    parts
}

/// Splits a possibly-qualified object name into `(schema, name)`.
///
/// Uses the last two parts of a multi-part name; a missing or empty schema
/// becomes `default_schema`.
pub fn split_qualified_name(name: &str, default_schema: &str) -> (String, String) {
    let mut parts = split_name_parts(name);
    let object = parts.pop().unwrap_or_default();
    let schema = match parts.pop() {
        Some(s) if !s.is_empty() => s,
        _ => default_schema.to_string(),
    };
    (schema, object)
}

/// Returns the word if `token` is an unquoted word.
#[inline]
pub fn as_plain_word(token: &Token) -> Option<&Word> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w),
        _ => None,
    }
}

/// Checks whether `token` is the unquoted word `expected` (case-insensitive).
///
/// Comparing the text rather than `Keyword` variants keeps T-SQL words that
/// sqlparser does not classify as keywords (`PROC`, `NOLOCK`, `OUTPUT`) on the
/// same footing as real keywords.
#[inline]
pub fn is_plain_word(token: &Token, expected: &str) -> bool {
    as_plain_word(token).is_some_and(|w| w.value.eq_ignore_ascii_case(expected))
}

/// Checks whether a word token is usable as an object-name part.
///
/// Bracketed/quoted words always are; unquoted words must not start with
/// `@` (variables) or `#` (temp objects).
pub fn is_object_name_word(word: &Word) -> bool {
    word.quote_style.is_some() || !(word.value.starts_with('@') || word.value.starts_with('#'))
}
