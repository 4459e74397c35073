//! Table and procedure references in procedure bodies.
//!
//! Tables are recovered from the object position after `FROM`, `JOIN`,
//! `INSERT [INTO]`, `UPDATE`, `DELETE [FROM]`, `MERGE [INTO]` and
//! `TRUNCATE TABLE`; procedure calls from the object after `EXEC[UTE]`.
//!
//! A name followed by `(` after FROM/JOIN is a table-valued function call
//! unless the parentheses hold a legacy table hint, as in `FROM t (NOLOCK)`.
//!
//! Schema-qualified tables are always accepted. An unqualified name is
//! accepted only when it is in the known-table set and is not a keyword,
//! so without a known-table set only qualified references survive.
//!
//! The token scanner is tried first; a pattern scan takes over when the body
//! cannot be tokenized.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use sqlparser::tokenizer::Token;

use crate::collaborators::KnownTables;
use crate::parser::identifier_utils::split_name_parts;
use crate::parser::token_parser_base::TokenParser;
use crate::util::starts_with_ci;

static TABLE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(FROM|JOIN|(?:INSERT|MERGE)(?:\s+INTO)?|UPDATE|DELETE(?:\s+FROM)?|TRUNCATE\s+TABLE)\s+((?:\[[^\]]+\]|[A-Za-z_][\w$]*)(?:\s*\.\s*(?:\[[^\]]+\]|[A-Za-z_][\w$]*)?)*)(\s*\(\s*(\w*))?",
    )
    .unwrap()
});

static PROC_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bEXEC(?:UTE)?\s+(?:@\w+\s*=\s*)?((?:\[[^\]]+\]|[A-Za-z_][\w$]*)(?:\s*\.\s*(?:\[[^\]]+\]|[A-Za-z_][\w$]*)?)*)",
    )
    .unwrap()
});

/// Hints accepted in the legacy `FROM t (HINT)` form
const TABLE_HINTS: &[&str] = &[
    "NOLOCK",
    "READUNCOMMITTED",
    "UPDLOCK",
    "ROWLOCK",
    "HOLDLOCK",
    "INDEX",
    "TABLOCK",
    "TABLOCKX",
    "READPAST",
    "NOWAIT",
    "XLOCK",
    "PAGLOCK",
    "SERIALIZABLE",
];

fn is_table_hint(word: &str) -> bool {
    TABLE_HINTS.iter().any(|h| word.eq_ignore_ascii_case(h))
}

/// Tables and procedures referenced by one body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    /// Sorted, deduplicated bare table names
    pub tables: Vec<String>,
    /// Sorted, deduplicated bare procedure names
    pub procedures: Vec<String>,
}

/// An object name found in a table position, before gating
#[derive(Debug, Clone, PartialEq, Eq)]
enum TableCandidate {
    Qualified(String),
    Unqualified(String),
}

impl TableCandidate {
    fn from_parts(mut parts: Vec<String>) -> Option<Self> {
        let qualified = parts.len() > 1;
        let name = parts.pop().filter(|n| !n.is_empty())?;
        Some(if qualified {
            TableCandidate::Qualified(name)
        } else {
            TableCandidate::Unqualified(name)
        })
    }
}

/// Raw candidates collected by either scan strategy
#[derive(Debug, Default)]
struct Candidates {
    tables: Vec<TableCandidate>,
    /// Name parts of each EXEC target
    procedures: Vec<Vec<String>>,
}

/// Extract table and procedure references from a comment-stripped body
pub fn extract_references(
    stripped_body: &str,
    own_name: &str,
    known_tables: Option<&KnownTables>,
) -> References {
    let candidates = match ReferenceTokenScanner::new(stripped_body) {
        Some(scanner) => scanner.scan(),
        None => scan_with_patterns(stripped_body),
    };

    References {
        tables: resolve_tables(candidates.tables, known_tables),
        procedures: resolve_procedures(candidates.procedures, own_name),
    }
}

fn resolve_tables(candidates: Vec<TableCandidate>, known: Option<&KnownTables>) -> Vec<String> {
    let mut tables = BTreeSet::new();
    for candidate in candidates {
        match candidate {
            TableCandidate::Qualified(name) => {
                let canonical = known.and_then(|k| k.lookup(&name)).unwrap_or(&name);
                tables.insert(canonical.to_string());
            }
            TableCandidate::Unqualified(name) => {
                if is_sql_keyword(&name.to_uppercase()) {
                    continue;
                }
                if let Some(canonical) = known.and_then(|k| k.lookup(&name)) {
                    tables.insert(canonical.to_string());
                }
            }
        }
    }
    tables.into_iter().collect()
}

fn resolve_procedures(candidates: Vec<Vec<String>>, own_name: &str) -> Vec<String> {
    let mut procedures = BTreeSet::new();
    for mut parts in candidates {
        let qualified = parts.len() > 1;
        let Some(name) = parts.pop().filter(|n| !n.is_empty()) else {
            continue;
        };
        if !qualified && is_sql_keyword(&name.to_uppercase()) {
            continue;
        }
        // System procedures, including sp_executesql
        if starts_with_ci(&name, "sp_") || starts_with_ci(&name, "xp_") {
            continue;
        }
        if name.eq_ignore_ascii_case(own_name) {
            continue;
        }
        procedures.insert(name);
    }
    procedures.into_iter().collect()
}

/// Token-based reference scanner
struct ReferenceTokenScanner {
    base: TokenParser,
    candidates: Candidates,
}

impl ReferenceTokenScanner {
    fn new(sql: &str) -> Option<Self> {
        Some(Self {
            base: TokenParser::new(sql)?,
            candidates: Candidates::default(),
        })
    }

    fn scan(mut self) -> Candidates {
        loop {
            self.base.skip_whitespace();
            let Some(token) = self.base.current_token() else {
                break;
            };
            let keyword = match &token.token {
                Token::Word(w) if w.quote_style.is_none() => w.value.to_uppercase(),
                _ => {
                    self.base.advance();
                    continue;
                }
            };
            self.base.advance();

            match keyword.as_str() {
                "FROM" | "JOIN" => self.scan_table_target(true),
                "INSERT" | "MERGE" => {
                    self.skip_optional_word("INTO");
                    self.scan_table_target(false);
                }
                "UPDATE" => self.scan_table_target(false),
                "DELETE" => {
                    self.skip_optional_word("FROM");
                    self.scan_table_target(false);
                }
                "TRUNCATE" => {
                    self.base.skip_whitespace();
                    if self.base.expect_word_ci("TABLE").is_some() {
                        self.scan_table_target(false);
                    }
                }
                "EXEC" | "EXECUTE" => self.scan_procedure_target(),
                _ => {}
            }
        }
        self.candidates
    }

    fn skip_optional_word(&mut self, word: &str) {
        let checkpoint = self.base.pos();
        self.base.skip_whitespace();
        if self.base.expect_word_ci(word).is_none() {
            self.base.set_pos(checkpoint);
        }
    }

    /// Record the object name at the current position, if any.
    ///
    /// After FROM/JOIN a name followed by `(` is a table-valued function call,
    /// unless the group opens with a table hint.
    fn scan_table_target(&mut self, reject_function_call: bool) {
        self.base.skip_whitespace();
        let Some(parts) = self.base.parse_multipart_name() else {
            return;
        };
        if reject_function_call && self.at_function_call() {
            return;
        }
        if let Some(candidate) = TableCandidate::from_parts(parts) {
            self.candidates.tables.push(candidate);
        }
    }

    /// Whether a `(` that is not a table-hint group follows. Does not move.
    fn at_function_call(&mut self) -> bool {
        let after_name = self.base.pos();
        self.base.skip_whitespace();
        let mut is_call = self.base.expect_token(&Token::LParen).is_some();
        if is_call {
            self.base.skip_whitespace();
            is_call = !matches!(
                self.base.current_token().map(|t| &t.token),
                Some(Token::Word(w)) if w.quote_style.is_none() && is_table_hint(&w.value)
            );
        }
        self.base.set_pos(after_name);
        is_call
    }

    /// Record the procedure after EXEC, skipping an `@rc =` return-code capture.
    ///
    /// `EXEC (@sql)` and `EXEC @proc_var` are dynamic and yield nothing.
    fn scan_procedure_target(&mut self) {
        self.base.skip_whitespace();
        let is_variable = matches!(
            self.base.current_token().map(|t| &t.token),
            Some(Token::Word(w)) if w.quote_style.is_none() && w.value.starts_with('@')
        );
        if is_variable {
            self.base.advance();
            self.base.skip_whitespace();
            if self.base.expect_token(&Token::Eq).is_none() {
                return;
            }
            self.base.skip_whitespace();
        }
        if let Some(parts) = self.base.parse_multipart_name() {
            self.candidates.procedures.push(parts);
        }
    }
}

/// Pattern scan for bodies the tokenizer rejects
fn scan_with_patterns(stripped_body: &str) -> Candidates {
    let mut candidates = Candidates::default();

    for caps in TABLE_REF_RE.captures_iter(stripped_body) {
        let (Some(trigger), Some(name)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let is_from = trigger.as_str().eq_ignore_ascii_case("FROM")
            || trigger.as_str().eq_ignore_ascii_case("JOIN");
        let is_call = caps.get(3).is_some()
            && !caps.get(4).is_some_and(|hint| is_table_hint(hint.as_str()));
        if is_from && is_call {
            continue;
        }
        if let Some(candidate) = TableCandidate::from_parts(split_name_parts(name.as_str())) {
            candidates.tables.push(candidate);
        }
    }

    for caps in PROC_CALL_RE.captures_iter(stripped_body) {
        if let Some(name) = caps.get(1) {
            candidates.procedures.push(split_name_parts(name.as_str()));
        }
    }

    candidates
}

/// Words that can appear in an object position without naming a table or procedure.
///
/// Expects an uppercase word.
pub(crate) fn is_sql_keyword(word: &str) -> bool {
    matches!(
        word,
        "SELECT"
            | "FROM"
            | "WHERE"
            | "AND"
            | "OR"
            | "NOT"
            | "NULL"
            | "IS"
            | "IN"
            | "AS"
            | "ON"
            | "JOIN"
            | "LEFT"
            | "RIGHT"
            | "INNER"
            | "OUTER"
            | "CROSS"
            | "FULL"
            | "APPLY"
            | "INSERT"
            | "INTO"
            | "VALUES"
            | "UPDATE"
            | "SET"
            | "DELETE"
            | "MERGE"
            | "USING"
            | "MATCHED"
            | "TRUNCATE"
            | "CREATE"
            | "ALTER"
            | "DROP"
            | "TABLE"
            | "VIEW"
            | "INDEX"
            | "PROCEDURE"
            | "PROC"
            | "FUNCTION"
            | "TRIGGER"
            | "STATISTICS"
            | "BEGIN"
            | "END"
            | "TRAN"
            | "TRANSACTION"
            | "COMMIT"
            | "ROLLBACK"
            | "IF"
            | "ELSE"
            | "WHILE"
            | "BREAK"
            | "CONTINUE"
            | "RETURN"
            | "DECLARE"
            | "CURSOR"
            | "OPEN"
            | "CLOSE"
            | "DEALLOCATE"
            | "WITH"
            | "INT"
            | "VARCHAR"
            | "NVARCHAR"
            | "CHAR"
            | "NCHAR"
            | "TEXT"
            | "NTEXT"
            | "BIT"
            | "TINYINT"
            | "SMALLINT"
            | "BIGINT"
            | "DECIMAL"
            | "NUMERIC"
            | "FLOAT"
            | "REAL"
            | "MONEY"
            | "DATE"
            | "TIME"
            | "DATETIME"
            | "DATETIME2"
            | "UNIQUEIDENTIFIER"
            | "VARBINARY"
            | "XML"
            | "PRIMARY"
            | "KEY"
            | "FOREIGN"
            | "REFERENCES"
            | "UNIQUE"
            | "CHECK"
            | "DEFAULT"
            | "CONSTRAINT"
            | "IDENTITY"
            | "NOCOUNT"
            | "COUNT"
            | "SUM"
            | "AVG"
            | "MIN"
            | "MAX"
            | "ISNULL"
            | "COALESCE"
            | "CAST"
            | "CONVERT"
            | "CASE"
            | "WHEN"
            | "THEN"
            | "EXEC"
            | "EXECUTE"
            | "GO"
            | "USE"
            | "DATABASE"
            | "SCHEMA"
            | "GRANT"
            | "REVOKE"
            | "DENY"
            | "ORDER"
            | "BY"
            | "GROUP"
            | "HAVING"
            | "DISTINCT"
            | "TOP"
            | "OFFSET"
            | "FETCH"
            | "NEXT"
            | "ROWS"
            | "ONLY"
            | "UNION"
            | "ALL"
            | "EXCEPT"
            | "INTERSECT"
            | "EXISTS"
            | "LIKE"
            | "BETWEEN"
            | "OUTPUT"
            | "INSERTED"
            | "DELETED"
            | "OPENQUERY"
            | "OPENROWSET"
            | "OPENXML"
            | "OPENJSON"
            | "SCOPE_IDENTITY"
    )
}
