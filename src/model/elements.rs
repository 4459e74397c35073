//! Per-procedure analysis records

use serde::Serialize;

use crate::parser::ParsedProcedure;

/// Structural risk indicators found in a procedure body.
///
/// Every field is derived independently from the same comment-stripped body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiPatternProfile {
    pub has_cursor: bool,
    pub has_select_star: bool,
    pub has_dynamic_sql: bool,
    pub has_nolock: bool,
    pub nolock_count: usize,
    pub missing_nocount: bool,
    pub has_table_variable: bool,
    pub has_temp_table: bool,
    pub has_while_loop: bool,
    pub no_try_catch: bool,
}

impl AntiPatternProfile {
    /// Number of severity-relevant indicators present.
    ///
    /// Only cursor, `SELECT *`, dynamic SQL, NOLOCK, `WHILE` and temp tables
    /// count; the NOCOUNT, table-variable and TRY/CATCH indicators are style
    /// findings and do not raise complexity.
    pub fn severity_count(&self) -> usize {
        [
            self.has_cursor,
            self.has_select_star,
            self.has_dynamic_sql,
            self.has_nolock,
            self.has_while_loop,
            self.has_temp_table,
        ]
        .into_iter()
        .filter(|&flag| flag)
        .count()
    }
}

/// Coarse semantic classification of a procedure's primary effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrudType {
    Get,
    Insert,
    Update,
    Delete,
    Report,
    Mixed,
}

impl CrudType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudType::Get => "get",
            CrudType::Insert => "insert",
            CrudType::Update => "update",
            CrudType::Delete => "delete",
            CrudType::Report => "report",
            CrudType::Mixed => "mixed",
        }
    }
}

/// Complexity tier, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Complexity {
    Trivial,
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Trivial => "trivial",
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
            Complexity::VeryComplex => "very-complex",
        }
    }
}

/// A parsed procedure with everything derived from its body
#[derive(Debug, Clone)]
pub struct ClassifiedProcedure<'a> {
    pub procedure: ParsedProcedure<'a>,
    /// 1-based line of the block start in the dump
    pub start_line: usize,
    pub line_count: usize,
    /// First lines of the body, bounded for rendering
    pub body_preview: String,
    /// Sorted, deduplicated bare table names
    pub tables_referenced: Vec<String>,
    /// Sorted, deduplicated bare procedure names (no self-calls or system procedures)
    pub sprocs_called: Vec<String>,
    pub crud_type: CrudType,
    pub anti_patterns: AntiPatternProfile,
    pub complexity: Complexity,
    /// Application call sites, present only when a cross-reference was supplied
    pub called_from_code: Option<Vec<String>>,
    /// Canonical module key
    pub module: String,
}

impl ClassifiedProcedure<'_> {
    pub fn name(&self) -> &str {
        &self.procedure.name
    }

    pub fn schema(&self) -> &str {
        &self.procedure.schema
    }
}

/// A logical grouping of procedures sharing a naming convention
#[derive(Debug, Clone)]
pub struct Module<'a> {
    pub key: String,
    pub display_name: String,
    /// Sorted by procedure name, then schema
    pub procedures: Vec<ClassifiedProcedure<'a>>,
}
