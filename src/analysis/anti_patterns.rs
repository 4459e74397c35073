//! Anti-pattern detection over comment-stripped procedure bodies.
//!
//! Each detector is an independent pattern; none excludes another.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::AntiPatternProfile;

/// `DECLARE c CURSOR`, `DECLARE @c CURSOR`, `DECLARE c SCROLL CURSOR`, or a cursor fetch.
///
/// `OFFSET ... FETCH NEXT n ROWS` paging is not a cursor and does not match.
static CURSOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bDECLARE\s+@?\w+\s+(?:INSENSITIVE\s+|SCROLL\s+)*CURSOR\b|\bFETCH\s+NEXT\s+FROM\b",
    )
    .unwrap()
});

static SELECT_STAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bSELECT\s+(?:DISTINCT\s+|TOP\s*\(?\s*\d+\s*\)?\s*(?:PERCENT\s+)?)*\*").unwrap()
});

static DYNAMIC_SQL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bEXEC(?:UTE)?\s*\(|\bsp_executesql\b").unwrap());

/// A NOLOCK table hint, alone or within a hint list: `(NOLOCK)`, `(NOLOCK, INDEX(ix))`
static NOLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(\s*(?:\w+\s*,\s*)*NOLOCK\s*[,)]").unwrap());

static NOCOUNT_ON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSET\s+NOCOUNT\s+ON\b").unwrap());

static TABLE_VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bDECLARE\s+@\w+\s+(?:AS\s+)?TABLE\b").unwrap());

/// `CREATE TABLE #x` or `... INTO #x`
static TEMP_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCREATE\s+TABLE\s+#|\bINTO\s+#").unwrap());

static WHILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bWHILE\b").unwrap());

static BEGIN_TRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bBEGIN\s+TRY\b").unwrap());

/// Evaluate every detector against a comment-stripped body
pub fn detect_anti_patterns(stripped_body: &str) -> AntiPatternProfile {
    let nolock_count = NOLOCK_RE.find_iter(stripped_body).count();

    AntiPatternProfile {
        has_cursor: CURSOR_RE.is_match(stripped_body),
        has_select_star: SELECT_STAR_RE.is_match(stripped_body),
        has_dynamic_sql: DYNAMIC_SQL_RE.is_match(stripped_body),
        has_nolock: nolock_count > 0,
        nolock_count,
        missing_nocount: !NOCOUNT_ON_RE.is_match(stripped_body),
        has_table_variable: TABLE_VARIABLE_RE.is_match(stripped_body),
        has_temp_table: TEMP_TABLE_RE.is_match(stripped_body),
        has_while_loop: WHILE_RE.is_match(stripped_body),
        no_try_catch: !BEGIN_TRY_RE.is_match(stripped_body),
    }
}
