//! CRUD-intent and complexity classification.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{AntiPatternProfile, Complexity, CrudType};

/// Name rules in priority order; the first matching rule wins.
///
/// Rules match whole words of the name as split by [`name_words`], so a
/// verb may sit anywhere in the name (`GetMonthlyReport`, `APE2GetForms`).
static CRUD_NAME_RULES: LazyLock<Vec<(CrudType, Regex)>> = LazyLock::new(|| {
    [
        (CrudType::Report, "rpt|report|summary|dashboard|statistics?|stats"),
        (
            CrudType::Get,
            "get|select|sel|list|find|search|fetch|load|read|lookup|check|exists|retrieve",
        ),
        (CrudType::Insert, "insert|ins|add|create|new"),
        (CrudType::Update, "update|upd|set|modify|edit|change"),
        (CrudType::Delete, "delete|del|remove|purge|clear"),
        (CrudType::Mixed, "save|upsert|merge|sync|process|import"),
    ]
    .into_iter()
    .map(|(crud, verbs)| {
        let pattern = format!(r"(?i)(?:^|_)(?:{verbs})(?:_|$)");
        (crud, Regex::new(&pattern).unwrap())
    })
    .collect()
});

/// Split a procedure name into `_`-joined words.
///
/// Breaks on underscores, lowercase to uppercase (`GetUser`), the end of an
/// acronym (`XMLReport`), and letter/digit changes (`APE2Get`).
fn name_words(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words = String::with_capacity(name.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c != '_' && chars[i - 1] != '_' {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_uppercase() && c.is_uppercase() && next_is_lower)
                || (prev.is_ascii_digit() != c.is_ascii_digit());
            if boundary {
                words.push('_');
            }
        }
        words.push(c);
    }
    words
}

static SELECT_FROM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bSELECT\b.*?\bFROM\b").unwrap());

static GROUP_BY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bGROUP\s+BY\b").unwrap());

static MERGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bMERGE\s+(?:INTO\s+)?[\[A-Za-z_]").unwrap());

// Mutation targets start with a bracket or a letter, so #temp and @table
// variables never count. The captured word guards against backtracking onto
// the INTO/FROM keyword itself and against MERGE's `UPDATE SET`.
static INSERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bINSERT\s+(?:INTO\s+)?(\[|[A-Za-z_]\w*)").unwrap()
});

static UPDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bUPDATE\s+(\[|[A-Za-z_]\w*)").unwrap());

static DELETE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bDELETE\s+(?:FROM\s+)?(\[|[A-Za-z_]\w*)").unwrap()
});

fn has_mutation(re: &Regex, body: &str, not_targets: &[&str]) -> bool {
    re.captures_iter(body).any(|caps| {
        caps.get(1).is_some_and(|target| {
            !not_targets
                .iter()
                .any(|w| target.as_str().eq_ignore_ascii_case(w))
        })
    })
}

/// CRUD type from the first matching name rule
pub fn crud_from_name(name: &str) -> Option<CrudType> {
    let words = name_words(name);
    CRUD_NAME_RULES
        .iter()
        .find(|(_, re)| re.is_match(&words))
        .map(|(crud, _)| *crud)
}

/// CRUD type from body statements (comment-stripped)
pub fn crud_from_body(stripped_body: &str) -> CrudType {
    let has_select = SELECT_FROM_RE.is_match(stripped_body);
    let has_group_by = GROUP_BY_RE.is_match(stripped_body);
    let has_merge = MERGE_RE.is_match(stripped_body);

    let mutations: Vec<CrudType> = [
        (CrudType::Insert, has_mutation(&INSERT_RE, stripped_body, &["INTO"])),
        (CrudType::Update, has_mutation(&UPDATE_RE, stripped_body, &["SET", "STATISTICS"])),
        (CrudType::Delete, has_mutation(&DELETE_RE, stripped_body, &["FROM", "WHERE"])),
    ]
    .into_iter()
    .filter_map(|(crud, present)| present.then_some(crud))
    .collect();

    if has_group_by && has_select && mutations.is_empty() && !has_merge {
        return CrudType::Report;
    }
    if has_merge || mutations.len() >= 2 {
        return CrudType::Mixed;
    }
    if let [single] = mutations.as_slice() {
        return *single;
    }
    if has_select {
        return CrudType::Get;
    }
    CrudType::Mixed
}

/// Name rules first, body analysis as the fallback
pub fn classify_crud(name: &str, stripped_body: &str) -> CrudType {
    crud_from_name(name).unwrap_or_else(|| crud_from_body(stripped_body))
}

/// Complexity tier; thresholds are checked from the highest tier down.
pub fn classify_complexity(
    line_count: usize,
    table_count: usize,
    anti_patterns: &AntiPatternProfile,
) -> Complexity {
    let density = anti_patterns.severity_count();

    if line_count >= 500 || (table_count >= 8 && density >= 2) {
        Complexity::VeryComplex
    } else if line_count >= 150
        || table_count >= 5
        || anti_patterns.has_cursor
        || anti_patterns.has_dynamic_sql
    {
        Complexity::Complex
    } else if line_count >= 50 || table_count >= 3 {
        Complexity::Moderate
    } else if line_count >= 20 || table_count >= 2 {
        Complexity::Simple
    } else {
        Complexity::Trivial
    }
}
