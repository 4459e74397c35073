//! Module assignment by naming convention.
//!
//! Strategy chain, first success wins:
//! 1. prefix of the procedure name
//! 2. module hint from the caller cross-reference
//! 3. most frequent prefix among referenced tables
//! 4. [`UNCATEGORIZED`]

use crate::config::{ModuleRules, UNCATEGORIZED};

/// Which strategy produced a module assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentSource {
    NamePrefix,
    CrossReference,
    TableMajority,
    Uncategorized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: String,
    pub source: AssignmentSource,
}

/// Prefix matcher compiled from [`ModuleRules`]
#[derive(Debug, Clone)]
pub struct ModuleAssigner {
    /// (uppercase prefix or alias, canonical code), longest first
    candidates: Vec<(String, String)>,
    /// uppercase alias -> canonical code
    aliases: Vec<(String, String)>,
}

impl ModuleAssigner {
    pub fn new(rules: &ModuleRules) -> Self {
        let aliases: Vec<(String, String)> = rules
            .aliases
            .iter()
            .map(|(alias, code)| (alias.to_ascii_uppercase(), code.to_ascii_uppercase()))
            .collect();

        let mut candidates: Vec<(String, String)> = rules
            .prefixes
            .iter()
            .map(|p| (p.to_ascii_uppercase(), p.to_ascii_uppercase()))
            .chain(aliases.iter().cloned())
            .filter(|(key, _)| !key.is_empty())
            .collect();
        // Stable: equal lengths keep configured priority
        candidates.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            candidates,
            aliases,
        }
    }

    /// Canonical module code for a name's prefix, if one is recognized.
    ///
    /// The prefix must be followed by the end of the name, `_`, a digit, or the
    /// start of a capitalized word (`SECSaveUser`, `secSave`). So neither
    /// `Secret` nor `SECRET_Get` matches `SEC`.
    pub fn detect_prefix(&self, name: &str) -> Option<&str> {
        let upper = name.to_ascii_uppercase();
        self.candidates.iter().find_map(|(key, code)| {
            if !upper.starts_with(key.as_str()) {
                return None;
            }
            let prefix_ends_lower = name[..key.len()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_lowercase());
            let mut rest = name[key.len()..].chars();
            let at_boundary = match (rest.next(), rest.next()) {
                (None, _) => true,
                (Some(c), _) if c == '_' || c.is_ascii_digit() => true,
                (Some(c), after) if c.is_uppercase() => {
                    prefix_ends_lower || after.is_some_and(|a| a.is_lowercase())
                }
                _ => false,
            };
            at_boundary.then_some(code.as_str())
        })
    }

    /// Normalize a free-form module hint through the alias table
    pub fn normalize(&self, hint: &str) -> String {
        let upper = hint.trim().to_ascii_uppercase();
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == upper)
            .map(|(_, code)| code.clone())
            .unwrap_or(upper)
    }

    /// Assign a module to a procedure.
    ///
    /// Table-majority ties go to the prefix encountered first in `tables`
    /// order, which is sorted, so results are deterministic.
    pub fn assign(&self, name: &str, tables: &[String], xref_hint: Option<&str>) -> Assignment {
        if let Some(code) = self.detect_prefix(name) {
            return Assignment {
                key: code.to_string(),
                source: AssignmentSource::NamePrefix,
            };
        }

        if let Some(hint) = xref_hint.filter(|h| !h.trim().is_empty()) {
            return Assignment {
                key: self.normalize(hint),
                source: AssignmentSource::CrossReference,
            };
        }

        let mut votes: Vec<(&str, usize)> = Vec::new();
        for code in tables.iter().filter_map(|t| self.detect_prefix(t)) {
            match votes.iter_mut().find(|(c, _)| *c == code) {
                Some((_, count)) => *count += 1,
                None => votes.push((code, 1)),
            }
        }
        let mut winner: Option<(&str, usize)> = None;
        for (code, count) in votes {
            if winner.map_or(true, |(_, best)| count > best) {
                winner = Some((code, count));
            }
        }
        if let Some((code, _)) = winner {
            return Assignment {
                key: code.to_string(),
                source: AssignmentSource::TableMajority,
            };
        }

        Assignment {
            key: UNCATEGORIZED.to_string(),
            source: AssignmentSource::Uncategorized,
        }
    }
}
