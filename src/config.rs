//! Module assignment rules.
//!
//! The prefix list, alias map and display-name map are immutable data loaded
//! once per run: compiled-in defaults, optionally replaced by a TOML file.
//!
//! ```toml
//! prefixes = ["APE2", "APE", "SEC"]
//!
//! [aliases]
//! SECURITY = "SEC"
//!
//! [display_names]
//! SEC = "Security"
//! ```
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SprocScanError;

/// Module key for procedures no strategy could place
pub const UNCATEGORIZED: &str = "(uncategorized)";

// ── Default value functions ──────────────────────────────────────────

fn default_prefixes() -> Vec<String> {
    [
        "APE2", "APE", "SEC", "EVAL", "ADM", "RPT", "HR", "FIN", "INV", "CRM", "SYS", "WF", "LOG",
        "CFG", "ACC", "PAY",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_aliases() -> BTreeMap<String, String> {
    [
        ("APE_2", "APE2"),
        ("SECURITY", "SEC"),
        ("SECU", "SEC"),
        ("EVALUATION", "EVAL"),
        ("EVL", "EVAL"),
        ("ADMIN", "ADM"),
        ("REPORT", "RPT"),
        ("REP", "RPT"),
        ("FINANCE", "FIN"),
        ("INVENTORY", "INV"),
        ("WORKFLOW", "WF"),
        ("CONFIG", "CFG"),
        ("ACCT", "ACC"),
        ("PAYROLL", "PAY"),
    ]
    .iter()
    .map(|(alias, code)| (alias.to_string(), code.to_string()))
    .collect()
}

fn default_display_names() -> BTreeMap<String, String> {
    [
        ("APE2", "Appraisal v2"),
        ("APE", "Appraisal"),
        ("SEC", "Security"),
        ("EVAL", "Evaluation"),
        ("ADM", "Administration"),
        ("RPT", "Reporting"),
        ("HR", "Human Resources"),
        ("FIN", "Finance"),
        ("INV", "Inventory"),
        ("CRM", "Customer Relations"),
        ("SYS", "System"),
        ("WF", "Workflow"),
        ("LOG", "Logging"),
        ("CFG", "Configuration"),
        ("ACC", "Accounting"),
        ("PAY", "Payroll"),
    ]
    .iter()
    .map(|(code, name)| (code.to_string(), name.to_string()))
    .collect()
}

// ── Rules ────────────────────────────────────────────────────────────

/// Prefix, alias and display-name tables used by the module assigner
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ModuleRules {
    /// Canonical module codes
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,

    /// Spelling variant -> canonical code
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,

    /// Canonical code -> human-readable name
    #[serde(default = "default_display_names")]
    pub display_names: BTreeMap<String, String>,
}

impl Default for ModuleRules {
    fn default() -> Self {
        Self {
            prefixes: default_prefixes(),
            aliases: default_aliases(),
            display_names: default_display_names(),
        }
    }
}

impl ModuleRules {
    /// Load rules from a TOML file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| SprocScanError::RulesReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let rules: ModuleRules =
            toml::from_str(&data).map_err(|e| SprocScanError::RulesParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        info!(
            "Loaded module rules from {} ({} prefixes, {} aliases)",
            path.display(),
            rules.prefixes.len(),
            rules.aliases.len()
        );
        Ok(rules)
    }

    /// Human-readable name for a module key, falling back to the key itself
    pub fn display_name(&self, key: &str) -> String {
        if key == UNCATEGORIZED {
            return "Uncategorized".to_string();
        }
        self.display_names
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
