//! Known-table-name set supplied by the schema extractor.
//!
//! Accepted file shapes:
//! - JSON array of names: `["Users", "dbo.Orders"]`
//! - JSON object with a table list: `{"tables": [{"schema": "dbo", "name": "Users"}]}`
//! - Plain text, one name per line (`#` and `--` lines are comments)

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::info;

use crate::error::SprocScanError;
use crate::parser::{split_qualified_name, DEFAULT_SCHEMA};

#[derive(Deserialize)]
#[serde(untagged)]
enum KnownTablesFile {
    Names(Vec<String>),
    Catalog { tables: Vec<TableEntry> },
}

#[derive(Deserialize)]
struct TableEntry {
    name: String,
}

/// Case-insensitive set of bare table names
#[derive(Debug, Clone, Default)]
pub struct KnownTables {
    /// lowercase name -> spelling as supplied
    by_lower: HashMap<String, String>,
}

impl KnownTables {
    /// Build from names; schema qualifiers are dropped. The first spelling wins.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_lower = HashMap::new();
        for name in names {
            let (_, table) = split_qualified_name(name.as_ref(), DEFAULT_SCHEMA);
            if table.is_empty() {
                continue;
            }
            by_lower.entry(table.to_lowercase()).or_insert(table);
        }
        Self { by_lower }
    }

    /// Load from a JSON or plain-text file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SprocScanError::CollaboratorReadError {
                path: path.to_path_buf(),
                source: e,
            })?;
        let tables = Self::parse(&content).map_err(|message| {
            SprocScanError::CollaboratorParseError {
                path: path.to_path_buf(),
                message,
            }
        })?;
        info!(
            "Loaded {} known table names from {}",
            tables.len(),
            path.display()
        );
        Ok(tables)
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let trimmed = content.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            let file: KnownTablesFile =
                serde_json::from_str(trimmed).map_err(|e| e.to_string())?;
            return Ok(match file {
                KnownTablesFile::Names(names) => Self::from_names(names),
                KnownTablesFile::Catalog { tables } => {
                    Self::from_names(tables.into_iter().map(|t| t.name))
                }
            });
        }

        Ok(Self::from_names(trimmed.lines().map(str::trim).filter(
            |line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("--"),
        )))
    }

    /// The known spelling of `name`, matched case-insensitively
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.by_lower.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lower.is_empty()
    }
}
