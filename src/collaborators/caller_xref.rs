//! Application-code caller cross-reference.
//!
//! A JSON object keyed by procedure name (optionally schema-qualified):
//!
//! ```json
//! {
//!   "SEC_SaveUser": {
//!     "callers": [
//!       {"callingFile": "UserService.cs", "callingMethod": "Save", "callingProject": "Web"}
//!     ],
//!     "module": "SEC"
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::info;

use crate::error::SprocScanError;
use crate::parser::{split_qualified_name, DEFAULT_SCHEMA};

/// One application call site
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallerSite {
    #[serde(alias = "callingFile")]
    pub file: String,
    #[serde(alias = "callingMethod")]
    pub method: String,
    #[serde(alias = "callingProject", default)]
    pub project: String,
}

impl CallerSite {
    /// `file::method [project]`
    pub fn display(&self) -> String {
        if self.project.is_empty() {
            format!("{}::{}", self.file, self.method)
        } else {
            format!("{}::{} [{}]", self.file, self.method, self.project)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CallerEntry {
    #[serde(default)]
    callers: Vec<CallerSite>,
    #[serde(default)]
    module: Option<String>,
}

/// Caller lists and module hints keyed by bare procedure name (case-insensitive)
#[derive(Debug, Clone, Default)]
pub struct CallerXref {
    by_lower: HashMap<String, CallerEntry>,
}

impl CallerXref {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SprocScanError::CollaboratorReadError {
                path: path.to_path_buf(),
                source: e,
            })?;
        let xref = Self::from_json_str(&content).map_err(|e| {
            SprocScanError::CollaboratorParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        info!(
            "Loaded caller cross-reference for {} procedures from {}",
            xref.len(),
            path.display()
        );
        Ok(xref)
    }

    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        let raw: BTreeMap<String, CallerEntry> =
            serde_json::from_str(content.trim_start_matches('\u{feff}'))?;

        let mut by_lower: HashMap<String, CallerEntry> = HashMap::with_capacity(raw.len());
        for (key, entry) in raw {
            let (_, name) = split_qualified_name(&key, DEFAULT_SCHEMA);
            let merged = by_lower.entry(name.to_lowercase()).or_default();
            merged.callers.extend(entry.callers);
            if merged.module.is_none() {
                merged.module = entry.module.filter(|m| !m.trim().is_empty());
            }
        }
        Ok(Self { by_lower })
    }

    /// Sorted, deduplicated call-site strings for a procedure.
    ///
    /// Empty when the procedure has no entry.
    pub fn callers_for(&self, procedure: &str) -> Vec<String> {
        let mut sites: Vec<String> = self
            .by_lower
            .get(&procedure.to_lowercase())
            .map(|entry| entry.callers.iter().map(CallerSite::display).collect())
            .unwrap_or_default();
        sites.sort();
        sites.dedup();
        sites
    }

    /// Module hint supplied for a procedure, if any
    pub fn module_hint(&self, procedure: &str) -> Option<&str> {
        self.by_lower
            .get(&procedure.to_lowercase())
            .and_then(|entry| entry.module.as_deref())
    }

    pub fn len(&self) -> usize {
        self.by_lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_lower.is_empty()
    }
}
