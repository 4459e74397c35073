//! External collaborator inputs
//!
//! Both collaborators are optional. A missing or unreadable file degrades the
//! pipeline with a warning instead of failing it.

mod caller_xref;
mod known_tables;

use std::path::Path;

use anyhow::Result;
use tracing::warn;

pub use caller_xref::{CallerSite, CallerXref};
pub use known_tables::KnownTables;

/// Load an optional collaborator, logging a warning when it is absent or unusable
pub fn load_optional<T>(
    path: Option<&Path>,
    what: &str,
    loader: impl FnOnce(&Path) -> Result<T>,
) -> Option<T> {
    let Some(path) = path else {
        warn!("No {what} supplied; continuing without it");
        return None;
    };
    match loader(path) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {what} at {}: {e:#}", path.display());
            None
        }
    }
}
