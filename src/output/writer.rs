//! JSON rendering and output files
//!
//! Two documents are produced:
//! - `procedures.json`: metadata, statistics and every module with procedure
//!   summaries (body replaced by a bounded preview)
//! - `modules/<key>.json`: one per module with the full body of each procedure

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::SprocScanError;
use crate::model::{AntiPatternProfile, ClassifiedProcedure, Complexity, CrudType, Module};
use crate::parser::Parameter;

use super::catalog::{Catalog, ExportMetadata, Statistics};

/// Name of the aggregate document inside the output directory
pub const CATALOG_FILE: &str = "procedures.json";
/// Subdirectory holding the per-module body documents
pub const MODULES_DIR: &str = "modules";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcedureSummary<'r> {
    schema: &'r str,
    name: &'r str,
    full_name: String,
    parameters: &'r [Parameter],
    line_count: usize,
    body_preview: &'r str,
    tables_referenced: &'r [String],
    sprocs_called: &'r [String],
    crud_type: CrudType,
    anti_patterns: &'r AntiPatternProfile,
    complexity: Complexity,
    #[serde(skip_serializing_if = "Option::is_none")]
    called_from_code: Option<&'r [String]>,
}

impl<'r> ProcedureSummary<'r> {
    fn new(p: &'r ClassifiedProcedure<'_>) -> Self {
        Self {
            schema: p.schema(),
            name: p.name(),
            full_name: p.procedure.full_name(),
            parameters: &p.procedure.parameters,
            line_count: p.line_count,
            body_preview: &p.body_preview,
            tables_referenced: &p.tables_referenced,
            sprocs_called: &p.sprocs_called,
            crud_type: p.crud_type,
            anti_patterns: &p.anti_patterns,
            complexity: p.complexity,
            called_from_code: p.called_from_code.as_deref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleSummary<'r> {
    key: &'r str,
    display_name: &'r str,
    procedure_count: usize,
    procedures: Vec<ProcedureSummary<'r>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument<'r> {
    export_metadata: &'r ExportMetadata,
    statistics: &'r Statistics,
    modules: Vec<ModuleSummary<'r>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcedureBody<'r> {
    schema: &'r str,
    name: &'r str,
    full_name: String,
    parameters: &'r [Parameter],
    crud_type: CrudType,
    complexity: Complexity,
    body: &'r str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleBodies<'r> {
    key: &'r str,
    display_name: &'r str,
    procedures: Vec<ProcedureBody<'r>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowRecord<'r> {
    module: &'r str,
    start_line: usize,
    #[serde(flatten)]
    summary: ProcedureSummary<'r>,
    body: &'r str,
}

/// Render the aggregate document
pub fn render_catalog(catalog: &Catalog<'_>) -> Result<String> {
    let document = CatalogDocument {
        export_metadata: &catalog.metadata,
        statistics: &catalog.statistics,
        modules: catalog
            .modules
            .iter()
            .map(|m| ModuleSummary {
                key: &m.key,
                display_name: &m.display_name,
                procedure_count: m.procedures.len(),
                procedures: m.procedures.iter().map(ProcedureSummary::new).collect(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document).map_err(SprocScanError::from)?)
}

/// Render one module's full-body document
pub fn render_module_bodies(module: &Module<'_>) -> Result<String> {
    let document = ModuleBodies {
        key: &module.key,
        display_name: &module.display_name,
        procedures: module
            .procedures
            .iter()
            .map(|p| ProcedureBody {
                schema: p.schema(),
                name: p.name(),
                full_name: p.procedure.full_name(),
                parameters: &p.procedure.parameters,
                crud_type: p.crud_type,
                complexity: p.complexity,
                body: p.procedure.body,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document).map_err(SprocScanError::from)?)
}

/// Render full records for the given procedures (used by `show`)
pub fn render_procedures(procedures: &[&ClassifiedProcedure<'_>]) -> Result<String> {
    let records: Vec<ShowRecord> = procedures
        .iter()
        .map(|p| ShowRecord {
            module: &p.module,
            start_line: p.start_line,
            summary: ProcedureSummary::new(p),
            body: p.procedure.body,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records).map_err(SprocScanError::from)?)
}

/// File-system-safe name for a module key: `(uncategorized)` -> `uncategorized`
pub fn module_file_stem(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = sanitized.trim_matches('_');
    if trimmed.is_empty() {
        "module".to_string()
    } else {
        trimmed.to_string()
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let to_error = |e| SprocScanError::OutputWriteError {
        path: path.to_path_buf(),
        source: e,
    };
    let file = File::create(path).map_err(to_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes()).map_err(to_error)?;
    writer.write_all(b"\n").map_err(to_error)?;
    writer.flush().map_err(to_error)?;
    Ok(())
}

/// Paths of the files written for one catalog
#[derive(Debug, Clone)]
pub struct WrittenOutputs {
    pub catalog: PathBuf,
    pub modules: Vec<PathBuf>,
}

/// Write the aggregate document and one body document per module
pub fn write_outputs(catalog: &Catalog<'_>, output_dir: &Path) -> Result<WrittenOutputs> {
    let modules_dir = output_dir.join(MODULES_DIR);
    std::fs::create_dir_all(&modules_dir).map_err(|e| SprocScanError::OutputWriteError {
        path: modules_dir.clone(),
        source: e,
    })?;

    let catalog_path = output_dir.join(CATALOG_FILE);
    write_file(&catalog_path, &render_catalog(catalog)?)?;
    info!("Wrote {}", catalog_path.display());

    let mut used_stems = HashSet::new();
    let mut module_paths = Vec::with_capacity(catalog.modules.len());
    for module in &catalog.modules {
        let base = module_file_stem(&module.key);
        let mut stem = base.clone();
        let mut n = 2;
        while !used_stems.insert(stem.to_lowercase()) {
            stem = format!("{base}_{n}");
            n += 1;
        }

        let path = modules_dir.join(format!("{stem}.json"));
        write_file(&path, &render_module_bodies(module)?)?;
        debug!(
            "Wrote {} ({} procedures)",
            path.display(),
            module.procedures.len()
        );
        module_paths.push(path);
    }
    info!(
        "Wrote {} module files to {}",
        module_paths.len(),
        modules_dir.display()
    );

    Ok(WrittenOutputs {
        catalog: catalog_path,
        modules: module_paths,
    })
}
