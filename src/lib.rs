//! rust-sprocscan: stored-procedure extraction and classification for T-SQL dumps
//!
//! This library reads a database object-creation script, isolates every
//! `CREATE PROCEDURE`, parses its signature, analyzes its body and groups the
//! results into modules for downstream reporting.

pub mod analysis;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod parser;
pub mod util;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::analysis::ModuleAssigner;
use crate::collaborators::{load_optional, CallerXref, KnownTables};
use crate::config::ModuleRules;
use crate::model::{classify_blocks, AnalysisContext, ClassifiedProcedure};
use crate::output::{build_catalog, Catalog, SourceInfo, WrittenOutputs};
use crate::parser::{read_source, split_procedure_blocks, InputEncoding, SourceText};

pub use error::SprocScanError;

/// Default number of body lines kept in each procedure preview
pub const DEFAULT_PREVIEW_LINES: usize = 50;

/// Options for the `extract` run
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Path to the SQL dump
    pub input_path: PathBuf,
    /// Directory receiving `procedures.json` and `modules/`
    pub output_dir: PathBuf,
    pub known_tables_path: Option<PathBuf>,
    pub callers_path: Option<PathBuf>,
    /// TOML file replacing the built-in module rules
    pub rules_path: Option<PathBuf>,
    pub encoding: InputEncoding,
    pub preview_lines: usize,
    /// Worker threads; `None` uses rayon's global pool
    pub jobs: Option<usize>,
}

impl ExtractOptions {
    pub fn new(input_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_dir: output_dir.into(),
            known_tables_path: None,
            callers_path: None,
            rules_path: None,
            encoding: InputEncoding::Auto,
            preview_lines: DEFAULT_PREVIEW_LINES,
            jobs: None,
        }
    }
}

/// Options for the `show` run
#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub input_path: PathBuf,
    /// Bare or schema-qualified procedure name, matched case-insensitively
    pub name: String,
    pub known_tables_path: Option<PathBuf>,
    pub callers_path: Option<PathBuf>,
    pub rules_path: Option<PathBuf>,
    pub encoding: InputEncoding,
}

/// External inputs shared by every block
#[derive(Debug, Clone, Default)]
pub struct Collaborators {
    pub known_tables: Option<KnownTables>,
    pub callers: Option<CallerXref>,
    pub rules: ModuleRules,
}

impl Collaborators {
    /// Load collaborators. Missing or unusable collaborator files only warn;
    /// an explicitly supplied rules file must load.
    pub fn load(
        known_tables_path: Option<&Path>,
        callers_path: Option<&Path>,
        rules_path: Option<&Path>,
    ) -> Result<Self> {
        let rules = match rules_path {
            Some(path) => ModuleRules::load(path)?,
            None => ModuleRules::default(),
        };
        Ok(Self {
            known_tables: load_optional(known_tables_path, "known-table set", KnownTables::load),
            callers: load_optional(callers_path, "caller cross-reference", CallerXref::load),
            rules,
        })
    }
}

/// Run the whole pipeline over decoded source text.
///
/// Deterministic: the same source and collaborators always produce the
/// same catalog, whatever the worker count.
pub fn analyze_source<'a>(
    source: &'a SourceText,
    source_file: &str,
    collaborators: &Collaborators,
    preview_lines: usize,
    pool: Option<&rayon::ThreadPool>,
) -> Catalog<'a> {
    let split = split_procedure_blocks(&source.text);
    info!(
        "Found {} batches, {} procedure blocks",
        split.total_batches,
        split.blocks.len()
    );

    let assigner = ModuleAssigner::new(&collaborators.rules);
    let ctx = AnalysisContext {
        known_tables: collaborators.known_tables.as_ref(),
        callers: collaborators.callers.as_ref(),
        assigner: &assigner,
        preview_lines,
    };
    let result = classify_blocks(&split.blocks, &ctx, pool);

    let source_info = SourceInfo {
        source_file: source_file.to_string(),
        source_sha256: source.sha256.clone(),
        encoding: source.encoding.to_string(),
        total_batches: split.total_batches,
        procedure_blocks: split.blocks.len(),
        known_tables_loaded: collaborators.known_tables.is_some(),
        caller_xref_loaded: collaborators.callers.is_some(),
    };

    let catalog = build_catalog(
        result.procedures,
        result.parse_failures,
        result.degraded_signatures,
        source_info,
        &collaborators.rules,
    );
    info!(
        "Grouped {} procedures into {} modules",
        catalog.statistics.total_procedures, catalog.statistics.total_modules
    );
    catalog
}

fn build_pool(jobs: Option<usize>) -> Result<Option<rayon::ThreadPool>> {
    match jobs {
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(SprocScanError::from)?;
            Ok(Some(pool))
        }
        None => Ok(None),
    }
}

/// Extract, classify and write both outputs
pub fn run_extract(options: &ExtractOptions) -> Result<WrittenOutputs> {
    info!("Reading {}", options.input_path.display());
    let source = read_source(&options.input_path, options.encoding)?;

    let collaborators = Collaborators::load(
        options.known_tables_path.as_deref(),
        options.callers_path.as_deref(),
        options.rules_path.as_deref(),
    )?;
    let pool = build_pool(options.jobs)?;

    let mut catalog = analyze_source(
        &source,
        &options.input_path.display().to_string(),
        &collaborators,
        options.preview_lines,
        pool.as_ref(),
    );
    catalog.metadata.generated_at = Some(chrono::Utc::now().to_rfc3339());

    output::write_outputs(&catalog, &options.output_dir)
}

/// Whether a procedure matches a bare or schema-qualified name
fn matches_name(procedure: &ClassifiedProcedure<'_>, name: &str) -> bool {
    let (schema, bare) = parser::split_qualified_name(name, "");
    procedure.name().eq_ignore_ascii_case(&bare)
        && (schema.is_empty() || procedure.schema().eq_ignore_ascii_case(&schema))
}

/// Classify the dump and render every procedure with the given name as JSON
pub fn run_show(options: &ShowOptions) -> Result<String> {
    let source = read_source(&options.input_path, options.encoding)?;
    let collaborators = Collaborators::load(
        options.known_tables_path.as_deref(),
        options.callers_path.as_deref(),
        options.rules_path.as_deref(),
    )?;

    let catalog = analyze_source(
        &source,
        &options.input_path.display().to_string(),
        &collaborators,
        usize::MAX,
        None,
    );
    let matches: Vec<&ClassifiedProcedure> = catalog
        .procedures()
        .filter(|p| matches_name(p, &options.name))
        .collect();
    info!("{} procedures named {}", matches.len(), options.name);

    output::render_procedures(&matches)
}
