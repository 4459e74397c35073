//! Aggregation of classified procedures into modules and global statistics

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{ModuleRules, UNCATEGORIZED};
use crate::model::{ClassifiedProcedure, Module};

/// Facts about the input run, recorded in the export metadata
#[derive(Debug, Clone, Default)]
pub struct SourceInfo {
    pub source_file: String,
    pub source_sha256: String,
    pub encoding: String,
    pub total_batches: usize,
    pub procedure_blocks: usize,
    pub known_tables_loaded: bool,
    pub caller_xref_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub source_file: String,
    pub source_sha256: String,
    pub encoding: String,
    /// Set when the catalog is written, so building stays deterministic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub tool_version: String,
    pub total_batches: usize,
    pub procedure_blocks: usize,
    pub parsed_procedures: usize,
    pub parse_failures: usize,
    pub known_tables_loaded: bool,
    pub caller_xref_loaded: bool,
}

/// Number of procedures showing each anti-pattern
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiPatternStats {
    pub cursor: usize,
    pub select_star: usize,
    pub dynamic_sql: usize,
    pub nolock: usize,
    /// Total NOLOCK hints across all procedures
    pub nolock_hints: usize,
    pub missing_nocount: usize,
    pub table_variable: usize,
    pub temp_table: usize,
    pub while_loop: usize,
    pub no_try_catch: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_procedures: usize,
    pub total_modules: usize,
    pub parse_failures: usize,
    pub degraded_signatures: usize,
    pub by_schema: BTreeMap<String, usize>,
    pub by_crud_type: BTreeMap<String, usize>,
    pub by_complexity: BTreeMap<String, usize>,
    pub by_module: BTreeMap<String, usize>,
    pub anti_patterns: AntiPatternStats,
}

/// The complete result of one run
#[derive(Debug, Clone)]
pub struct Catalog<'a> {
    pub metadata: ExportMetadata,
    pub statistics: Statistics,
    /// Sorted by key, with the uncategorized module last
    pub modules: Vec<Module<'a>>,
}

impl<'a> Catalog<'a> {
    /// All procedures across modules, in output order
    pub fn procedures(&self) -> impl Iterator<Item = &ClassifiedProcedure<'a>> {
        self.modules.iter().flat_map(|m| m.procedures.iter())
    }

    pub fn total_procedures(&self) -> usize {
        self.statistics.total_procedures
    }
}

fn compute_statistics(procedures: &[ClassifiedProcedure<'_>]) -> Statistics {
    let mut stats = Statistics {
        total_procedures: procedures.len(),
        ..Default::default()
    };

    for p in procedures {
        *stats.by_schema.entry(p.schema().to_string()).or_default() += 1;
        *stats
            .by_crud_type
            .entry(p.crud_type.as_str().to_string())
            .or_default() += 1;
        *stats
            .by_complexity
            .entry(p.complexity.as_str().to_string())
            .or_default() += 1;
        *stats.by_module.entry(p.module.clone()).or_default() += 1;

        let ap = &p.anti_patterns;
        let counts = &mut stats.anti_patterns;
        counts.cursor += usize::from(ap.has_cursor);
        counts.select_star += usize::from(ap.has_select_star);
        counts.dynamic_sql += usize::from(ap.has_dynamic_sql);
        counts.nolock += usize::from(ap.has_nolock);
        counts.nolock_hints += ap.nolock_count;
        counts.missing_nocount += usize::from(ap.missing_nocount);
        counts.table_variable += usize::from(ap.has_table_variable);
        counts.temp_table += usize::from(ap.has_temp_table);
        counts.while_loop += usize::from(ap.has_while_loop);
        counts.no_try_catch += usize::from(ap.no_try_catch);
    }

    stats.total_modules = stats.by_module.len();
    stats
}

/// Group procedures into modules and compute statistics.
///
/// Pure: the same procedures produce the same catalog, independent of
/// their input order.
pub fn build_catalog<'a>(
    procedures: Vec<ClassifiedProcedure<'a>>,
    parse_failures: usize,
    degraded_signatures: usize,
    source: SourceInfo,
    rules: &ModuleRules,
) -> Catalog<'a> {
    let mut statistics = compute_statistics(&procedures);
    statistics.parse_failures = parse_failures;
    statistics.degraded_signatures = degraded_signatures;

    let metadata = ExportMetadata {
        source_file: source.source_file,
        source_sha256: source.source_sha256,
        encoding: source.encoding,
        generated_at: None,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        total_batches: source.total_batches,
        procedure_blocks: source.procedure_blocks,
        parsed_procedures: procedures.len(),
        parse_failures,
        known_tables_loaded: source.known_tables_loaded,
        caller_xref_loaded: source.caller_xref_loaded,
    };

    let mut grouped: BTreeMap<String, Vec<ClassifiedProcedure<'a>>> = BTreeMap::new();
    for procedure in procedures {
        grouped
            .entry(procedure.module.clone())
            .or_default()
            .push(procedure);
    }

    let mut modules: Vec<Module<'a>> = grouped
        .into_iter()
        .map(|(key, mut procedures)| {
            procedures.sort_by(|a, b| {
                a.name()
                    .cmp(b.name())
                    .then_with(|| a.schema().cmp(b.schema()))
                    .then_with(|| a.start_line.cmp(&b.start_line))
            });
            Module {
                display_name: rules.display_name(&key),
                key,
                procedures,
            }
        })
        .collect();
    // Stable: keeps the remaining modules in key order
    modules.sort_by_key(|m| m.key == UNCATEGORIZED);

    Catalog {
        metadata,
        statistics,
        modules,
    }
}
