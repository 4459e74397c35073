//! Per-block analysis pipeline
//!
//! Runs signature parsing, anti-pattern detection, reference extraction,
//! classification and module assignment for every procedure block. Blocks
//! are independent, so larger dumps are processed in parallel; results keep
//! block order either way.

use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::analysis::{
    classify_complexity, classify_crud, detect_anti_patterns, extract_references, ModuleAssigner,
};
use crate::collaborators::{CallerXref, KnownTables};
use crate::parser::{parse_procedure, strip_comments, BodyBoundary, RawBlock};
use crate::util::{line_count, preview_lines};

use super::ClassifiedProcedure;

/// Minimum number of blocks to benefit from parallel processing.
/// Below this threshold, sequential processing is faster due to rayon overhead.
const PARALLEL_THRESHOLD: usize = 8;

/// Read-only inputs shared by every block
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'c> {
    pub known_tables: Option<&'c KnownTables>,
    pub callers: Option<&'c CallerXref>,
    pub assigner: &'c ModuleAssigner,
    /// Number of body lines kept in the preview
    pub preview_lines: usize,
}

/// Classified procedures plus the blocks that could not be parsed
#[derive(Debug, Clone)]
pub struct ClassifyResult<'a> {
    /// In block order
    pub procedures: Vec<ClassifiedProcedure<'a>>,
    pub parse_failures: usize,
    /// Procedures whose parameter/body boundary could not be located
    pub degraded_signatures: usize,
}

/// Run stages 2-6 for one block. `None` if no name can be recovered.
pub fn classify_block<'a>(
    block: &RawBlock<'a>,
    ctx: &AnalysisContext<'_>,
) -> Option<ClassifiedProcedure<'a>> {
    let procedure = parse_procedure(block.text)?;

    let stripped = strip_comments(procedure.body);
    let anti_patterns = detect_anti_patterns(&stripped);
    let references = extract_references(&stripped, &procedure.name, ctx.known_tables);
    let crud_type = classify_crud(&procedure.name, &stripped);

    let lines = line_count(procedure.body);
    let complexity = classify_complexity(lines, references.tables.len(), &anti_patterns);

    let called_from_code = ctx.callers.map(|x| x.callers_for(&procedure.name));
    let hint = ctx.callers.and_then(|x| x.module_hint(&procedure.name));
    let assignment = ctx
        .assigner
        .assign(&procedure.name, &references.tables, hint);

    trace!(
        "{} (line {}): {:?} / {:?}, module {} via {:?}",
        procedure.full_name(),
        block.start_line,
        crud_type,
        complexity,
        assignment.key,
        assignment.source
    );

    Some(ClassifiedProcedure {
        start_line: block.start_line,
        line_count: lines,
        body_preview: preview_lines(procedure.body, ctx.preview_lines),
        tables_referenced: references.tables,
        sprocs_called: references.procedures,
        crud_type,
        anti_patterns,
        complexity,
        called_from_code,
        module: assignment.key,
        procedure,
    })
}

/// Classify every block, in parallel when there are enough of them.
///
/// When `pool` is given the work runs inside it; otherwise rayon's global
/// pool is used.
pub fn classify_blocks<'a>(
    blocks: &[RawBlock<'a>],
    ctx: &AnalysisContext<'_>,
    pool: Option<&rayon::ThreadPool>,
) -> ClassifyResult<'a> {
    let run = || -> Vec<Option<ClassifiedProcedure<'a>>> {
        if blocks.len() >= PARALLEL_THRESHOLD {
            blocks
                .par_iter()
                .map(|block| classify_block(block, ctx))
                .collect()
        } else {
            blocks
                .iter()
                .map(|block| classify_block(block, ctx))
                .collect()
        }
    };
    let outcomes = match pool {
        Some(pool) => pool.install(run),
        None => run(),
    };

    let mut procedures = Vec::with_capacity(outcomes.len());
    let mut parse_failures = 0;
    for (block, outcome) in blocks.iter().zip(outcomes) {
        match outcome {
            Some(classified) => procedures.push(classified),
            None => {
                parse_failures += 1;
                debug!(
                    "Could not parse procedure name in block at line {}",
                    block.start_line
                );
            }
        }
    }

    let degraded_signatures = procedures
        .iter()
        .filter(|p| p.procedure.boundary == BodyBoundary::None)
        .count();

    info!(
        "Classified {} procedures ({} parse failures, {} degraded signatures)",
        procedures.len(),
        parse_failures,
        degraded_signatures
    );

    ClassifyResult {
        procedures,
        parse_failures,
        degraded_signatures,
    }
}
