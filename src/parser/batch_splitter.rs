//! Batch splitting and procedure-block selection
//!
//! A dump is a flat sequence of batches separated by `GO` lines. Only batches
//! that open with a `CREATE PROC[EDURE]` (optionally preceded by comments and
//! `SET <option> <value>` lines) are kept as procedure blocks; everything else
//! is dropped silently.

use std::sync::LazyLock;

use regex::Regex;

use crate::util::contains_ci;

/// Anchor for a batch that defines a procedure.
///
/// Leading comments, blank lines and `SET ANSI_NULLS ON`-style lines may
/// appear in any order before the CREATE.
static PROCEDURE_ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)^(?:\s+|/\*.*?\*/|--[^\n]*|SET\s+\w+\s+\w+\s*;?)*CREATE\s+(?:OR\s+ALTER\s+)?PROC(?:EDURE)?\b",
    )
    .unwrap()
});

/// A SQL batch with its content and source location
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub content: &'a str,
    /// 1-based line number of the first line of the batch
    pub start_line: usize,
    /// Byte offset of the batch within the dump
    pub offset: usize,
}

/// A batch believed to contain exactly one procedure definition.
///
/// Borrows from the decoded dump; never mutated after creation.
#[derive(Debug, Clone, Copy)]
pub struct RawBlock<'a> {
    /// Trimmed batch text
    pub text: &'a str,
    /// 1-based line number of the batch start in the dump
    pub start_line: usize,
    /// Byte offset of `text` within the dump
    pub offset: usize,
}

/// Result of splitting a dump into procedure blocks
#[derive(Debug, Clone)]
pub struct SplitResult<'a> {
    /// Every batch found, including non-procedure ones
    pub total_batches: usize,
    /// Batches matching the procedure anchor, in source order
    pub blocks: Vec<RawBlock<'a>>,
}

/// Check whether a line is a batch terminator: `GO`, `GO;` or `GO <count>`.
///
/// Surrounding whitespace, including a trailing carriage return, is ignored.
fn is_batch_terminator(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.len() < 2 || !trimmed.as_bytes()[..2].eq_ignore_ascii_case(b"go") {
        return false;
    }
    let rest = trimmed[2..].trim_start();
    if rest.is_empty() || rest == ";" {
        return true;
    }
    // GO must be followed by whitespace before a repeat count
    trimmed.len() > 2
        && trimmed.as_bytes()[2].is_ascii_whitespace()
        && rest.bytes().all(|b| b.is_ascii_digit())
}

/// Split SQL content into batches by GO lines, tracking line numbers and offsets
pub fn split_batches(content: &str) -> Vec<Batch<'_>> {
    // Estimate ~1 batch per 20 lines (GO separators are relatively sparse)
    let estimated_batches = (content.len() / 800).max(1);
    let mut batches = Vec::with_capacity(estimated_batches);
    let mut current_pos = 0;
    let mut batch_start = 0;
    let mut current_line = 1; // 1-based line numbers
    let mut batch_start_line = 1;

    for line in content.split_inclusive('\n') {
        let next_pos = current_pos + line.len();

        if is_batch_terminator(line) {
            if current_pos > batch_start {
                batches.push(Batch {
                    content: &content[batch_start..current_pos],
                    start_line: batch_start_line,
                    offset: batch_start,
                });
            }
            batch_start = next_pos;
            batch_start_line = current_line + 1; // Next line after GO
        }

        current_pos = next_pos;
        current_line += 1;
    }

    // Add remaining content
    if batch_start < content.len() {
        batches.push(Batch {
            content: &content[batch_start..],
            start_line: batch_start_line,
            offset: batch_start,
        });
    }

    batches
}

/// Check whether a trimmed batch begins a procedure definition
pub fn is_procedure_batch(trimmed: &str) -> bool {
    // Cheap reject before running the anchored regex over a large batch
    contains_ci(trimmed, "PROC") && PROCEDURE_ANCHOR_RE.is_match(trimmed)
}

/// Split a dump and keep only the procedure blocks
pub fn split_procedure_blocks(content: &str) -> SplitResult<'_> {
    let batches = split_batches(content);
    let total_batches = batches.len();

    let blocks = batches
        .into_iter()
        .filter_map(|batch| {
            let trimmed = batch.content.trim();
            if trimmed.is_empty() || !is_procedure_batch(trimmed) {
                return None;
            }
            let leading = batch.content.len() - batch.content.trim_start().len();
            let skipped_lines = batch.content[..leading].matches('\n').count();
            Some(RawBlock {
                text: trimmed,
                start_line: batch.start_line + skipped_lines,
                offset: batch.offset + leading,
            })
        })
        .collect();

    SplitResult {
        total_batches,
        blocks,
    }
}
