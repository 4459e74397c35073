//! Procedure records and the per-block classification pipeline

mod builder;
mod elements;

pub use builder::{classify_block, classify_blocks, AnalysisContext, ClassifyResult};
pub use elements::*;
