//! Catalog aggregation and JSON output

mod catalog;
mod writer;

pub use catalog::{
    build_catalog, AntiPatternStats, Catalog, ExportMetadata, SourceInfo, Statistics,
};
pub use writer::{
    module_file_stem, render_catalog, render_module_bodies, render_procedures, write_outputs,
    WrittenOutputs, CATALOG_FILE, MODULES_DIR,
};
