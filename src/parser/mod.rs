//! T-SQL dump reading and procedure signature parsing

mod batch_splitter;
mod comment_stripper;
pub(crate) mod identifier_utils;
mod line_index;
mod procedure_parser;
mod source_reader;
pub(crate) mod token_parser_base;

pub use batch_splitter::{
    is_procedure_batch, split_batches, split_procedure_blocks, Batch, RawBlock, SplitResult,
};
pub use comment_stripper::strip_comments;
pub use identifier_utils::{split_qualified_name, DEFAULT_SCHEMA};
pub use procedure_parser::{
    parse_parameters, parse_procedure, BodyBoundary, Parameter, ParameterDirection,
    ParsedProcedure,
};
pub use source_reader::{decode_bytes, read_source, InputEncoding, SourceText};
