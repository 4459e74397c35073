//! Body analysis: anti-patterns, references, classification and module assignment

mod anti_patterns;
mod body_deps;
mod classifier;
mod module_assigner;

pub use anti_patterns::detect_anti_patterns;
pub use body_deps::{extract_references, References};
pub use classifier::{
    classify_complexity, classify_crud, crud_from_body, crud_from_name,
};
pub use module_assigner::{Assignment, AssignmentSource, ModuleAssigner};
