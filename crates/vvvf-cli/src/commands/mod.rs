//! CLI command implementations

pub mod analyze;
pub mod json_output;
pub mod render;
pub mod solve;
pub mod table;
pub mod validate;
