//! Core compiler pipeline.

pub mod compile;
pub mod order;
pub mod parser;
pub mod reducer;
pub mod resolver;
pub mod script;
pub mod types;
pub mod vars;
