pub mod codegen;
pub mod diagnostics;
pub mod parser;
pub mod types;
