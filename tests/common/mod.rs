#![allow(dead_code)]

use anyhow::Result;

use millet::codegen::CodeGen;
use millet::diagnostics::{self, Diagnostic};
use millet::parser;

use inkwell::context::Context;
use inkwell::targets::TargetMachine;

/// Compile a source snippet to textual IR with the default entry name.
pub fn compile(source: &str) -> Result<String> {
    let parsed = parser::parse_source(source, None)?;
    let context = Context::create();
    let codegen = CodeGen::new(&context, "test_module", source);
    let triple = TargetMachine::get_default_triple();
    codegen.module.set_triple(&triple);
    codegen
        .generate_program(&parsed, "main")
        .map_err(|d| anyhow::anyhow!("{}", d))?;
    Ok(codegen.ir_text())
}

/// Compile a snippet expected to fail and hand back the diagnostic.
/// Stderr reporting is suppressed so failing-path tests stay quiet.
pub fn compile_err(source: &str) -> Diagnostic {
    let _guard = diagnostics::suppress();
    let parsed = parser::parse_source(source, None).expect("source should parse");
    let context = Context::create();
    let codegen = CodeGen::new(&context, "test_module", source);
    codegen
        .generate_program(&parsed, "main")
        .expect_err("expected compilation to fail")
}

/// Number of non-overlapping occurrences of `needle` in `haystack`.
pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}
