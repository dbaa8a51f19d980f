use std::path::PathBuf;

use anyhow::Result;

use millet::codegen::CodeGen;
use millet::diagnostics;
use millet::parser;

use inkwell::context::Context;
use inkwell::targets::TargetMachine;

struct Options {
    src_path: String,
    entry_name: String,
    out_path: Option<PathBuf>,
    emit_object: bool,
}

fn parse_args() -> Result<Options> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut src_path: Option<String> = None;
    let mut entry_name = "main".to_string();
    let mut out_path: Option<PathBuf> = None;
    let mut emit_object = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--entry" => {
                i += 1;
                let name = args
                    .get(i)
                    .ok_or_else(|| anyhow::anyhow!("--entry requires a name"))?;
                entry_name = name.clone();
            }
            // Rule scripts are compiled as a callable unit: the host
            // invokes the entry symbol rather than the process entrypoint.
            "--rule" => entry_name = "__rule_function".to_string(),
            "-o" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| anyhow::anyhow!("-o requires a path"))?;
                out_path = Some(PathBuf::from(path));
            }
            "--emit-obj" => emit_object = true,
            other => {
                if src_path.is_some() {
                    anyhow::bail!("unexpected argument `{}`", other);
                }
                src_path = Some(other.to_string());
            }
        }
        i += 1;
    }

    let src_path = match src_path {
        Some(p) => p,
        None => std::env::var("MILLET_SRC_FILE").map_err(|_| {
            anyhow::anyhow!(
                "No source file provided. Pass path as first arg or set MILLET_SRC_FILE env var."
            )
        })?,
    };

    Ok(Options {
        src_path,
        entry_name,
        out_path,
        emit_object,
    })
}

fn main() -> Result<()> {
    let opts = parse_args()?;
    let source = std::fs::read_to_string(&opts.src_path)?;

    let parsed = parser::parse_source(&source, Some(&opts.src_path))?;

    let context = Context::create();
    let codegen = CodeGen::new(&context, "millet", &source);
    let triple = TargetMachine::get_default_triple();
    codegen.module.set_triple(&triple);

    if let Err(mut d) = codegen.generate_program(&parsed, &opts.entry_name) {
        d.file = Some(opts.src_path.clone());
        diagnostics::emit_diagnostic(&d, Some(&source));
        anyhow::bail!("compilation failed: {}", d.message);
    }

    match (&opts.out_path, opts.emit_object) {
        (Some(path), true) => codegen.write_object(path)?,
        (Some(path), false) => codegen.write_ir(path)?,
        (None, true) => anyhow::bail!("--emit-obj requires -o <path>"),
        (None, false) => println!("{}", codegen.ir_text()),
    }

    Ok(())
}
