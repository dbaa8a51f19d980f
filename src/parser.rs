use anyhow::Result;
use deno_ast::{MediaType, ParseParams, ParsedSource, parse_module};
use std::sync::Arc;
use url::Url;

/// Parse a source file into a swc module AST.
///
/// The parser (and the type annotations it surfaces) is the only type
/// oracle this compiler has: everything downstream works from explicit
/// annotations on declarations and parameters. Inference beyond that is
/// out of scope.
pub fn parse_source(source_code: &str, file_path: Option<&str>) -> Result<ParsedSource> {
    let specifier = match file_path {
        Some(p) => Url::parse(&format!("file:///{}", p.trim_start_matches('/')))?,
        None => Url::parse("file:///module.ts")?,
    };
    let params = ParseParams {
        specifier,
        text: Arc::from(source_code),
        media_type: MediaType::TypeScript,
        capture_tokens: false,
        scope_analysis: false,
        maybe_syntax: None,
    };
    Ok(parse_module(params)?)
}
