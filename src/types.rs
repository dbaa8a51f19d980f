use crate::diagnostics::{Diagnostic, DiagnosticKind};
use deno_ast::swc::ast;

/// Source-level type vocabulary.
///
/// `number` is an IEEE double unless a fixed-width alias (`int8` ..
/// `uint128`) was written, strings are immutable byte buffers handled by
/// pointer, arrays are fixed-capacity with the capacity baked in at the
/// literal, and any other named type is an opaque class reference whose
/// layout belongs to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptType {
    Number,
    Integer { bits: u8, signed: bool },
    Boolean,
    String,
    Array(Box<ScriptType>),
    Named(String),
    Void,
    Null,
}

/// A function's resolved signature: ordered named parameters plus return
/// type. Built from explicit annotations only.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub params: Vec<(String, ScriptType)>,
    pub ret: ScriptType,
}

/// Map a syntactic type annotation to a `ScriptType`. Returns `None` for
/// annotations outside the supported subset.
pub fn map_ts_type(ty: &ast::TsType) -> Option<ScriptType> {
    match ty {
        ast::TsType::TsKeywordType(kw) => match kw.kind {
            ast::TsKeywordTypeKind::TsNumberKeyword => Some(ScriptType::Number),
            ast::TsKeywordTypeKind::TsBooleanKeyword => Some(ScriptType::Boolean),
            ast::TsKeywordTypeKind::TsStringKeyword => Some(ScriptType::String),
            ast::TsKeywordTypeKind::TsVoidKeyword => Some(ScriptType::Void),
            ast::TsKeywordTypeKind::TsNullKeyword => Some(ScriptType::Null),
            _ => None,
        },
        ast::TsType::TsArrayType(arr) => {
            map_ts_type(&arr.elem_type).map(|t| ScriptType::Array(Box::new(t)))
        }
        ast::TsType::TsTypeRef(r) => {
            let name = match &r.type_name {
                ast::TsEntityName::Ident(id) => id.sym.to_string(),
                ast::TsEntityName::TsQualifiedName(_) => return None,
            };
            // Fixed-width numeric aliases from the language surface.
            let fixed = |bits: u8, signed: bool| Some(ScriptType::Integer { bits, signed });
            match name.as_str() {
                "int8" => fixed(8, true),
                "int16" => fixed(16, true),
                "int32" => fixed(32, true),
                "int64" => fixed(64, true),
                "int128" => fixed(128, true),
                "uint8" => fixed(8, false),
                "uint16" => fixed(16, false),
                "uint32" => fixed(32, false),
                "uint64" => fixed(64, false),
                "uint128" => fixed(128, false),
                "float32" | "float64" | "float128" => Some(ScriptType::Number),
                "Array" => {
                    let param = r
                        .type_params
                        .as_ref()
                        .and_then(|tp| tp.params.first())
                        .and_then(|p| map_ts_type(p))?;
                    Some(ScriptType::Array(Box::new(param)))
                }
                _ => Some(ScriptType::Named(name)),
            }
        }
        ast::TsType::TsParenthesizedType(p) => map_ts_type(&p.type_ann),
        _ => None,
    }
}

/// Extract a function's signature from its annotations. Every parameter
/// must carry an explicit annotation; the return type defaults to `void`
/// when no annotation is present.
pub fn function_signature(func: &ast::Function) -> Result<FunctionSig, Diagnostic> {
    let mut params = Vec::with_capacity(func.params.len());
    for p in &func.params {
        match &p.pat {
            ast::Pat::Ident(bind) => {
                let name = bind.id.sym.to_string();
                let ann = bind.type_ann.as_ref().ok_or_else(|| {
                    Diagnostic::with_span(
                        DiagnosticKind::MissingNativeType,
                        format!("parameter `{}` has no type annotation", name),
                        p.span.lo.0 as usize,
                    )
                })?;
                let ty = map_ts_type(&ann.type_ann).ok_or_else(|| {
                    Diagnostic::with_span(
                        DiagnosticKind::MissingNativeType,
                        format!("unsupported type annotation on parameter `{}`", name),
                        p.span.lo.0 as usize,
                    )
                })?;
                params.push((name, ty));
            }
            _ => {
                return Err(Diagnostic::with_span(
                    DiagnosticKind::UnsupportedConstruct,
                    "only plain identifier parameters are supported",
                    p.span.lo.0 as usize,
                ));
            }
        }
    }
    let ret = match &func.return_type {
        Some(ann) => map_ts_type(&ann.type_ann).ok_or_else(|| {
            Diagnostic::new(
                DiagnosticKind::MissingNativeType,
                "unsupported return type annotation",
            )
        })?,
        None => ScriptType::Void,
    };
    Ok(FunctionSig { params, ret })
}

/// Language-surface prelude: free functions the runtime archive defines
/// under their plain C names. Declared lazily at first use.
pub fn prelude_signature(name: &str) -> Option<FunctionSig> {
    let sig = |params: Vec<(&str, ScriptType)>, ret: ScriptType| FunctionSig {
        params: params
            .into_iter()
            .map(|(n, t)| (n.to_string(), t))
            .collect(),
        ret,
    };
    match name {
        "puts" => Some(sig(
            vec![("s", ScriptType::String)],
            ScriptType::Integer {
                bits: 32,
                signed: true,
            },
        )),
        "parseInt" => Some(sig(vec![("s", ScriptType::String)], ScriptType::Number)),
        "parseFloat" => Some(sig(vec![("s", ScriptType::String)], ScriptType::Number)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_aliases_map_to_integers() {
        let src = "let x: int32 = 0;";
        let parsed = crate::parser::parse_source(src, None).unwrap();
        let program = parsed.program_ref();
        let mut found = None;
        for item in program.body() {
            if let deno_ast::ModuleItemRef::Stmt(ast::Stmt::Decl(ast::Decl::Var(v))) = item {
                let decl = &v.decls[0];
                if let ast::Pat::Ident(bind) = &decl.name {
                    found = bind.type_ann.as_ref().and_then(|a| map_ts_type(&a.type_ann));
                }
            }
        }
        assert_eq!(
            found,
            Some(ScriptType::Integer {
                bits: 32,
                signed: true
            })
        );
    }

    #[test]
    fn prelude_contains_puts() {
        let sig = prelude_signature("puts").unwrap();
        assert_eq!(sig.params.len(), 1);
        assert_eq!(sig.params[0].1, ScriptType::String);
    }

    #[test]
    fn prelude_rejects_unknown_names() {
        assert!(prelude_signature("definitely_not_prelude").is_none());
    }
}
