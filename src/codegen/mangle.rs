//! Name mangling.
//!
//! Two schemes connect generated calls to the runtime archive:
//!
//! * methods and constructors get an Itanium-flavored symbol,
//!   `_Z<len><Class>__<member><param-codes>` (`v` when there are no
//!   parameters). The receiver is not encoded; it travels as an
//!   ABI-level first argument instead.
//! * free functions (the language-surface prelude and user functions)
//!   keep their plain C name.
//!
//! Both are pure functions of their inputs: equal identity tuples must
//! produce byte-equal symbols so declaration memoization works and the
//! runtime can predict every symbol the generator will request.

use crate::types::ScriptType;

/// Canonical member name used when mangling constructors.
pub const CONSTRUCTOR_MEMBER: &str = "constructor";

pub fn method_symbol(class: &str, member: &str, params: &[ScriptType]) -> String {
    let base = format!("{}__{}", class, member);
    let mut sym = format!("_Z{}{}", base.len(), base);
    if params.is_empty() {
        sym.push('v');
    } else {
        for p in params {
            sym.push_str(&type_code(p));
        }
    }
    sym
}

pub fn constructor_symbol(class: &str, params: &[ScriptType]) -> String {
    method_symbol(class, CONSTRUCTOR_MEMBER, params)
}

pub fn free_symbol(name: &str) -> String {
    name.to_string()
}

fn type_code(ty: &ScriptType) -> String {
    match ty {
        ScriptType::Number => "d".to_string(),
        ScriptType::Boolean => "b".to_string(),
        ScriptType::String => "Pc".to_string(),
        ScriptType::Integer { bits, signed } => {
            let c = match (bits, signed) {
                (8, true) => 'a',
                (8, false) => 'h',
                (16, true) => 's',
                (16, false) => 't',
                (32, true) => 'i',
                (32, false) => 'j',
                (64, true) => 'l',
                (64, false) => 'm',
                (128, true) => 'n',
                _ => 'o',
            };
            c.to_string()
        }
        ScriptType::Array(inner) => format!("P{}", type_code(inner)),
        ScriptType::Named(name) => format!("P{}{}", name.len(), name),
        ScriptType::Void | ScriptType::Null => "v".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_arg_method_matches_runtime_abi() {
        assert_eq!(
            method_symbol("Number", "toString", &[]),
            "_Z16Number__toStringv"
        );
    }

    #[test]
    fn mangling_is_deterministic() {
        let params = vec![ScriptType::Number, ScriptType::String];
        let a = method_symbol("Foo", "bar", &params);
        let b = method_symbol("Foo", "bar", &params);
        assert_eq!(a, b);
    }

    #[test]
    fn overloads_differ_by_parameter_codes() {
        let by_num = constructor_symbol("Foo", &[ScriptType::Number]);
        let by_str = constructor_symbol("Foo", &[ScriptType::String]);
        assert_ne!(by_num, by_str);
        assert!(by_num.ends_with('d'));
        assert!(by_str.ends_with("Pc"));
    }

    #[test]
    fn array_and_class_parameters_nest_pointer_codes() {
        let sym = method_symbol(
            "Util",
            "emit",
            &[
                ScriptType::Array(Box::new(ScriptType::String)),
                ScriptType::Named("Widget".to_string()),
            ],
        );
        assert!(sym.contains("PPc"));
        assert!(sym.contains("P6Widget"));
    }

    #[test]
    fn free_functions_keep_plain_names() {
        assert_eq!(free_symbol("puts"), "puts");
    }
}
