mod common;

use common::{compile, compile_err, count};
use millet::diagnostics::DiagnosticKind;

#[test]
fn concat_declares_the_helper_once_and_calls_it_per_use() {
    let ir = compile(
        r#"
        let a: string = "foo";
        let b: string = "bar";
        let ab: string = a + b;
        let abc: string = ab + "baz";
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "declare ptr @__str_concat"), 1);
    assert_eq!(count(&ir, "call ptr @__str_concat"), 2);
}

#[test]
fn string_literals_are_interned_once() {
    let ir = compile(
        r#"
        let a: string = "same";
        let b: string = "same";
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "c\"same\\00\""), 1);
}

#[test]
fn string_equality_compares_through_the_runtime() {
    let ir = compile(
        r#"
        let a: string = "x";
        let b: string = "y";
        let eq: boolean = a == b;
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "declare i32 @__str_cmp"), 1);
    assert!(ir.contains("icmp eq i32"));
}

#[test]
fn template_interpolation_stringifies_numbers() {
    let ir = compile(
        r#"
        let n: number = 42;
        let msg: string = `value is ${n}!`;
        "#,
    )
    .unwrap();
    // Numeric interpolation shares the Number.toString runtime symbol.
    assert!(ir.contains("@_Z16Number__toStringv"));
    assert!(ir.contains("call ptr @__str_concat"));
}

#[test]
fn template_with_string_parts_needs_no_stringifier() {
    let ir = compile(
        r#"
        let who: string = "world";
        let msg: string = `hello ${who}`;
        "#,
    )
    .unwrap();
    assert!(ir.contains("call ptr @__str_concat"));
    assert!(!ir.contains("_Z16Number__toStringv"));
}

#[test]
fn string_length_asks_the_runtime() {
    let ir = compile(
        r#"
        let s: string = "four";
        let n: number = s.length;
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "declare double @__str_len"), 1);
}

#[test]
fn mixed_add_is_rejected_not_coerced() {
    let err = compile_err(r#"let s: string = "a" + 1;"#);
    assert_eq!(err.kind, DiagnosticKind::TypeConversionUnsupported);
}

#[test]
fn boolean_interpolation_is_rejected() {
    let err = compile_err(
        r#"
        let flag: boolean = true;
        let msg: string = `state: ${flag}`;
        "#,
    );
    assert_eq!(err.kind, DiagnosticKind::UnsupportedStringification);
}
