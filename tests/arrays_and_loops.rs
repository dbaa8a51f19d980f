mod common;

use common::{compile, compile_err, count};
use millet::diagnostics::DiagnosticKind;

#[test]
fn array_literal_allocates_exactly_its_element_count() {
    let ir = compile("let a: number[] = [1, 2, 3];").unwrap();
    assert!(ir.contains("alloca [3 x double]"));
}

#[test]
fn element_access_converts_the_index_and_loads() {
    let ir = compile(
        r#"
        let a: number[] = [10, 20, 30];
        let i: number = 1;
        let x: number = a[i];
        "#,
    )
    .unwrap();
    assert!(ir.contains("fptosi double"));
    assert!(ir.contains("getelementptr inbounds double"));
    assert!(ir.contains("load double"));
}

#[test]
fn fixed_array_length_is_a_compile_time_constant() {
    let ir = compile(
        r#"
        let a: number[] = [1, 2, 3, 4];
        let n: number = a.length;
        "#,
    )
    .unwrap();
    assert!(ir.contains("store double 4.000000e+00"));
    assert!(!ir.contains("__arr_len"));
}

#[test]
fn runtime_string_arrays_ask_the_runtime_for_length() {
    let ir = compile(
        r#"
        let csv: string = "a,b,c";
        let parts: string[] = csv.split(",");
        let n: number = parts.length;
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "declare double @__arr_len"), 1);
}

#[test]
fn summing_over_an_array_with_a_for_loop() {
    let ir = compile(
        r#"
        let values: number[] = [1, 2, 3];
        let total: number = 0;
        for (let i: number = 0; i < 3; i++) {
            total = total + values[i];
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("for.cond"));
    assert!(ir.contains("getelementptr inbounds double"));
    assert!(ir.contains("fadd double"));
}

#[test]
fn array_literal_without_an_annotation_is_rejected() {
    let err = compile_err("let a = [1, 2, 3];");
    assert_eq!(err.kind, DiagnosticKind::MissingNativeType);
}
