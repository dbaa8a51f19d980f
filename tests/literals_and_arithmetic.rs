mod common;

use common::{compile, count};

#[test]
fn scalar_locals_lower_to_slots_and_float_ops() {
    let ir = compile(
        r#"
        let x: number = 1;
        let y: number = 2;
        let z: number = x + y;
        "#,
    )
    .unwrap();
    assert!(ir.contains("alloca double"));
    assert!(ir.contains("store double"));
    assert!(ir.contains("fadd double"));
    // Pure scalar programs need nothing from the runtime.
    assert!(!ir.contains("declare"));
}

#[test]
fn entry_function_returns_status_zero() {
    let ir = compile("let x: number = 1;").unwrap();
    assert!(ir.contains("define i64 @main()"));
    assert!(ir.contains("ret i64 0"));
}

#[test]
fn number_literals_round_trip_as_doubles() {
    let ir = compile("let x: number = 3.5;").unwrap();
    assert!(ir.contains("3.500000e+00"));
}

#[test]
fn integer_annotations_pick_fixed_width_slots() {
    let ir = compile("let i: int32 = 5;").unwrap();
    assert!(ir.contains("alloca i32"));
    assert!(ir.contains("store i32 5"));
}

#[test]
fn division_and_remainder_stay_floating_point() {
    let ir = compile(
        r#"
        let a: number = 7;
        let b: number = 2;
        let q: number = a / b;
        let r: number = a % b;
        "#,
    )
    .unwrap();
    assert!(ir.contains("fdiv double"));
    assert!(ir.contains("frem double"));
}

#[test]
fn exponentiation_routes_through_the_pow_intrinsic() {
    let ir = compile(
        r#"
        let base: number = 2;
        let p: number = base ** 10;
        "#,
    )
    .unwrap();
    assert!(ir.contains("llvm.pow.f64"));
    assert_eq!(count(&ir, "declare double @llvm.pow.f64"), 1);
}

#[test]
fn relational_ops_synthesize_ordered_compares() {
    let ir = compile(
        r#"
        let a: number = 1;
        let b: number = 2;
        let lt: boolean = a < b;
        let le: boolean = a <= b;
        "#,
    )
    .unwrap();
    assert!(ir.contains("fcmp olt"));
    // `<=` is lowered as (lt OR eq), not as a single ole.
    assert!(ir.contains("fcmp oeq"));
    assert!(!ir.contains("fcmp ole"));
}

#[test]
fn postfix_increment_yields_the_old_value() {
    let ir = compile(
        r#"
        let i: number = 1;
        let old: number = i++;
        "#,
    )
    .unwrap();
    assert!(ir.contains("fadd double"));
    // Three stores: the initializer, the slot update, and the
    // pre-mutation value landing in `old`.
    assert_eq!(count(&ir, "store double"), 3);
}
