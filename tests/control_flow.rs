mod common;

use common::{compile, compile_err, count};
use millet::diagnostics::DiagnosticKind;

#[test]
fn if_else_builds_a_shared_continuation() {
    let ir = compile(
        r#"
        function pick(x: number): number {
            if (x > 1) {
                return 1;
            } else {
                return 2;
            }
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("if.then"));
    assert!(ir.contains("if.else"));
    // The continuation block exists even when both arms return.
    assert!(ir.contains("if.end"));
    assert!(ir.contains("fcmp ogt"));
}

#[test]
fn else_if_chains_reuse_one_continuation() {
    let ir = compile(
        r#"
        function classify(x: number): number {
            let out: number = 0;
            if (x > 10) {
                out = 2;
            } else if (x > 5) {
                out = 1;
            }
            return out;
        }
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "if.end:"), 1);
}

#[test]
fn while_loop_shape() {
    let ir = compile(
        r#"
        let i: number = 0;
        while (i < 10) {
            i = i + 1;
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("while.cond"));
    assert!(ir.contains("while.body"));
    assert!(ir.contains("while.end"));
}

#[test]
fn do_while_runs_the_body_before_the_test() {
    let ir = compile(
        r#"
        let i: number = 0;
        do {
            i = i + 1;
        } while (i < 3);
        "#,
    )
    .unwrap();
    let body = ir.find("do.body:").unwrap();
    let cond = ir.find("do.cond:").unwrap();
    assert!(body < cond);
}

#[test]
fn for_loop_continue_targets_the_update_block() {
    let ir = compile(
        r#"
        let total: number = 0;
        for (let i: number = 0; i < 10; i++) {
            if (i == 5) {
                continue;
            }
            total = total + i;
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("for.cond"));
    assert!(ir.contains("for.inc"));
    assert!(ir.contains("br label %for.inc"));
}

#[test]
fn break_exits_the_innermost_loop() {
    let ir = compile(
        r#"
        let i: number = 0;
        while (true) {
            i = i + 1;
            if (i > 3) {
                break;
            }
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("br label %while.end"));
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let err = compile_err("break;");
    assert_eq!(err.kind, DiagnosticKind::UnsupportedConstruct);
}

#[test]
fn ternary_joins_arms_with_a_phi() {
    let ir = compile(
        r#"
        let x: number = 1;
        let m: number = x > 1 ? 2 : 3;
        "#,
    )
    .unwrap();
    assert!(ir.contains("ternary.then"));
    assert!(ir.contains("ternary.else"));
    assert!(ir.contains("phi double"));
}

#[test]
fn ternary_arm_kinds_must_agree() {
    let err = compile_err(r#"let x: number = true ? 1 : "no";"#);
    assert_eq!(err.kind, DiagnosticKind::TypeMismatch);
}

#[test]
fn boolean_logic_is_eager() {
    let ir = compile(
        r#"
        let a: boolean = true;
        let b: boolean = false;
        let c: boolean = a && b;
        let d: boolean = a || b;
        "#,
    )
    .unwrap();
    assert!(ir.contains("and i1"));
    assert!(ir.contains("or i1"));
    assert!(!ir.contains("logic.rhs"));
}

#[test]
fn string_fallback_short_circuits() {
    let ir = compile(
        r#"
        let s: string = "x";
        let t: string = s || "fallback";
        "#,
    )
    .unwrap();
    assert!(ir.contains("logic.rhs"));
    assert!(ir.contains("phi ptr"));
}

#[test]
fn array_fallback_keeps_the_array_shape() {
    let ir = compile(
        r#"
        function pick(s: string, t: string): number {
            let a: Array<string> = s.split(",");
            let b: Array<string> = t.split(",");
            let c: Array<string> = a || b;
            return c.length;
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("logic.rhs"));
    assert!(ir.contains("phi ptr"));
    assert!(ir.contains("call double @__arr_len"));
}

#[test]
fn object_fallback_keeps_the_class() {
    let ir = compile(
        r#"
        class Counter {
            constructor(start: number) {}
            bump(by: number): number {
                return by;
            }
        }
        let a: Counter = new Counter(0);
        let b: Counter = new Counter(1);
        let n: number = (a || b).bump(2);
        "#,
    )
    .unwrap();
    assert!(ir.contains("logic.rhs"));
    assert!(ir.contains("call double @_Z13Counter__bumpd"));
}

#[test]
fn try_finally_lowers_inline() {
    let ir = compile(
        r#"
        let n: number = 0;
        try {
            n = 1;
        } finally {
            n = 2;
        }
        "#,
    )
    .unwrap();
    // No unwinding machinery: both stores land in straight-line code.
    assert!(!ir.contains("invoke"));
    assert!(!ir.contains("landingpad"));
    assert!(ir.contains("store double 1.000000e+00"));
    assert!(ir.contains("store double 2.000000e+00"));
}
