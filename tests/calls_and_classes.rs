mod common;

use common::{compile, compile_err, count};
use millet::diagnostics::DiagnosticKind;

#[test]
fn user_functions_are_defined_and_callable_before_their_declaration() {
    let ir = compile(
        r#"
        let r: number = add(1, 2);
        function add(a: number, b: number): number {
            return a + b;
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("define double @add(double"));
    assert!(ir.contains("call double @add"));
}

#[test]
fn void_functions_get_an_implicit_return() {
    let ir = compile(
        r#"
        function noop(x: number) {
            let y: number = x;
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("define void @noop"));
    assert!(ir.contains("ret void"));
}

#[test]
fn prelude_functions_are_declared_on_first_use() {
    let ir = compile(r#"puts("hello");"#).unwrap();
    assert_eq!(count(&ir, "declare i32 @puts(ptr)"), 1);
    assert!(ir.contains("call i32 @puts"));
}

#[test]
fn constructor_symbol_is_declared_once_for_repeated_news() {
    let ir = compile(
        r#"
        class Foo {
            constructor(x: number) {}
        }
        let a: Foo = new Foo(1);
        let b: Foo = new Foo(2);
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "declare ptr @_Z16Foo__constructord"), 1);
    assert_eq!(count(&ir, "call ptr @_Z16Foo__constructord"), 2);
}

#[test]
fn method_calls_mangle_and_pass_the_receiver_first() {
    let ir = compile(
        r#"
        class Counter {
            constructor(start: number) {}
            bump(by: number): number {
                return by;
            }
        }
        let c: Counter = new Counter(0);
        let n: number = c.bump(2);
        "#,
    )
    .unwrap();
    assert!(ir.contains("declare double @_Z13Counter__bumpd(ptr, double)"));
    assert!(ir.contains("call double @_Z13Counter__bumpd"));
}

#[test]
fn builtin_string_methods_route_through_the_mangled_abi() {
    let ir = compile(
        r#"
        let s: string = "hi";
        let u: string = s.toUpperCase();
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "declare ptr @_Z19String__toUpperCasev(ptr)"), 1);
    assert!(ir.contains("call ptr @_Z19String__toUpperCasev"));
}

#[test]
fn number_to_string_matches_the_template_stringifier() {
    let ir = compile(
        r#"
        let n: number = 7;
        let s: string = n.toString();
        "#,
    )
    .unwrap();
    assert_eq!(count(&ir, "declare ptr @_Z16Number__toStringv(double)"), 1);
}

#[test]
fn moment_and_date_receivers_travel_as_pointers() {
    let ir = compile(
        r#"
        function day_of(m: MomentJS): number {
            return m.day();
        }
        function stamp(d: Date): string {
            return d.format("YYYY");
        }
        "#,
    )
    .unwrap();
    assert!(ir.contains("define double @day_of(ptr"));
    assert_eq!(count(&ir, "declare double @_Z13MomentJS__dayv(ptr)"), 1);
    assert!(ir.contains("call double @_Z13MomentJS__dayv(ptr"));
    assert_eq!(count(&ir, "declare ptr @_Z12Date__formatPc(ptr, ptr)"), 1);
}

#[test]
fn ingredient_accessors_are_zero_argument_externals() {
    let ir = compile("let t: string = Trigger.Text;").unwrap();
    assert_eq!(count(&ir, "declare ptr @Trigger_Text()"), 1);
    assert!(ir.contains("call ptr @Trigger_Text()"));
}

#[test]
fn unknown_ingredients_do_not_leak_externals() {
    let err = compile_err("let t: string = Trigger.Missing;");
    assert_eq!(err.kind, DiagnosticKind::UnknownIdentifier);
}

#[test]
fn calls_on_non_functions_are_rejected() {
    let err = compile_err(
        r#"
        let x: number = 1;
        x();
        "#,
    );
    assert_eq!(err.kind, DiagnosticKind::UnresolvableCallTarget);
}

#[test]
fn argument_counts_are_checked() {
    let err = compile_err(
        r#"
        function one(a: number): number {
            return a;
        }
        let r: number = one(1, 2);
        "#,
    );
    assert_eq!(err.kind, DiagnosticKind::TypeMismatch);
}
