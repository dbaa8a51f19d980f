mod common;

use common::compile_err;
use millet::diagnostics::{Diagnostic, DiagnosticKind};

#[test]
fn unknown_identifiers_are_reported_with_a_span() {
    let err = compile_err("let x: number = y;");
    assert_eq!(err.kind, DiagnosticKind::UnknownIdentifier);
    assert!(err.span_start.is_some());
    assert!(err.message.contains("`y`"));
}

#[test]
fn declarations_without_annotations_are_rejected() {
    let err = compile_err("let x = 1;");
    assert_eq!(err.kind, DiagnosticKind::MissingNativeType);
}

#[test]
fn constructor_parameters_without_annotations_are_rejected() {
    let err = compile_err(
        r#"
        class Foo {
            constructor(x) {}
        }
        "#,
    );
    assert_eq!(err.kind, DiagnosticKind::MissingNativeType);
    assert!(err.span_start.is_some());
}

#[test]
fn declarations_without_initializers_are_rejected() {
    let err = compile_err("let x: number;");
    assert_eq!(err.kind, DiagnosticKind::UnsupportedConstruct);
}

#[test]
fn class_references_are_not_values() {
    let err = compile_err(
        r#"
        class Foo {
            constructor(x: number) {}
        }
        let x: Foo = Foo;
        "#,
    );
    assert_eq!(err.kind, DiagnosticKind::InvalidValueAccess);
}

#[test]
fn assignment_to_undeclared_names_is_rejected() {
    let err = compile_err("missing = 1;");
    assert_eq!(err.kind, DiagnosticKind::UnknownIdentifier);
}

#[test]
fn assignment_kinds_must_match_the_declaration() {
    let err = compile_err(
        r#"
        let n: number = 1;
        n = "text";
        "#,
    );
    assert_eq!(err.kind, DiagnosticKind::TypeMismatch);
}

#[test]
fn unsupported_statements_name_their_kind() {
    let err = compile_err(
        r#"
        let n: number = 1;
        switch (n) {
            default:
                break;
        }
        "#,
    );
    assert_eq!(err.kind, DiagnosticKind::UnsupportedConstruct);
}

#[test]
fn labels_render_in_the_display_form() {
    let d = Diagnostic::new(DiagnosticKind::TypeMismatch, "boom");
    assert_eq!(format!("{}", d), "error[type-mismatch]: boom");
}
