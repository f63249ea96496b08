//! Labels, break targeting, and `if`/`else if` chains.

use super::{deobfuscate, deobfuscate_err, deobfuscate_tainted};
use crate::ErrorKind;

#[test]
fn labeled_break_unwinds_to_the_label() {
    let output = deobfuscate("lbl: while (true) { break lbl; }");
    assert_eq!(output, "lbl: {\n  break lbl;\n}\n");
}

#[test]
fn unresolved_break_label_is_fatal() {
    let err = deobfuscate_err("while (true) { break ghost; }");
    assert!(matches!(err.kind, ErrorKind::ReferenceUnresolved(_)));
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn break_outside_any_loop_is_fatal() {
    let err = deobfuscate_err("break;");
    assert!(matches!(err.kind, ErrorKind::ReferenceUnresolved(_)));
}

#[test]
fn continue_is_not_implemented() {
    let err = deobfuscate_err("while (true) { continue; }");
    assert!(matches!(err.kind, ErrorKind::NotImplemented(_)));
}

#[test]
fn tainted_break_keeps_the_loop_residual() {
    let output = deobfuscate_tainted("while (t) { if (t) { break; } x = 1; }");
    assert_eq!(
        output,
        "while (t) {\n  if (t) {\n    break;\n  }\n  x = 1;\n}\n"
    );
}

#[test]
fn else_if_chains_retain_structure_under_taint() {
    let output = deobfuscate_tainted(
        "var a = 1;\nif (t) { a = 2; } else if (false) { a = 3; } else { a = 4; }\na;",
    );
    assert_eq!(
        output,
        "var a = 1;\nif (t) {\n  a = 2;\n} else if (false) {\n  a = 3;\n} else {\n  a = 4;\n}\na;\n"
    );
}

#[test]
fn pipeline_operator_is_rejected() {
    let err = deobfuscate_err("function f(x) { return x; }\n1 |> f;");
    assert!(matches!(err.kind, ErrorKind::NotImplemented(_)));
    assert!(err.to_string().contains("|>"));
}

#[test]
fn delete_operator_is_rejected() {
    let err = deobfuscate_err("var a = [1]; delete a[0];");
    assert!(matches!(err.kind, ErrorKind::NotImplemented(_)));
}

#[test]
fn let_and_const_are_rejected_by_name() {
    let err = deobfuscate_err("let a = 1;");
    assert!(err.to_string().contains("let declaration"));
    let err = deobfuscate_err("const a = 1;");
    assert!(err.to_string().contains("const declaration"));
}

#[test]
fn destructuring_declarators_are_rejected() {
    let err = deobfuscate_err("var [a, b] = c;");
    assert!(err.to_string().contains("destructuring declarator"));
}
