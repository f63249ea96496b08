//! Taint propagation boundaries.

use super::{deobfuscate, deobfuscate_err, deobfuscate_tainted};
use crate::ErrorKind;

#[test]
fn undefined_reads_are_untainted_undefined() {
    assert_eq!(deobfuscate("undefined;"), "undefined;\n");
    assert_eq!(deobfuscate("var a; a;"), "var a;\nundefined;\n");
}

#[test]
fn global_numeric_constants_fold() {
    assert_eq!(deobfuscate("NaN;"), "NaN;\n");
    assert_eq!(deobfuscate("typeof NaN;"), "'number';\n");
    assert_eq!(deobfuscate("1 / Infinity;"), "0;\n");
    assert_eq!(deobfuscate("-Infinity < 0;"), "true;\n");
}

#[test]
fn out_of_bounds_index_is_untainted_undefined() {
    assert_eq!(
        deobfuscate("var a = [10]; a[5];"),
        "var a = [10];\nundefined;\n"
    );
}

#[test]
fn short_circuit_never_evaluates_the_dead_side() {
    // `x` is unresolved: evaluating it would be fatal, so the output
    // proves the right side never ran.
    assert_eq!(deobfuscate("false && x;"), "false;\n");
    assert_eq!(deobfuscate("true || x;"), "true;\n");
    assert_eq!(deobfuscate("1 ?? x;"), "1;\n");
}

#[test]
fn decided_logical_returns_the_right_side_even_when_tainted() {
    // `true && t` is just `t`: no residual logical node appears.
    assert_eq!(deobfuscate_tainted("true && t;"), "t;\n");
    assert_eq!(deobfuscate_tainted("0 || t;"), "t;\n");
}

#[test]
fn indeterminate_logical_stays_residual() {
    assert_eq!(deobfuscate_tainted("t && 1;"), "t && 1;\n");
    assert_eq!(deobfuscate_tainted("t ?? 'd';"), "t ?? 'd';\n");
}

#[test]
fn unresolved_reference_is_fatal_outside_try() {
    let err = deobfuscate_err("ghost;");
    assert!(matches!(err.kind, ErrorKind::ReferenceUnresolved(_)));
}

#[test]
fn tainted_branches_leak_declarations_once() {
    let output = deobfuscate_tainted(
        "if (t) { var b = 1; } else { var b = 2; }\nb;",
    );
    assert!(output.ends_with("b;\n"));
    // The leaked binding resolves as a tainted reference, not a value.
    assert!(!output.ends_with("1;\n"));
    assert!(!output.ends_with("2;\n"));
}

#[test]
fn decided_test_discards_the_other_branch() {
    // The chosen branch is emitted as-is (here: its block), the other one
    // vanishes entirely.
    assert_eq!(
        deobfuscate("var a; if (true) { a = 1; } else { a = 2; } a;"),
        "var a;\n{\n  a = 1;\n}\n1;\n"
    );
    assert_eq!(deobfuscate("if (0) { x = 1; }"), "");
}

#[test]
fn ternary_with_tainted_test_evaluates_both_branches_gated() {
    let output = deobfuscate_tainted("var a = 1;\nvar r;\nr = t ? a : 2;\nr;");
    assert_eq!(output, "var a = 1;\nvar r;\nr = t ? a : 2;\nr;\n");
}

#[test]
fn parent_write_from_ternary_branch_degrades() {
    // Assignments inside the taken-or-not branches must not leak concrete
    // values outward.
    let output = deobfuscate_tainted("var a = 1;\nt ? a = 2 : a = 3;\na;");
    assert!(output.ends_with("a;\n"), "got: {output}");
}

#[test]
fn void_always_folds_to_undefined() {
    assert_eq!(deobfuscate("void 0;"), "undefined;\n");
    assert_eq!(deobfuscate_tainted("void t;"), "undefined;\n");
}

#[test]
fn typeof_folds_on_concrete_values() {
    assert_eq!(deobfuscate("typeof 1;"), "'number';\n");
    assert_eq!(deobfuscate("typeof null;"), "'object';\n");
    assert_eq!(deobfuscate_tainted("typeof t;"), "typeof t;\n");
}

#[test]
fn update_expressions_fold_or_residualize() {
    assert_eq!(deobfuscate("var i = 1; i++; i;"), "var i = 1;\n1;\n2;\n");
    assert_eq!(deobfuscate("var i = 1; --i; i;"), "var i = 1;\n0;\n0;\n");
    assert_eq!(deobfuscate_tainted("t++;"), "t++;\n");
}

#[test]
fn member_update_reflects_simplified_form() {
    let output = deobfuscate("var a = [5]; a[1 - 1]++; a[0];");
    assert_eq!(output, "var a = [5];\na[0]++;\n6;\n");
}

#[test]
fn tainted_member_key_taints_the_object() {
    let output = deobfuscate_tainted("var a = [1, 2];\na[t] = 9;\na[0];");
    // With an unknown index written, reads of any slot degrade.
    assert_eq!(output, "var a = [1, 2];\na[t] = 9;\na[0];\n");
}

#[test]
fn member_path_keys_print_simplified() {
    let output = deobfuscate_tainted(
        "var a = [[1, 2], 3];\nif (t) { a[2 - 2][4 - 3] = 7; }\na[0][1];",
    );
    assert!(output.contains("a[0][1] = 7;"), "got: {output}");
}

#[test]
fn sequence_keeps_all_fragments_and_last_value() {
    assert_eq!(deobfuscate("var a = (1, 2, 3); a;"), "var a = (1, 2, 3);\n3;\n");
    assert_eq!(deobfuscate_tainted("(1, t);"), "1, t;\n");
}

#[test]
fn bigint_arithmetic_folds() {
    assert_eq!(
        deobfuscate("var a = 9007199254740993n + 1n; a;"),
        "var a = 9007199254740994n;\n9007199254740994n;\n"
    );
}

#[test]
fn strict_and_loose_equality_distinguish_identities() {
    assert_eq!(deobfuscate("1 === '1';"), "false;\n");
    assert_eq!(deobfuscate("1 == '1';"), "true;\n");
    assert_eq!(deobfuscate("'2' + 2;"), "'22';\n");
    assert_eq!(deobfuscate("'4' - 2;"), "2;\n");
    assert_eq!(deobfuscate("-1 >>> 0;"), "4294967295;\n");
}

#[test]
fn string_member_access_folds() {
    assert_eq!(deobfuscate("'abc'[1];"), "'b';\n");
    assert_eq!(deobfuscate("'abc'.length;"), "3;\n");
    assert_eq!(deobfuscate("[1, 2].length;"), "2;\n");
}

#[test]
fn optional_member_short_circuits_on_nullish() {
    assert_eq!(deobfuscate("var n = null; n?.x;"), "var n = null;\nundefined;\n");
    let err = deobfuscate_err("var n = null; n.x;");
    assert!(matches!(err.kind, ErrorKind::Thrown(_)));
}
