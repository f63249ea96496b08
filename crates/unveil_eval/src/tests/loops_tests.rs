//! Loop execution: concrete unrolling and fixed-point simplification.

use super::{deobfuscate, deobfuscate_tainted, TAINT_SEED};

#[test]
fn concrete_while_unrolls() {
    let output = deobfuscate(
        "var i = 0;\nvar s = 0;\nwhile (i < 2) { s = s + i; i = i + 1; }\ns;",
    );
    assert_eq!(
        output,
        "var i = 0;\nvar s = 0;\n{\n  {\n    s = 0;\n    i = 1;\n  }\n  {\n    s = 1;\n    i = 2;\n  }\n}\n1;\n"
    );
}

#[test]
fn concrete_for_folds_to_final_values() {
    let output = deobfuscate("var s = 0;\nfor (var i = 0; i < 3; i++) { s += i; }\ns;");
    assert!(output.contains("var i = 0;"), "init leaks outward: {output}");
    assert!(output.contains("s = 3;"), "last iteration folds: {output}");
    assert!(output.ends_with("3;\n"), "got: {output}");
}

#[test]
fn concrete_do_while_runs_body_first() {
    let output = deobfuscate("var i = 3;\ndo { i = i - 1; } while (false);\ni;");
    assert!(output.contains("i = 2;"), "got: {output}");
    assert!(output.ends_with("2;\n"), "got: {output}");
}

#[test]
fn break_stops_concrete_iteration() {
    let output = deobfuscate(
        "var i = 0;\nwhile (true) { if (i > 0) { break; } i = 1; }\ni;",
    );
    assert!(output.contains("break;"), "got: {output}");
    assert!(output.ends_with("1;\n"), "got: {output}");
}

#[test]
fn tainted_loop_invalidates_loop_variant_folds() {
    // Pass one folds `a + 1` to 6, but the write to `a` degrades it; the
    // fixed point keeps the symbolic form.
    let output = deobfuscate_tainted("var a = 5;\nwhile (t) { b = a + 1; a = 2; }\nb;");
    assert_eq!(
        output,
        "var a = 5;\nwhile (t) {\n  b = a + 1;\n  a = 2;\n}\nb;\n"
    );
}

#[test]
fn loop_invariant_values_fold_inside_tainted_loops() {
    // `a` is never written inside the loop, so its value flows in.
    let output = deobfuscate_tainted("var a = 5;\nwhile (t) { b = a + 1; }\nb;");
    assert_eq!(output, "var a = 5;\nwhile (t) {\n  b = 6;\n}\nb;\n");
}

#[test]
fn tainted_for_keeps_test_and_update() {
    let output = deobfuscate_tainted("for (var i = 0; t; i = i + 1) { u = i; }");
    assert!(output.contains("var i = 0;"), "got: {output}");
    assert!(output.contains("for (; t; i = i + 1)"), "got: {output}");
}

#[test]
fn tainted_loop_simplification_is_idempotent() {
    let source = format!("{TAINT_SEED}while (t) {{ x = x + 1; y = 2; }}\n");
    let once = deobfuscate(&source);
    let twice = deobfuscate(&once);
    assert_eq!(once, twice);
}

#[test]
fn runaway_concrete_loop_degrades_to_residual() {
    // The iteration cap forces the loop into simplification instead of
    // hanging the evaluator.
    let output = deobfuscate("var i = 0;\nwhile (true) { i = i + 1; }");
    assert!(output.contains("while (true)"), "got: {output}");
}
