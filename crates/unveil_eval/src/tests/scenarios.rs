//! The specification's concrete end-to-end scenarios.

use super::{deobfuscate, deobfuscate_tainted};

#[test]
fn constant_folding_reduces_to_literals() {
    assert_eq!(deobfuscate("var a = 1 + 2; a;"), "var a = 3;\n3;\n");
}

#[test]
fn possibly_written_variable_stays_residual() {
    let output = deobfuscate_tainted("var a = 1;\nif (t) { a = 2; }\na;");
    assert_eq!(output, "var a = 1;\nif (t) {\n  a = 2;\n}\na;\n");
}

#[test]
fn function_body_simplifies_and_call_site_folds() {
    let output = deobfuscate("function f(x) { return x + 1; }\nf(3);");
    assert_eq!(
        output,
        "function f(x) {\n  return x + 1;\n}\nf(3), 4;\n"
    );
}

#[test]
fn indeterminate_loop_survives_with_simplified_body() {
    let output = deobfuscate_tainted("while (t) { x = 1; }\nx;");
    assert_eq!(output, "while (t) {\n  x = 1;\n}\nx;\n");
}

#[test]
fn partially_tainted_array_keeps_untainted_elements() {
    let output = deobfuscate_tainted(
        "var a = [10, 20, 30];\nif (t) { a[0] += 5; }\na[0];\na[1];",
    );
    assert_eq!(
        output,
        "var a = [10, 20, 30];\nif (t) {\n  a[0] = 15;\n}\na[0];\n20;\n"
    );
}

#[test]
fn failing_try_body_executes_catch_concretely() {
    let output = deobfuscate("try { definitely.fails; } catch (e) { y = 1; }\ny;");
    assert_eq!(
        output,
        "try {\n  definitely.fails;\n} catch (e) {\n  y = 1;\n}\n1;\n"
    );
}
