//! Function declaration, sandbox simplification, and call folding.

use super::{deobfuscate, deobfuscate_err, deobfuscate_tainted};
use crate::ErrorKind;

#[test]
fn function_expression_binds_and_folds() {
    let output = deobfuscate("var g = function (x) { return x * 2; };\ng(4);");
    assert_eq!(
        output,
        "var g = function(x) {\n  return x * 2;\n};\ng(4), 8;\n"
    );
}

#[test]
fn recursive_call_folds_through_the_chain() {
    let output = deobfuscate(
        "function fact(n) { return n < 2 ? 1 : n * fact(n - 1); }\n\
         var r;\nr = fact(5);\nr;",
    );
    assert_eq!(
        output,
        "function fact(n) {\n  return n < 2 ? 1 : n * fact(n - 1);\n}\n\
         var r;\nr = (fact(5), 120);\n120;\n"
    );
}

#[test]
fn conditional_return_taints_the_call() {
    let output = deobfuscate_tainted(
        "function g(p) { if (p) { return 1; } return 2; }\n\
         var r;\nr = g(t);\nr;",
    );
    assert_eq!(
        output,
        "function g(p) {\n  if (p) {\n    return 1;\n  }\n  return 2;\n}\n\
         var r;\nr = g(t);\nr;\n"
    );
}

#[test]
fn missing_arguments_bind_undefined() {
    let output = deobfuscate("function k(a, b) { return b; }\nvar x;\nx = k(1);\nx;");
    assert!(output.ends_with("x = (k(1), undefined);\nundefined;\n"), "got: {output}");
}

#[test]
fn sandbox_keeps_free_variables_as_references() {
    // `outer` resolves nowhere inside the sandbox; the simplified body
    // must keep it by name rather than fail.
    let output = deobfuscate("function f() { return outer + 1; }");
    assert_eq!(output, "function f() {\n  return outer + 1;\n}\n");
}

#[test]
fn unreachable_code_after_concrete_return_is_dropped() {
    let output = deobfuscate("function f() { return 1; dead();\n}");
    assert_eq!(output, "function f() {\n  return 1;\n}\n");
}

#[test]
fn sandbox_recovers_from_unsimplifiable_bodies() {
    // `break` outside any loop is a diagnostic; the declaration keeps the
    // body verbatim instead of failing.
    let output = deobfuscate("function f() { break; }");
    assert_eq!(output, "function f() {\n  break;\n}\n");
}

#[test]
fn generators_and_async_are_rejected() {
    let err = deobfuscate_err("function* g() {}");
    assert!(matches!(err.kind, ErrorKind::NotImplemented(_)));
    assert!(err.to_string().contains("generator"));
}

#[test]
fn rest_and_destructuring_parameters_are_rejected() {
    let err = deobfuscate_err("function f(...xs) {}");
    assert!(err.to_string().contains("rest parameter"));
    let err = deobfuscate_err("function f([a]) {}");
    assert!(err.to_string().contains("destructuring parameter"));
}

#[test]
fn calling_a_non_function_throws() {
    let err = deobfuscate_err("var a = 1; a();");
    assert!(matches!(err.kind, ErrorKind::Thrown(_)));
}

#[test]
fn runaway_recursion_surfaces_a_runtime_error() {
    let err = deobfuscate_err("function f() { return f(); }\nf();");
    assert!(matches!(err.kind, ErrorKind::Thrown(_)));
}
