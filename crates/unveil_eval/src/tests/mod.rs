//! End-to-end evaluator tests.
//!
//! Source text goes through `unveil_parse`, the evaluator, and
//! `unveil_codegen`; assertions run against the printed residual. A taint
//! seed is available as the `T`/`t` prelude: `T()` returns its (tainted)
//! `arguments` binding, so `t` is a value the evaluator provably cannot
//! determine.

use unveil_ast::StringInterner;

use crate::Evaluator;

mod control_tests;
mod functions_tests;
mod loops_tests;
mod scenarios;
mod taint_tests;

/// Prelude that binds `t` to an undeterminable value.
const TAINT_SEED: &str = "function T() { return arguments; }\nvar t;\nt = T();\n";

/// Residual printed for the taint seed itself.
const TAINT_SEED_RESIDUAL: &str = "function T() {\n  return arguments;\n}\nvar t;\nt = T();\n";

/// Run a source snippet through parse → evaluate → print.
fn deobfuscate(source: &str) -> String {
    let interner = StringInterner::new();
    let program = unveil_parse::parse_program(source, &interner)
        .unwrap_or_else(|err| panic!("test source failed to parse: {err}"));
    let mut evaluator = Evaluator::new(&interner);
    let residual = evaluator
        .run(&program)
        .unwrap_or_else(|err| panic!("evaluation failed: {err}"));
    unveil_codegen::print_statements(&residual, &interner)
}

/// Like [`deobfuscate`], with the taint seed prepended and its residual
/// stripped from the output.
fn deobfuscate_tainted(source: &str) -> String {
    let full = format!("{TAINT_SEED}{source}");
    let output = deobfuscate(&full);
    let stripped = output
        .strip_prefix(TAINT_SEED_RESIDUAL)
        .unwrap_or_else(|| panic!("taint seed residual changed:\n{output}"));
    stripped.to_owned()
}

/// Evaluation error for a snippet expected to fail.
fn deobfuscate_err(source: &str) -> crate::EvalError {
    let interner = StringInterner::new();
    let program = unveil_parse::parse_program(source, &interner)
        .unwrap_or_else(|err| panic!("test source failed to parse: {err}"));
    let mut evaluator = Evaluator::new(&interner);
    match evaluator.run(&program) {
        Ok(residual) => panic!(
            "expected an error, got residual:\n{}",
            unveil_codegen::print_statements(&residual, &interner)
        ),
        Err(err) => err,
    }
}
