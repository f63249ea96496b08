//! Printer tests.
//!
//! Shapes are built through `unveil_parse` where convenient; the printer
//! crate deliberately has no dependency on the parser outside tests.

use unveil_ast::StringInterner;
use unveil_parse::{parse_expression, parse_program};

use crate::{print_expression, print_program};

fn round_trip_expr(source: &str) -> String {
    let interner = StringInterner::new();
    let expr = parse_expression(source, &interner).unwrap();
    print_expression(&expr, &interner)
}

fn round_trip(source: &str) -> String {
    let interner = StringInterner::new();
    let program = parse_program(source, &interner).unwrap();
    print_program(&program, &interner)
}

#[test]
fn minimal_parenthesization() {
    assert_eq!(round_trip_expr("1 + 2 * 3"), "1 + 2 * 3");
    assert_eq!(round_trip_expr("(1 + 2) * 3"), "(1 + 2) * 3");
    assert_eq!(round_trip_expr("a - (b - c)"), "a - (b - c)");
    assert_eq!(round_trip_expr("a - b - c"), "a - b - c");
    assert_eq!(round_trip_expr("-a * b"), "-a * b");
    assert_eq!(round_trip_expr("-(a * b)"), "-(a * b)");
}

#[test]
fn right_associative_operators() {
    assert_eq!(round_trip_expr("a = b = c"), "a = b = c");
    assert_eq!(round_trip_expr("2 ** 3 ** 2"), "2 ** 3 ** 2");
    assert_eq!(round_trip_expr("(2 ** 3) ** 2"), "(2 ** 3) ** 2");
}

#[test]
fn logical_mixing_keeps_parens() {
    assert_eq!(round_trip_expr("a && b || c"), "a && b || c");
    assert_eq!(round_trip_expr("(a ?? b) || c"), "(a ?? b) || c");
    assert_eq!(round_trip_expr("a ?? (b && c)"), "a ?? (b && c)");
}

#[test]
fn member_forms() {
    assert_eq!(round_trip_expr("a.b.c"), "a.b.c");
    assert_eq!(round_trip_expr("a[0][b + 1]"), "a[0][b + 1]");
    assert_eq!(round_trip_expr("a?.b?.[0]"), "a?.b?.[0]");
    assert_eq!(round_trip_expr("f(1)(2)"), "f(1)(2)");
}

#[test]
fn string_escaping() {
    assert_eq!(round_trip_expr("'it\\'s'"), "'it\\'s'");
    assert_eq!(round_trip_expr("\"a\\nb\""), "'a\\nb'");
    assert_eq!(round_trip_expr("'\\x01'"), "'\\x01'");
    assert_eq!(round_trip_expr("'\\\\'"), "'\\\\'");
}

#[test]
fn statements_format() {
    let output = round_trip("if (a) { b = 1; } else { c = 2; }");
    assert_eq!(output, "if (a) {\n  b = 1;\n} else {\n  c = 2;\n}\n");

    let output = round_trip("while (x) y--;");
    assert_eq!(output, "while (x) y--;\n");

    let output = round_trip("do { x(); } while (x < 3);");
    assert_eq!(output, "do {\n  x();\n} while (x < 3);\n");

    let output = round_trip("for (var i = 0; i < 3; i++) { f(i); }");
    assert_eq!(output, "for (var i = 0; i < 3; i++) {\n  f(i);\n}\n");

    let output = round_trip("lbl: while (a) break lbl;");
    assert_eq!(output, "lbl: while (a) break lbl;\n");
}

#[test]
fn try_catch_finally_format() {
    let output = round_trip("try { a(); } catch (e) { b(); } finally { c(); }");
    assert_eq!(
        output,
        "try {\n  a();\n} catch (e) {\n  b();\n} finally {\n  c();\n}\n"
    );
}

#[test]
fn function_forms() {
    let output = round_trip("function f(a, b) { return a + b; }");
    assert_eq!(output, "function f(a, b) {\n  return a + b;\n}\n");

    // Expression statements must not begin with `function`.
    let output = round_trip("(function () { return 1; })();");
    assert!(output.starts_with("(function"));
}

#[test]
fn literal_forms() {
    assert_eq!(round_trip_expr("[1, , 'x']"), "[1, , 'x']");
    assert_eq!(round_trip_expr("/ab+c/gi"), "/ab+c/gi");
    assert_eq!(round_trip_expr("123n"), "123n");
    assert_eq!(round_trip_expr("null"), "null");
    assert_eq!(round_trip_expr("void 0"), "void 0");
    assert_eq!(round_trip_expr("typeof x"), "typeof x");
}

#[test]
fn printed_output_reparses() {
    let sources = [
        "var a = (1 + 2) * 3;",
        "a = b ? c : d ? e : f;",
        "x = (a, b, c);",
        "if (a) b(); else if (c) d();",
        "try { x(); } catch (e) {} finally { y(); }",
        "function f(x) { return x ** 2; }",
    ];
    for source in sources {
        let interner = StringInterner::new();
        let program = parse_program(source, &interner).unwrap();
        let printed = print_program(&program, &interner);
        let reparsed = parse_program(&printed, &interner)
            .unwrap_or_else(|err| panic!("printed output failed to reparse: {printed:?}: {err}"));
        let reprinted = print_program(&reparsed, &interner);
        assert_eq!(printed, reprinted, "printing is not a fixed point");
    }
}
