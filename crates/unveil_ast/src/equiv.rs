//! Structural tree equivalence.
//!
//! Used by the evaluator to detect the fixed point of ambiguous-loop
//! simplification. Differences that cannot change emitted behavior are
//! ignored:
//!
//! - `a.b` and `a["b"]` compare equal when the key is a valid identifier;
//! - numeric literals compare by value with `NaN` equal to itself, so a
//!   re-lifted literal matches the previous pass.

use crate::{is_identifier_name, Expression, ForInit, Statement, StringInterner};

/// Structural equivalence over statements.
pub fn equivalent(a: &Statement, b: &Statement, interner: &StringInterner) -> bool {
    stmt_eq(a, b, interner)
}

/// Structural equivalence over statement lists.
pub fn equivalent_stmts(a: &[Statement], b: &[Statement], interner: &StringInterner) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| stmt_eq(x, y, interner))
}

/// Structural equivalence over expressions.
pub fn equivalent_expr(a: &Expression, b: &Expression, interner: &StringInterner) -> bool {
    expr_eq(a, b, interner)
}

fn opt_expr_eq(a: Option<&Expression>, b: Option<&Expression>, interner: &StringInterner) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => expr_eq(x, y, interner),
        _ => false,
    }
}

fn stmt_eq(a: &Statement, b: &Statement, interner: &StringInterner) -> bool {
    use Statement::*;
    match (a, b) {
        (Expression(x), Expression(y)) => expr_eq(x, y, interner),
        (Block(x), Block(y)) => equivalent_stmts(x, y, interner),
        (
            VariableDeclaration {
                kind: ka,
                declarations: da,
            },
            VariableDeclaration {
                kind: kb,
                declarations: db,
            },
        ) => {
            ka == kb
                && da.len() == db.len()
                && da.iter().zip(db).all(|(x, y)| {
                    x.target == y.target
                        && opt_expr_eq(x.init.as_ref(), y.init.as_ref(), interner)
                })
        }
        (FunctionDeclaration(x), FunctionDeclaration(y)) => function_eq(x, y, interner),
        (
            If {
                test: ta,
                consequent: ca,
                alternate: aa,
            },
            If {
                test: tb,
                consequent: cb,
                alternate: ab,
            },
        ) => {
            expr_eq(ta, tb, interner)
                && stmt_eq(ca, cb, interner)
                && match (aa, ab) {
                    (None, None) => true,
                    (Some(x), Some(y)) => stmt_eq(x, y, interner),
                    _ => false,
                }
        }
        (While { test: ta, body: ba }, While { test: tb, body: bb })
        | (DoWhile { test: ta, body: ba }, DoWhile { test: tb, body: bb }) => {
            expr_eq(ta, tb, interner) && stmt_eq(ba, bb, interner)
        }
        (
            For {
                init: ia,
                test: ta,
                update: ua,
                body: ba,
            },
            For {
                init: ib,
                test: tb,
                update: ub,
                body: bb,
            },
        ) => {
            let init_eq = match (ia, ib) {
                (None, None) => true,
                (Some(ForInit::Expression(x)), Some(ForInit::Expression(y))) => {
                    expr_eq(x, y, interner)
                }
                (
                    Some(ForInit::Declaration {
                        kind: ka,
                        declarations: da,
                    }),
                    Some(ForInit::Declaration {
                        kind: kb,
                        declarations: db,
                    }),
                ) => {
                    ka == kb
                        && da.len() == db.len()
                        && da.iter().zip(db).all(|(x, y)| {
                            x.target == y.target
                                && opt_expr_eq(x.init.as_ref(), y.init.as_ref(), interner)
                        })
                }
                _ => false,
            };
            init_eq
                && opt_expr_eq(ta.as_ref(), tb.as_ref(), interner)
                && opt_expr_eq(ua.as_ref(), ub.as_ref(), interner)
                && stmt_eq(ba, bb, interner)
        }
        (Return(x), Return(y)) => opt_expr_eq(x.as_ref(), y.as_ref(), interner),
        (Try(x), Try(y)) => {
            equivalent_stmts(&x.block, &y.block, interner)
                && match (&x.handler, &y.handler) {
                    (None, None) => true,
                    (Some(h), Some(g)) => {
                        h.param == g.param && equivalent_stmts(&h.body, &g.body, interner)
                    }
                    _ => false,
                }
                && match (&x.finalizer, &y.finalizer) {
                    (None, None) => true,
                    (Some(f), Some(g)) => equivalent_stmts(f, g, interner),
                    _ => false,
                }
        }
        (Labeled { label: la, body: ba }, Labeled { label: lb, body: bb }) => {
            la == lb && stmt_eq(ba, bb, interner)
        }
        (Break { label: x }, Break { label: y }) => x == y,
        (Continue { label: x }, Continue { label: y }) => x == y,
        (Empty, Empty) => true,
        _ => false,
    }
}

fn function_eq(a: &crate::Function, b: &crate::Function, interner: &StringInterner) -> bool {
    a.name == b.name
        && a.params == b.params
        && a.is_generator == b.is_generator
        && a.is_async == b.is_async
        && equivalent_stmts(&a.body, &b.body, interner)
}

fn expr_eq(a: &Expression, b: &Expression, interner: &StringInterner) -> bool {
    use Expression::*;
    match (a, b) {
        (Identifier(x), Identifier(y)) => x == y,
        (String(x), String(y)) => x == y,
        // NaN must equal itself here or a NaN-producing loop never converges.
        (Number(x), Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Boolean(x), Boolean(y)) => x == y,
        (Null, Null) => true,
        (
            Regex {
                pattern: pa,
                flags: fa,
            },
            Regex {
                pattern: pb,
                flags: fb,
            },
        ) => pa == pb && fa == fb,
        (BigInt(x), BigInt(y)) => x == y,
        (
            Binary {
                op: oa,
                left: la,
                right: ra,
            },
            Binary {
                op: ob,
                left: lb,
                right: rb,
            },
        ) => oa == ob && expr_eq(la, lb, interner) && expr_eq(ra, rb, interner),
        (
            Logical {
                op: oa,
                left: la,
                right: ra,
            },
            Logical {
                op: ob,
                left: lb,
                right: rb,
            },
        ) => oa == ob && expr_eq(la, lb, interner) && expr_eq(ra, rb, interner),
        (
            Unary {
                op: oa,
                argument: xa,
            },
            Unary {
                op: ob,
                argument: xb,
            },
        ) => oa == ob && expr_eq(xa, xb, interner),
        (
            Update {
                op: oa,
                prefix: pa,
                argument: xa,
            },
            Update {
                op: ob,
                prefix: pb,
                argument: xb,
            },
        ) => oa == ob && pa == pb && expr_eq(xa, xb, interner),
        (Sequence(xs), Sequence(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| expr_eq(x, y, interner))
        }
        (
            Assignment {
                op: oa,
                target: ta,
                value: va,
            },
            Assignment {
                op: ob,
                target: tb,
                value: vb,
            },
        ) => oa == ob && expr_eq(ta, tb, interner) && expr_eq(va, vb, interner),
        (
            Member {
                object: oa,
                property: pa,
                computed: ca,
                optional: na,
            },
            Member {
                object: ob,
                property: pb,
                computed: cb,
                optional: nb,
            },
        ) => {
            na == nb
                && expr_eq(oa, ob, interner)
                && member_key_eq(pa, *ca, pb, *cb, interner)
        }
        (
            Conditional {
                test: ta,
                consequent: ca,
                alternate: xa,
            },
            Conditional {
                test: tb,
                consequent: cb,
                alternate: xb,
            },
        ) => {
            expr_eq(ta, tb, interner)
                && expr_eq(ca, cb, interner)
                && expr_eq(xa, xb, interner)
        }
        (Array(xs), Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| opt_expr_eq(x.as_ref(), y.as_ref(), interner))
        }
        (Function(x), Function(y)) => function_eq(x, y, interner),
        (
            Call {
                callee: ca,
                arguments: xa,
            },
            Call {
                callee: cb,
                arguments: xb,
            },
        ) => {
            expr_eq(ca, cb, interner)
                && xa.len() == xb.len()
                && xa.iter().zip(xb).all(|(x, y)| expr_eq(x, y, interner))
        }
        _ => false,
    }
}

/// Compare member keys across the computed/dot distinction.
///
/// `a.b`, `a["b"]`, and a computed identifier-string key all denote the same
/// access when the string is a valid identifier name.
fn member_key_eq(
    a: &Expression,
    a_computed: bool,
    b: &Expression,
    b_computed: bool,
    interner: &StringInterner,
) -> bool {
    match (a_computed, b_computed) {
        (false, false) => a == b,
        (true, true) => expr_eq(a, b, interner),
        (false, true) | (true, false) => {
            let (dot, computed) = if a_computed { (b, a) } else { (a, b) };
            match (dot, computed) {
                (Expression::Identifier(name), Expression::String(s)) => {
                    is_identifier_name(s) && interner.lookup(*name) == &**s
                }
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn member(object: Expression, property: Expression, computed: bool) -> Expression {
        Expression::Member {
            object: Box::new(object),
            property: Box::new(property),
            computed,
            optional: false,
        }
    }

    #[test]
    fn dot_and_computed_string_key_are_equivalent() {
        let interner = StringInterner::new();
        let a = interner.intern("a");
        let key = interner.intern("length");

        let dotted = member(Expression::ident(a), Expression::ident(key), false);
        let computed = member(Expression::ident(a), Expression::string("length"), true);
        assert!(equivalent_expr(&dotted, &computed, &interner));

        let other = member(Expression::ident(a), Expression::string("len-gth"), true);
        assert!(!equivalent_expr(&dotted, &other, &interner));
    }

    #[test]
    fn nan_literals_are_equivalent() {
        let interner = StringInterner::new();
        assert!(equivalent_expr(
            &Expression::Number(f64::NAN),
            &Expression::Number(f64::NAN),
            &interner
        ));
    }

    #[test]
    fn differing_statements_are_not_equivalent() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let a = Statement::Expression(Expression::ident(x));
        let b = Statement::Expression(Expression::Number(1.0));
        assert!(!equivalent(&a, &b, &interner));
        assert!(equivalent(&a, &a.clone(), &interner));
    }

    #[test]
    fn computed_keys_compare_recursively() {
        let interner = StringInterner::new();
        let a = interner.intern("a");
        let lhs = member(Expression::ident(a), Expression::Number(0.0), true);
        let rhs = member(Expression::ident(a), Expression::Number(0.0), true);
        assert!(equivalent_expr(&lhs, &rhs, &interner));
    }

    #[test]
    fn string_rc_sharing_does_not_affect_equality() {
        let interner = StringInterner::new();
        let s: Rc<str> = "abc".into();
        assert!(equivalent_expr(
            &Expression::String(s.clone()),
            &Expression::string("abc"),
            &interner
        ));
    }
}
