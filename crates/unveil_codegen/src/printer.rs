//! The statement/expression printer.

use std::fmt::Write;

use unveil_ast::{
    BinaryOp, Expression, ForInit, Function, LogicalOp, Pattern, Program, Statement,
    StringInterner,
};

use crate::number::format_number;

/// Print a whole program.
pub fn print_program(program: &Program, interner: &StringInterner) -> String {
    print_statements(&program.body, interner)
}

/// Print a top-level statement list.
pub fn print_statements(statements: &[Statement], interner: &StringInterner) -> String {
    let mut printer = Printer::new(interner);
    for statement in statements {
        printer.statement(statement);
    }
    printer.out
}

/// Print a single expression.
pub fn print_expression(expression: &Expression, interner: &StringInterner) -> String {
    let mut printer = Printer::new(interner);
    printer.expr(expression, 0);
    printer.out
}

struct Printer<'a> {
    out: String,
    indent: usize,
    interner: &'a StringInterner,
}

impl<'a> Printer<'a> {
    fn new(interner: &'a StringInterner) -> Self {
        Printer {
            out: String::new(),
            indent: 0,
            interner,
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn name(&mut self, name: unveil_ast::Name) {
        self.out.push_str(self.interner.lookup(name));
    }

    // === Statements ===

    fn statement(&mut self, statement: &Statement) {
        self.write_indent();
        self.statement_inline(statement);
        self.out.push('\n');
    }

    /// Print a statement without the leading indent/trailing newline
    /// (already emitted by the caller).
    fn statement_inline(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expr) => {
                // An expression statement must not begin with `function`.
                if starts_with_function(expr) {
                    self.out.push('(');
                    self.expr(expr, 0);
                    self.out.push(')');
                } else {
                    self.expr(expr, 0);
                }
                self.out.push(';');
            }
            Statement::Block(body) => self.block(body),
            Statement::VariableDeclaration { kind, declarations } => {
                write!(self.out, "{kind} ").ok();
                for (i, declarator) in declarations.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.pattern(&declarator.target);
                    if let Some(init) = &declarator.init {
                        self.out.push_str(" = ");
                        // Commas inside an initializer must stay grouped.
                        self.expr(init, ASSIGNMENT);
                    }
                }
                self.out.push(';');
            }
            Statement::FunctionDeclaration(function) => self.function(function),
            Statement::If {
                test,
                consequent,
                alternate,
            } => {
                self.out.push_str("if (");
                self.expr(test, 0);
                self.out.push_str(") ");
                self.nested_statement(consequent);
                if let Some(alternate) = alternate {
                    self.out.push_str(" else ");
                    self.nested_statement(alternate);
                }
            }
            Statement::While { test, body } => {
                self.out.push_str("while (");
                self.expr(test, 0);
                self.out.push_str(") ");
                self.nested_statement(body);
            }
            Statement::DoWhile { body, test } => {
                self.out.push_str("do ");
                self.nested_statement(body);
                self.out.push_str(" while (");
                self.expr(test, 0);
                self.out.push_str(");");
            }
            Statement::For {
                init,
                test,
                update,
                body,
            } => {
                self.out.push_str("for (");
                match init {
                    Some(ForInit::Declaration { kind, declarations }) => {
                        let decl = Statement::VariableDeclaration {
                            kind: *kind,
                            declarations: declarations.clone(),
                        };
                        self.statement_inline(&decl);
                        // statement_inline appended the `;` separator.
                    }
                    Some(ForInit::Expression(expr)) => {
                        self.expr(expr, 0);
                        self.out.push(';');
                    }
                    None => self.out.push(';'),
                }
                if let Some(test) = test {
                    self.out.push(' ');
                    self.expr(test, 0);
                }
                self.out.push(';');
                if let Some(update) = update {
                    self.out.push(' ');
                    self.expr(update, 0);
                }
                self.out.push_str(") ");
                self.nested_statement(body);
            }
            Statement::Return(argument) => {
                self.out.push_str("return");
                if let Some(argument) = argument {
                    self.out.push(' ');
                    self.expr(argument, 0);
                }
                self.out.push(';');
            }
            Statement::Try(try_stmt) => {
                self.out.push_str("try ");
                self.block(&try_stmt.block);
                if let Some(handler) = &try_stmt.handler {
                    self.out.push_str(" catch ");
                    if let Some(param) = &handler.param {
                        self.out.push('(');
                        self.pattern(param);
                        self.out.push_str(") ");
                    }
                    self.block(&handler.body);
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    self.out.push_str(" finally ");
                    self.block(finalizer);
                }
            }
            Statement::Labeled { label, body } => {
                self.name(*label);
                self.out.push_str(": ");
                self.statement_inline(body);
            }
            Statement::Break { label } => {
                self.out.push_str("break");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.name(*label);
                }
                self.out.push(';');
            }
            Statement::Continue { label } => {
                self.out.push_str("continue");
                if let Some(label) = label {
                    self.out.push(' ');
                    self.name(*label);
                }
                self.out.push(';');
            }
            Statement::Empty => self.out.push(';'),
        }
    }

    /// A statement in `if`/loop body position: blocks print braced, other
    /// statements print inline.
    fn nested_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(body) => self.block(body),
            other => self.statement_inline(other),
        }
    }

    fn block(&mut self, body: &[Statement]) {
        if body.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent += 1;
        for statement in body {
            self.statement(statement);
        }
        self.indent -= 1;
        self.write_indent();
        self.out.push('}');
    }

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Identifier(name) => self.name(*name),
            Pattern::Rest(inner) => {
                self.out.push_str("...");
                self.pattern(inner);
            }
            Pattern::Array(elements) => {
                self.out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if let Some(element) = element {
                        self.pattern(element);
                    }
                }
                self.out.push(']');
            }
            Pattern::Object(properties) => {
                self.out.push('{');
                for (i, (key, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.name(*key);
                    if !matches!(value, Pattern::Identifier(name) if name == key) {
                        self.out.push_str(": ");
                        self.pattern(value);
                    }
                }
                self.out.push('}');
            }
        }
    }

    fn function(&mut self, function: &Function) {
        self.out.push_str("function");
        if function.is_generator {
            self.out.push('*');
        }
        if let Some(name) = function.name {
            self.out.push(' ');
            self.name(name);
        }
        self.out.push('(');
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.pattern(param);
        }
        self.out.push_str(") ");
        self.block(&function.body);
    }

    // === Expressions ===

    /// Print `expression`, parenthesizing when its precedence is below
    /// `min` for the position.
    fn expr(&mut self, expression: &Expression, min: u8) {
        let precedence = expr_precedence(expression);
        if precedence < min {
            self.out.push('(');
            self.expr_inner(expression);
            self.out.push(')');
        } else {
            self.expr_inner(expression);
        }
    }

    fn expr_inner(&mut self, expression: &Expression) {
        match expression {
            Expression::Identifier(name) => self.name(*name),
            Expression::String(s) => self.string_literal(s),
            Expression::Number(n) => {
                self.out.push_str(&format_number(*n));
            }
            Expression::Boolean(b) => {
                self.out.push_str(if *b { "true" } else { "false" });
            }
            Expression::Null => self.out.push_str("null"),
            Expression::Regex { pattern, flags } => {
                write!(self.out, "/{pattern}/{flags}").ok();
            }
            Expression::BigInt(value) => {
                write!(self.out, "{value}n").ok();
            }
            Expression::Binary { op, left, right } => {
                let precedence = binary_precedence(*op);
                // `**` is right-associative, and its left operand must be
                // parenthesized even for unary expressions.
                let (left_min, right_min) = if *op == BinaryOp::Exp {
                    (UNARY + 1, precedence)
                } else {
                    (precedence, precedence + 1)
                };
                self.expr(left, left_min);
                write!(self.out, " {op} ").ok();
                self.expr(right, right_min);
            }
            Expression::Logical { op, left, right } => {
                let precedence = logical_precedence(*op);
                // `??` must not mix unparenthesized with `&&`/`||`.
                let mixed = |child: &Expression| {
                    matches!(
                        (op, child),
                        (LogicalOp::Coalesce, Expression::Logical { op: LogicalOp::And | LogicalOp::Or, .. })
                            | (LogicalOp::And | LogicalOp::Or, Expression::Logical { op: LogicalOp::Coalesce, .. })
                    )
                };
                let left_min = if mixed(left) { u8::MAX } else { precedence };
                let right_min = if mixed(right) {
                    u8::MAX
                } else {
                    precedence + 1
                };
                self.expr(left, left_min);
                write!(self.out, " {op} ").ok();
                self.expr(right, right_min);
            }
            Expression::Unary { op, argument } => {
                self.out.push_str(op.as_str());
                if op.is_keyword() {
                    self.out.push(' ');
                }
                self.expr(argument, UNARY);
            }
            Expression::Update {
                op,
                prefix,
                argument,
            } => {
                if *prefix {
                    self.out.push_str(op.as_str());
                    self.expr(argument, UNARY);
                } else {
                    self.expr(argument, POSTFIX);
                    self.out.push_str(op.as_str());
                }
            }
            Expression::Sequence(expressions) => {
                for (i, expression) in expressions.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(expression, ASSIGNMENT);
                }
            }
            Expression::Assignment { op, target, value } => {
                self.expr(target, POSTFIX);
                write!(self.out, " {op} ").ok();
                self.expr(value, ASSIGNMENT);
            }
            Expression::Member {
                object,
                property,
                computed,
                optional,
            } => {
                self.expr(object, MEMBER);
                if *computed {
                    self.out.push_str(if *optional { "?.[" } else { "[" });
                    self.expr(property, 0);
                    self.out.push(']');
                } else {
                    self.out.push_str(if *optional { "?." } else { "." });
                    self.expr(property, 0);
                }
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test, CONDITIONAL + 1);
                self.out.push_str(" ? ");
                self.expr(consequent, ASSIGNMENT);
                self.out.push_str(" : ");
                self.expr(alternate, ASSIGNMENT);
            }
            Expression::Array(elements) => {
                self.out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    if let Some(element) = element {
                        self.expr(element, ASSIGNMENT);
                    }
                }
                self.out.push(']');
            }
            Expression::Function(function) => self.function(function),
            Expression::Call { callee, arguments } => {
                self.expr(callee, MEMBER);
                self.out.push('(');
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(argument, ASSIGNMENT);
                }
                self.out.push(')');
            }
        }
    }

    fn string_literal(&mut self, s: &str) {
        self.out.push('\'');
        for c in s.chars() {
            match c {
                '\'' => self.out.push_str("\\'"),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                '\0' => self.out.push_str("\\0"),
                '\u{8}' => self.out.push_str("\\b"),
                '\u{b}' => self.out.push_str("\\v"),
                '\u{c}' => self.out.push_str("\\f"),
                c if (c as u32) < 0x20 => {
                    write!(self.out, "\\x{:02x}", c as u32).ok();
                }
                c => self.out.push(c),
            }
        }
        self.out.push('\'');
    }
}

const SEQUENCE: u8 = 1;
const ASSIGNMENT: u8 = 2;
const CONDITIONAL: u8 = 3;
const LOGICAL_OR: u8 = 4;
const LOGICAL_AND: u8 = 5;
const UNARY: u8 = 15;
const POSTFIX: u8 = 16;
const MEMBER: u8 = 18;
const PRIMARY: u8 = 19;

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Pipeline => CONDITIONAL,
        BinaryOp::BitOr => 6,
        BinaryOp::BitXor => 7,
        BinaryOp::BitAnd => 8,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => 9,
        BinaryOp::Lt
        | BinaryOp::LtEq
        | BinaryOp::Gt
        | BinaryOp::GtEq
        | BinaryOp::In
        | BinaryOp::Instanceof => 10,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 11,
        BinaryOp::Add | BinaryOp::Sub => 12,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
        BinaryOp::Exp => 14,
    }
}

fn logical_precedence(op: LogicalOp) -> u8 {
    match op {
        LogicalOp::Or | LogicalOp::Coalesce => LOGICAL_OR,
        LogicalOp::And => LOGICAL_AND,
    }
}

fn expr_precedence(expression: &Expression) -> u8 {
    match expression {
        Expression::Sequence(_) => SEQUENCE,
        Expression::Assignment { .. } => ASSIGNMENT,
        Expression::Conditional { .. } => CONDITIONAL,
        Expression::Logical { op, .. } => logical_precedence(*op),
        Expression::Binary { op, .. } => binary_precedence(*op),
        Expression::Unary { .. } => UNARY,
        // Negative and fractional-exponent literals behave like unary
        // expressions for grouping purposes.
        Expression::Number(n) if *n < 0.0 || n.is_nan() => UNARY,
        Expression::Update { prefix, .. } => {
            if *prefix {
                UNARY
            } else {
                POSTFIX
            }
        }
        Expression::Member { .. } | Expression::Call { .. } => MEMBER,
        Expression::Function(_) => PRIMARY,
        _ => PRIMARY,
    }
}

/// Whether an expression statement would begin with the `function` keyword.
fn starts_with_function(expression: &Expression) -> bool {
    match expression {
        Expression::Function(_) => true,
        Expression::Binary { left, .. }
        | Expression::Logical { left, .. }
        | Expression::Assignment { target: left, .. } => starts_with_function(left),
        Expression::Conditional { test, .. } => starts_with_function(test),
        Expression::Member { object, .. } => starts_with_function(object),
        Expression::Call { callee, .. } => starts_with_function(callee),
        Expression::Update {
            prefix: false,
            argument,
            ..
        } => starts_with_function(argument),
        Expression::Sequence(expressions) => expressions
            .first()
            .is_some_and(starts_with_function),
        _ => false,
    }
}
