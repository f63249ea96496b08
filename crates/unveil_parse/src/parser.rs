//! Recursive-descent parser for the supported JS subset.
//!
//! Expressions use precedence climbing over the standard JS operator
//! table. Constructs the evaluator must reject by name (`let`/`const`,
//! destructuring patterns, generator/async functions, `|>`) parse into
//! their representable forms; constructs outside the dialect entirely
//! (`new`, `this`, objects, classes, arrow functions, `switch`) are parse
//! errors.

use std::rc::Rc;

use unveil_ast::{
    AssignmentOp, BinaryOp, CatchClause, DeclarationKind, Expression, ForInit, Function,
    LogicalOp, Name, Pattern, Program, Statement, StringInterner, TryStatement, UnaryOp,
    UpdateOp, VariableDeclarator,
};

use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Keyword, Punct, Token, TokenKind};

/// Parse a whole source file.
pub fn parse_program(source: &str, interner: &StringInterner) -> Result<Program, ParseError> {
    let mut parser = Parser::new(source, interner)?;
    let mut body = Vec::new();
    while !matches!(parser.current.kind, TokenKind::Eof) {
        body.push(parser.parse_statement()?);
    }
    Ok(Program { body })
}

/// Parse a single expression (useful in tests and tools).
pub fn parse_expression(
    source: &str,
    interner: &StringInterner,
) -> Result<Expression, ParseError> {
    let mut parser = Parser::new(source, interner)?;
    let expr = parser.parse_expr()?;
    if !matches!(parser.current.kind, TokenKind::Eof) {
        return Err(parser.unexpected("end of input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    interner: &'a StringInterner,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, interner: &'a StringInterner) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source, interner);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            interner,
        })
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn eat(&mut self, punct: Punct) -> Result<bool, ParseError> {
        if self.current.is(punct) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, punct: Punct) -> Result<(), ParseError> {
        if !self.eat(punct)? {
            return Err(self.unexpected(&format!("{punct:?}")));
        }
        Ok(())
    }

    fn unexpected(&self, wanted: &str) -> ParseError {
        ParseError::new(
            format!("expected {wanted}, found {}", self.current.describe()),
            self.current.line,
            self.current.column,
        )
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current.line, self.current.column)
    }

    /// ASI: a statement ends at `;`, before `}`, at EOF, or at a line
    /// break.
    fn expect_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat(Punct::Semicolon)? {
            return Ok(());
        }
        if self.current.is(Punct::RBrace)
            || matches!(self.current.kind, TokenKind::Eof)
            || self.current.newline_before
        {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    fn identifier(&mut self) -> Result<Name, ParseError> {
        match self.current.kind {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    // === Statements ===

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.current.kind {
            TokenKind::Punct(Punct::LBrace) => {
                Ok(Statement::Block(self.parse_brace_block()?))
            }
            TokenKind::Punct(Punct::Semicolon) => {
                self.advance()?;
                Ok(Statement::Empty)
            }
            TokenKind::Keyword(keyword) => {
                let keyword = *keyword;
                match keyword {
                    Keyword::Var => self.parse_variable_statement(DeclarationKind::Var),
                    Keyword::Let => self.parse_variable_statement(DeclarationKind::Let),
                    Keyword::Const => self.parse_variable_statement(DeclarationKind::Const),
                    Keyword::Function => {
                        let function = self.parse_function(true)?;
                        Ok(Statement::FunctionDeclaration(Rc::new(function)))
                    }
                    Keyword::If => self.parse_if(),
                    Keyword::While => self.parse_while(),
                    Keyword::Do => self.parse_do_while(),
                    Keyword::For => self.parse_for(),
                    Keyword::Return => self.parse_return(),
                    Keyword::Break => self.parse_break_like(true),
                    Keyword::Continue => self.parse_break_like(false),
                    Keyword::Try => self.parse_try(),
                    Keyword::Throw => {
                        // `throw x;` is an expression statement over the
                        // dialect's `throw` unary operator.
                        let expr = self.parse_expr()?;
                        self.expect_semicolon()?;
                        Ok(Statement::Expression(expr))
                    }
                    Keyword::Null | Keyword::True | Keyword::False | Keyword::Typeof
                    | Keyword::Void | Keyword::Delete | Keyword::Async => {
                        let expr = self.parse_expr()?;
                        self.expect_semicolon()?;
                        Ok(Statement::Expression(expr))
                    }
                    other => Err(self.error_here(format!(
                        "unsupported statement keyword '{}'",
                        other.as_str()
                    ))),
                }
            }
            _ => {
                let expr = self.parse_expr()?;
                // `name:` introduces a labeled statement.
                if let Expression::Identifier(label) = &expr {
                    if self.current.is(Punct::Colon) {
                        let label = *label;
                        self.advance()?;
                        let body = self.parse_statement()?;
                        return Ok(Statement::Labeled {
                            label,
                            body: Box::new(body),
                        });
                    }
                }
                self.expect_semicolon()?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    fn parse_brace_block(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect(Punct::LBrace)?;
        let mut body = Vec::new();
        while !self.current.is(Punct::RBrace) {
            if matches!(self.current.kind, TokenKind::Eof) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance()?;
        Ok(body)
    }

    fn parse_variable_statement(
        &mut self,
        kind: DeclarationKind,
    ) -> Result<Statement, ParseError> {
        self.advance()?;
        let declarations = self.parse_declarator_list()?;
        self.expect_semicolon()?;
        Ok(Statement::VariableDeclaration { kind, declarations })
    }

    fn parse_declarator_list(&mut self) -> Result<Vec<VariableDeclarator>, ParseError> {
        let mut declarations = Vec::new();
        loop {
            let target = self.parse_binding_pattern()?;
            let init = if self.eat(Punct::Assign)? {
                Some(self.parse_assignment_expr()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator { target, init });
            if !self.eat(Punct::Comma)? {
                break;
            }
        }
        Ok(declarations)
    }

    /// Binding patterns parse shallowly; anything beyond a plain
    /// identifier is rejected downstream by the evaluator, by name.
    fn parse_binding_pattern(&mut self) -> Result<Pattern, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = *name;
                self.advance()?;
                Ok(Pattern::Identifier(name))
            }
            TokenKind::Punct(Punct::Ellipsis) => {
                self.advance()?;
                let inner = self.parse_binding_pattern()?;
                Ok(Pattern::Rest(Box::new(inner)))
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.advance()?;
                let mut elements = Vec::new();
                while !self.current.is(Punct::RBracket) {
                    if self.eat(Punct::Comma)? {
                        elements.push(None);
                        continue;
                    }
                    elements.push(Some(self.parse_binding_pattern()?));
                    if !self.current.is(Punct::RBracket) {
                        self.expect(Punct::Comma)?;
                    }
                }
                self.advance()?;
                Ok(Pattern::Array(elements))
            }
            TokenKind::Punct(Punct::LBrace) => {
                self.advance()?;
                let mut properties = Vec::new();
                while !self.current.is(Punct::RBrace) {
                    let key = self.identifier()?;
                    let value = if self.eat(Punct::Colon)? {
                        self.parse_binding_pattern()?
                    } else {
                        Pattern::Identifier(key)
                    };
                    properties.push((key, value));
                    if !self.current.is(Punct::RBrace) {
                        self.expect(Punct::Comma)?;
                    }
                }
                self.advance()?;
                Ok(Pattern::Object(properties))
            }
            _ => Err(self.unexpected("binding pattern")),
        }
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.expect(Punct::LParen)?;
        let test = self.parse_expr()?;
        self.expect(Punct::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.current.is_keyword(Keyword::Else) {
            self.advance()?;
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.expect(Punct::LParen)?;
        let test = self.parse_expr()?;
        self.expect(Punct::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While { test, body })
    }

    fn parse_do_while(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let body = Box::new(self.parse_statement()?);
        if !self.current.is_keyword(Keyword::While) {
            return Err(self.unexpected("'while'"));
        }
        self.advance()?;
        self.expect(Punct::LParen)?;
        let test = self.parse_expr()?;
        self.expect(Punct::RParen)?;
        self.expect_semicolon()?;
        Ok(Statement::DoWhile { body, test })
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        self.expect(Punct::LParen)?;
        let init = if self.current.is(Punct::Semicolon) {
            None
        } else if self.current.is_keyword(Keyword::Var)
            || self.current.is_keyword(Keyword::Let)
            || self.current.is_keyword(Keyword::Const)
        {
            let kind = match self.current.kind {
                TokenKind::Keyword(Keyword::Var) => DeclarationKind::Var,
                TokenKind::Keyword(Keyword::Let) => DeclarationKind::Let,
                _ => DeclarationKind::Const,
            };
            self.advance()?;
            let declarations = self.parse_declarator_list()?;
            self.reject_for_in_of()?;
            Some(ForInit::Declaration { kind, declarations })
        } else {
            let expr = self.parse_expr()?;
            self.reject_for_in_of()?;
            Some(ForInit::Expression(expr))
        };
        self.expect(Punct::Semicolon)?;
        let test = if self.current.is(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(Punct::Semicolon)?;
        let update = if self.current.is(Punct::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(Punct::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For {
            init,
            test,
            update,
            body,
        })
    }

    fn reject_for_in_of(&self) -> Result<(), ParseError> {
        if self.current.is_keyword(Keyword::In) || self.current.is_keyword(Keyword::Of) {
            return Err(self.error_here("for-in/for-of loops are not supported"));
        }
        Ok(())
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let argument = if self.current.is(Punct::Semicolon)
            || self.current.is(Punct::RBrace)
            || matches!(self.current.kind, TokenKind::Eof)
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_semicolon()?;
        Ok(Statement::Return(argument))
    }

    fn parse_break_like(&mut self, is_break: bool) -> Result<Statement, ParseError> {
        self.advance()?;
        let label = match self.current.kind {
            TokenKind::Identifier(name) if !self.current.newline_before => {
                self.advance()?;
                Some(name)
            }
            _ => None,
        };
        self.expect_semicolon()?;
        Ok(if is_break {
            Statement::Break { label }
        } else {
            Statement::Continue { label }
        })
    }

    fn parse_try(&mut self) -> Result<Statement, ParseError> {
        self.advance()?;
        let block = self.parse_brace_block()?;
        let handler = if self.current.is_keyword(Keyword::Catch) {
            self.advance()?;
            let param = if self.eat(Punct::LParen)? {
                let pattern = self.parse_binding_pattern()?;
                self.expect(Punct::RParen)?;
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_brace_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.current.is_keyword(Keyword::Finally) {
            self.advance()?;
            Some(self.parse_brace_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_here("try statement without catch or finally"));
        }
        Ok(Statement::Try(Box::new(TryStatement {
            block,
            handler,
            finalizer,
        })))
    }

    fn parse_function(&mut self, require_name: bool) -> Result<Function, ParseError> {
        debug_assert!(self.current.is_keyword(Keyword::Function));
        self.advance()?;
        let is_generator = self.eat(Punct::Star)?;
        let name = match self.current.kind {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Some(name)
            }
            _ if require_name => return Err(self.unexpected("function name")),
            _ => None,
        };
        self.expect(Punct::LParen)?;
        let mut params = Vec::new();
        while !self.current.is(Punct::RParen) {
            params.push(self.parse_binding_pattern()?);
            if !self.current.is(Punct::RParen) {
                self.expect(Punct::Comma)?;
            }
        }
        self.advance()?;
        let body = self.parse_brace_block()?;
        Ok(Function {
            name,
            params,
            body,
            is_generator,
            is_async: false,
        })
    }

    // === Expressions ===

    fn parse_expr(&mut self) -> Result<Expression, ParseError> {
        let first = self.parse_assignment_expr()?;
        if !self.current.is(Punct::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat(Punct::Comma)? {
            expressions.push(self.parse_assignment_expr()?);
        }
        Ok(Expression::Sequence(expressions))
    }

    fn parse_assignment_expr(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_conditional_expr()?;
        let op = match self.current.kind {
            TokenKind::Punct(Punct::Assign) => AssignmentOp::Assign,
            TokenKind::Punct(Punct::PlusAssign) => AssignmentOp::AddAssign,
            TokenKind::Punct(Punct::MinusAssign) => AssignmentOp::SubAssign,
            TokenKind::Punct(Punct::StarAssign) => AssignmentOp::MulAssign,
            TokenKind::Punct(Punct::SlashAssign) => AssignmentOp::DivAssign,
            TokenKind::Punct(Punct::PercentAssign) => AssignmentOp::ModAssign,
            TokenKind::Punct(Punct::StarStarAssign) => AssignmentOp::ExpAssign,
            TokenKind::Punct(Punct::ShlAssign) => AssignmentOp::ShlAssign,
            TokenKind::Punct(Punct::ShrAssign) => AssignmentOp::ShrAssign,
            TokenKind::Punct(Punct::UShrAssign) => AssignmentOp::UShrAssign,
            TokenKind::Punct(Punct::AmpAssign) => AssignmentOp::BitAndAssign,
            TokenKind::Punct(Punct::PipeAssign) => AssignmentOp::BitOrAssign,
            TokenKind::Punct(Punct::CaretAssign) => AssignmentOp::BitXorAssign,
            _ => return Ok(left),
        };
        if !matches!(
            left,
            Expression::Identifier(_) | Expression::Member { .. }
        ) {
            return Err(self.error_here("invalid assignment target"));
        }
        self.advance()?;
        let value = self.parse_assignment_expr()?;
        Ok(Expression::Assignment {
            op,
            target: Box::new(left),
            value: Box::new(value),
        })
    }

    fn parse_conditional_expr(&mut self) -> Result<Expression, ParseError> {
        let test = self.parse_binary_expr(0)?;
        if !self.eat(Punct::Question)? {
            return Ok(test);
        }
        let consequent = self.parse_assignment_expr()?;
        self.expect(Punct::Colon)?;
        let alternate = self.parse_assignment_expr()?;
        Ok(Expression::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// Precedence climbing over binary and logical operators.
    fn parse_binary_expr(&mut self, min_precedence: u8) -> Result<Expression, ParseError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let Some((precedence, op)) = self.peek_binary_op() else {
                return Ok(left);
            };
            if precedence < min_precedence {
                return Ok(left);
            }
            self.advance()?;
            // `**` is right-associative; everything else here is left.
            let next_min = if matches!(op, BinOrLogical::Binary(BinaryOp::Exp)) {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_binary_expr(next_min)?;
            left = match op {
                BinOrLogical::Binary(op) => Expression::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                BinOrLogical::Logical(op) => Expression::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
    }

    fn peek_binary_op(&self) -> Option<(u8, BinOrLogical)> {
        use BinOrLogical::{Binary, Logical};
        let op = match self.current.kind {
            TokenKind::Punct(Punct::PipeGt) => (1, Binary(BinaryOp::Pipeline)),
            TokenKind::Punct(Punct::QuestionQuestion) => (2, Logical(LogicalOp::Coalesce)),
            TokenKind::Punct(Punct::PipePipe) => (2, Logical(LogicalOp::Or)),
            TokenKind::Punct(Punct::AmpAmp) => (3, Logical(LogicalOp::And)),
            TokenKind::Punct(Punct::Pipe) => (4, Binary(BinaryOp::BitOr)),
            TokenKind::Punct(Punct::Caret) => (5, Binary(BinaryOp::BitXor)),
            TokenKind::Punct(Punct::Amp) => (6, Binary(BinaryOp::BitAnd)),
            TokenKind::Punct(Punct::EqEq) => (7, Binary(BinaryOp::Eq)),
            TokenKind::Punct(Punct::NotEq) => (7, Binary(BinaryOp::NotEq)),
            TokenKind::Punct(Punct::EqEqEq) => (7, Binary(BinaryOp::StrictEq)),
            TokenKind::Punct(Punct::NotEqEq) => (7, Binary(BinaryOp::StrictNotEq)),
            TokenKind::Punct(Punct::Lt) => (8, Binary(BinaryOp::Lt)),
            TokenKind::Punct(Punct::LtEq) => (8, Binary(BinaryOp::LtEq)),
            TokenKind::Punct(Punct::Gt) => (8, Binary(BinaryOp::Gt)),
            TokenKind::Punct(Punct::GtEq) => (8, Binary(BinaryOp::GtEq)),
            TokenKind::Keyword(Keyword::In) => (8, Binary(BinaryOp::In)),
            TokenKind::Keyword(Keyword::Instanceof) => (8, Binary(BinaryOp::Instanceof)),
            TokenKind::Punct(Punct::Shl) => (9, Binary(BinaryOp::Shl)),
            TokenKind::Punct(Punct::Shr) => (9, Binary(BinaryOp::Shr)),
            TokenKind::Punct(Punct::UShr) => (9, Binary(BinaryOp::UShr)),
            TokenKind::Punct(Punct::Plus) => (10, Binary(BinaryOp::Add)),
            TokenKind::Punct(Punct::Minus) => (10, Binary(BinaryOp::Sub)),
            TokenKind::Punct(Punct::Star) => (11, Binary(BinaryOp::Mul)),
            TokenKind::Punct(Punct::Slash) => (11, Binary(BinaryOp::Div)),
            TokenKind::Punct(Punct::Percent) => (11, Binary(BinaryOp::Mod)),
            TokenKind::Punct(Punct::StarStar) => (12, Binary(BinaryOp::Exp)),
            _ => return None,
        };
        Some(op)
    }

    fn parse_unary_expr(&mut self) -> Result<Expression, ParseError> {
        let op = match self.current.kind {
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Minus),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOp::Typeof),
            TokenKind::Keyword(Keyword::Void) => Some(UnaryOp::Void),
            TokenKind::Keyword(Keyword::Delete) => Some(UnaryOp::Delete),
            TokenKind::Keyword(Keyword::Throw) => Some(UnaryOp::Throw),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            // `throw` takes a full assignment-level operand so the common
            // `throw a + 'b'` statement shape keeps its meaning.
            let argument = if op == UnaryOp::Throw {
                self.parse_assignment_expr()?
            } else {
                self.parse_unary_expr()?
            };
            return Ok(Expression::Unary {
                op,
                argument: Box::new(argument),
            });
        }
        if self.current.is(Punct::PlusPlus) || self.current.is(Punct::MinusMinus) {
            let op = if self.current.is(Punct::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance()?;
            let argument = self.parse_unary_expr()?;
            return Ok(Expression::Update {
                op,
                prefix: true,
                argument: Box::new(argument),
            });
        }
        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_call_member_expr()?;
        if (self.current.is(Punct::PlusPlus) || self.current.is(Punct::MinusMinus))
            && !self.current.newline_before
        {
            let op = if self.current.is(Punct::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance()?;
            return Ok(Expression::Update {
                op,
                prefix: false,
                argument: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn parse_call_member_expr(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            if self.eat(Punct::Dot)? {
                let name = self.property_name()?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property: Box::new(Expression::Identifier(name)),
                    computed: false,
                    optional: false,
                };
            } else if self.eat(Punct::QuestionDot)? {
                if self.current.is(Punct::LBracket) {
                    self.advance()?;
                    let property = self.parse_expr()?;
                    self.expect(Punct::RBracket)?;
                    expr = Expression::Member {
                        object: Box::new(expr),
                        property: Box::new(property),
                        computed: true,
                        optional: true,
                    };
                } else {
                    let name = self.property_name()?;
                    expr = Expression::Member {
                        object: Box::new(expr),
                        property: Box::new(Expression::Identifier(name)),
                        computed: false,
                        optional: true,
                    };
                }
            } else if self.eat(Punct::LBracket)? {
                let property = self.parse_expr()?;
                self.expect(Punct::RBracket)?;
                expr = Expression::Member {
                    object: Box::new(expr),
                    property: Box::new(property),
                    computed: true,
                    optional: false,
                };
            } else if self.current.is(Punct::LParen) {
                self.advance()?;
                let mut arguments = Vec::new();
                while !self.current.is(Punct::RParen) {
                    arguments.push(self.parse_assignment_expr()?);
                    if !self.current.is(Punct::RParen) {
                        self.expect(Punct::Comma)?;
                    }
                }
                self.advance()?;
                expr = Expression::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Property names after `.` accept reserved words (`a.catch`).
    fn property_name(&mut self) -> Result<Name, ParseError> {
        match self.current.kind {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            TokenKind::Keyword(keyword) => {
                self.advance()?;
                Ok(self.interner.intern(keyword.as_str()))
            }
            _ => Err(self.unexpected("property name")),
        }
    }

    fn parse_primary_expr(&mut self) -> Result<Expression, ParseError> {
        // A slash in operand position starts a regex literal; re-lex it.
        if let TokenKind::Punct(punct) = self.current.kind {
            if crate::lexer::is_slash_like(punct) {
                let token = self.lexer.relex_regex(self.current.start)?;
                self.current = token;
            }
        }
        match self.current.kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(Expression::Identifier(name))
            }
            TokenKind::Number(value) => {
                self.advance()?;
                Ok(Expression::Number(value))
            }
            TokenKind::String(value) => {
                self.advance()?;
                Ok(Expression::String(value))
            }
            TokenKind::BigInt(value) => {
                self.advance()?;
                Ok(Expression::BigInt(value))
            }
            TokenKind::Regex { pattern, flags } => {
                self.advance()?;
                Ok(Expression::Regex { pattern, flags })
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance()?;
                Ok(Expression::Null)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance()?;
                Ok(Expression::Boolean(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance()?;
                Ok(Expression::Boolean(false))
            }
            TokenKind::Keyword(Keyword::Function) => {
                let function = self.parse_function(false)?;
                Ok(Expression::Function(Rc::new(function)))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(Punct::RParen)?;
                Ok(expr)
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.advance()?;
                let mut elements = Vec::new();
                while !self.current.is(Punct::RBracket) {
                    if self.eat(Punct::Comma)? {
                        elements.push(None);
                        continue;
                    }
                    elements.push(Some(self.parse_assignment_expr()?));
                    if !self.current.is(Punct::RBracket) {
                        self.expect(Punct::Comma)?;
                    }
                }
                self.advance()?;
                Ok(Expression::Array(elements))
            }
            TokenKind::Keyword(keyword) => Err(self.error_here(format!(
                "unsupported expression keyword '{}'",
                keyword.as_str()
            ))),
            _ => Err(self.unexpected("expression")),
        }
    }
}

enum BinOrLogical {
    Binary(BinaryOp),
    Logical(LogicalOp),
}
