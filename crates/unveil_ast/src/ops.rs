//! Operator enums for the tree dialect.
//!
//! Flat enums with source-text names; pattern matching replaces any form of
//! dynamic dispatch.

use std::fmt;

/// Binary operators.
///
/// `Pipeline` (`|>`) is representable so the evaluator can reject it with a
/// proper diagnostic instead of a parse failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
    Pipeline,
}

impl BinaryOp {
    /// Source text of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::In => "in",
            BinaryOp::Instanceof => "instanceof",
            BinaryOp::Pipeline => "|>",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short-circuiting logical operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

impl LogicalOp {
    /// Source text of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Coalesce => "??",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unary operators.
///
/// The dialect models `throw` as a prefix operator, so `throw x;` is an
/// expression statement. `Delete` is representable but rejected by the
/// evaluator (no object model).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Typeof,
    Not,
    Plus,
    Minus,
    BitNot,
    Void,
    Throw,
    Delete,
}

impl UnaryOp {
    /// Source text of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Typeof => "typeof",
            UnaryOp::Not => "!",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::Void => "void",
            UnaryOp::Throw => "throw",
            UnaryOp::Delete => "delete",
        }
    }

    /// Whether the operator is spelled as a keyword (needs a trailing space).
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Throw | UnaryOp::Delete
        )
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Update operators (`++`, `--`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    /// Source text of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

impl fmt::Display for UpdateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assignment operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignmentOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ExpAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
}

impl AssignmentOp {
    /// Source text of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentOp::Assign => "=",
            AssignmentOp::AddAssign => "+=",
            AssignmentOp::SubAssign => "-=",
            AssignmentOp::MulAssign => "*=",
            AssignmentOp::DivAssign => "/=",
            AssignmentOp::ModAssign => "%=",
            AssignmentOp::ExpAssign => "**=",
            AssignmentOp::ShlAssign => "<<=",
            AssignmentOp::ShrAssign => ">>=",
            AssignmentOp::UShrAssign => ">>>=",
            AssignmentOp::BitAndAssign => "&=",
            AssignmentOp::BitOrAssign => "|=",
            AssignmentOp::BitXorAssign => "^=",
        }
    }

    /// The binary operator behind a compound assignment, or `None` for `=`.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignmentOp::Assign => None,
            AssignmentOp::AddAssign => Some(BinaryOp::Add),
            AssignmentOp::SubAssign => Some(BinaryOp::Sub),
            AssignmentOp::MulAssign => Some(BinaryOp::Mul),
            AssignmentOp::DivAssign => Some(BinaryOp::Div),
            AssignmentOp::ModAssign => Some(BinaryOp::Mod),
            AssignmentOp::ExpAssign => Some(BinaryOp::Exp),
            AssignmentOp::ShlAssign => Some(BinaryOp::Shl),
            AssignmentOp::ShrAssign => Some(BinaryOp::Shr),
            AssignmentOp::UShrAssign => Some(BinaryOp::UShr),
            AssignmentOp::BitAndAssign => Some(BinaryOp::BitAnd),
            AssignmentOp::BitOrAssign => Some(BinaryOp::BitOr),
            AssignmentOp::BitXorAssign => Some(BinaryOp::BitXor),
        }
    }
}

impl fmt::Display for AssignmentOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration kinds. Only `var` is evaluated; the block-scoped kinds are
/// representable so the evaluator can name them in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Var,
    Let,
    Const,
}

impl DeclarationKind {
    /// Source text of the keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            DeclarationKind::Var => "var",
            DeclarationKind::Let => "let",
            DeclarationKind::Const => "const",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_ops_map_to_binary() {
        assert_eq!(AssignmentOp::AddAssign.binary_op(), Some(BinaryOp::Add));
        assert_eq!(AssignmentOp::UShrAssign.binary_op(), Some(BinaryOp::UShr));
        assert_eq!(AssignmentOp::Assign.binary_op(), None);
    }

    #[test]
    fn operator_display_matches_source() {
        assert_eq!(BinaryOp::UShr.to_string(), ">>>");
        assert_eq!(LogicalOp::Coalesce.to_string(), "??");
        assert_eq!(UnaryOp::Typeof.to_string(), "typeof");
        assert_eq!(UpdateOp::Decrement.to_string(), "--");
    }
}
