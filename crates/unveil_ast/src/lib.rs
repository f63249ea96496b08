//! Syntax tree dialect for the unveil deobfuscator.
//!
//! This crate defines the tree the parser produces and the evaluator
//! consumes: flat statement/expression enums, operator sets, an identifier
//! interner, and the structural equivalence predicate used for loop
//! fixed-point detection.
//!
//! The dialect is the supported subset of the common JS AST shape: `var`
//! declarations, functions, the full expression operator set, `if`/loops,
//! `try`/`catch`, labels and `break`. Constructs outside the subset are
//! representable where the evaluator needs to reject them by name
//! (`let`/`const`, destructuring patterns, generator/async flags, `|>`).

mod equiv;
mod interner;
mod name;
mod node;
mod ops;

pub use equiv::{equivalent, equivalent_expr, equivalent_stmts};
pub use interner::StringInterner;
pub use name::Name;
pub use node::{
    is_identifier_name, CatchClause, Expression, ForInit, Function, Pattern, Program, Statement,
    TryStatement, VariableDeclarator,
};
pub use ops::{AssignmentOp, BinaryOp, DeclarationKind, LogicalOp, UnaryOp, UpdateOp};
