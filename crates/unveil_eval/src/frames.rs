//! Execution contexts and the callstack.
//!
//! Every structural construct that owns a scope pushes an
//! [`ExecutionContext`]; non-local control (`return`, `break`) consults the
//! stack to find its target and to decide whether a tainted scope sits in
//! between.

use unveil_ast::Name;

use crate::diagnostics::{internal_invariant, EvalError};
use crate::Environment;

/// Structural kind of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextKind {
    Program,
    Block,
    If,
    Conditional,
    While,
    DoWhile,
    For,
    Function,
    Label,
    Catch,
    Switch,
}

impl ContextKind {
    /// Whether `break` without a label targets this context.
    pub fn is_breakable(self) -> bool {
        matches!(
            self,
            ContextKind::While | ContextKind::DoWhile | ContextKind::For | ContextKind::Switch
        )
    }
}

/// A pushed context: scope, structural kind, optional label.
#[derive(Clone)]
pub struct ExecutionContext {
    pub environment: Environment,
    pub kind: ContextKind,
    pub label: Option<Name>,
}

impl ExecutionContext {
    /// Context without a label.
    pub fn new(environment: Environment, kind: ContextKind) -> Self {
        ExecutionContext {
            environment,
            kind,
            label: None,
        }
    }

    /// Labeled context.
    pub fn labeled(environment: Environment, kind: ContextKind, label: Name) -> Self {
        ExecutionContext {
            environment,
            kind,
            label: Some(label),
        }
    }
}

/// Ordered stack of execution contexts; top is current.
#[derive(Default)]
pub struct Callstack {
    frames: Vec<ExecutionContext>,
}

impl Callstack {
    /// Empty stack.
    pub fn new() -> Self {
        Callstack { frames: Vec::new() }
    }

    /// Push a context.
    pub fn push(&mut self, context: ExecutionContext) {
        self.frames.push(context);
    }

    /// Pop the top context.
    pub fn pop(&mut self) -> Option<ExecutionContext> {
        self.frames.pop()
    }

    /// Current depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The current context.
    pub fn top(&self) -> Result<&ExecutionContext, EvalError> {
        self.frames
            .last()
            .ok_or_else(|| internal_invariant("evaluation outside any context"))
    }

    /// The current environment.
    pub fn environment(&self) -> Result<Environment, EvalError> {
        Ok(self.top()?.environment.clone())
    }

    /// The innermost `Function` context, target of `return`.
    pub fn innermost_function(&self) -> Option<&ExecutionContext> {
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.kind == ContextKind::Function)
    }

    /// The innermost target of `break`: the matching label when one is
    /// given, the nearest breakable kind otherwise. The search stops at a
    /// function boundary; `break` never crosses one.
    pub fn innermost_breakable(&self, label: Option<Name>) -> Option<&ExecutionContext> {
        for frame in self.frames.iter().rev() {
            if frame.kind == ContextKind::Function {
                return None;
            }
            match label {
                Some(label) => {
                    if frame.label == Some(label) {
                        return Some(frame);
                    }
                }
                None => {
                    if frame.kind.is_breakable() {
                        return Some(frame);
                    }
                }
            }
        }
        None
    }
}
