//! Scoped environments with taint gates.
//!
//! An [`Environment`] is a reference-counted handle to one scope record plus
//! a parent link. Handles are shared: the two branch environments of an
//! ambiguous conditional point at the same parent, so `Rc<RefCell<..>>` is
//! the ownership model (single-threaded by design).
//!
//! Three gates drive the taint semantics:
//!
//! - `taint_parent_writes`: a write that would land in an ancestor scope
//!   stores a tainted reference instead of a concrete value. No ancestor
//!   ever observes a concrete value written under an unknown condition.
//! - `taint_parent_reads`: a read resolving in an ancestor returns a fresh
//!   tainted reference, never the stored carrier.
//! - `ignore_reference_exception`: reads of unknown names implicitly declare
//!   them locally as tainted references instead of failing. Used when a
//!   fragment is simplified in isolation (function bodies, ambiguous loops).

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use unveil_ast::{Expression, Name};

use crate::diagnostics::{reference_unresolved, type_error, EvalError};
use crate::{SharedArray, TaintedValue, Value};

struct Scope {
    record: FxHashMap<Name, TaintedValue>,
    parent: Option<Environment>,
    taint_parent_writes: bool,
    taint_parent_reads: bool,
    ignore_reference_exception: bool,
}

/// One step of a member path: the evaluated key and the residual member
/// expression up to and including that key (e.g. `a[4]`, then `a[4][1]`).
pub struct MemberStep {
    pub key: TaintedValue,
    pub node: Expression,
}

/// Handle to a scope in the environment chain.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    /// Create a root scope with all gates off.
    pub fn new_root() -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            record: FxHashMap::default(),
            parent: None,
            taint_parent_writes: false,
            taint_parent_reads: false,
            ignore_reference_exception: false,
        })))
    }

    /// Create a child scope of `self` with all gates off.
    pub fn child(&self) -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            record: FxHashMap::default(),
            parent: Some(self.clone()),
            taint_parent_writes: false,
            taint_parent_reads: false,
            ignore_reference_exception: false,
        })))
    }

    /// Identity comparison of scope handles.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Set the parent-write gate.
    pub fn set_taint_parent_writes(&self, flag: bool) {
        self.0.borrow_mut().taint_parent_writes = flag;
    }

    /// The parent-write gate.
    pub fn taint_parent_writes(&self) -> bool {
        self.0.borrow().taint_parent_writes
    }

    /// Set the parent-read gate.
    pub fn set_taint_parent_reads(&self, flag: bool) {
        self.0.borrow_mut().taint_parent_reads = flag;
    }

    /// Set reference tolerance.
    pub fn set_ignore_reference_exception(&self, flag: bool) {
        self.0.borrow_mut().ignore_reference_exception = flag;
    }

    /// Idempotently declare `name` as untainted `undefined`. Redeclaration
    /// is tolerated; obfuscated sources redeclare freely.
    pub fn declare(&self, name: Name) {
        self.0
            .borrow_mut()
            .record
            .entry(name)
            .or_insert_with(TaintedValue::undefined);
    }

    /// Declare `name` locally as a tainted reference unless already present.
    pub fn declare_tainted_ref(&self, name: Name) {
        self.0
            .borrow_mut()
            .record
            .entry(name)
            .or_insert_with(|| TaintedValue::reference(name));
    }

    /// Whether `name` is bound in this scope's own record.
    pub fn has_local(&self, name: Name) -> bool {
        self.0.borrow().record.contains_key(&name)
    }

    /// Names bound in this scope's own record.
    pub fn local_names(&self) -> Vec<Name> {
        self.0.borrow().record.keys().copied().collect()
    }

    /// Drop all local bindings. Used between fixed-point passes so stale
    /// concrete values cannot poison the next simplification round.
    pub fn clear_locals(&self) {
        self.0.borrow_mut().record.clear();
    }

    /// Resolve `name` through the chain.
    ///
    /// Found in self: the stored carrier as-is. Found in an ancestor through
    /// a `taint_parent_reads` gate: a fresh tainted reference. Found in an
    /// ancestor otherwise: the carrier with its residual normalized to a
    /// reference, so the caller sees `name` rather than the stored form.
    /// Unresolved: an error, unless some scope on the chain tolerates
    /// unresolved references, in which case `name` is declared locally as a
    /// tainted reference.
    pub fn resolve(&self, name: Name, display: &str) -> Result<TaintedValue, EvalError> {
        if let Some(carrier) = self.0.borrow().record.get(&name) {
            return Ok(carrier.clone());
        }
        let mut read_gate = self.0.borrow().taint_parent_reads;
        let mut tolerant = self.0.borrow().ignore_reference_exception;
        let mut current = self.0.borrow().parent.clone();
        while let Some(env) = current {
            let scope = env.0.borrow();
            if let Some(carrier) = scope.record.get(&name) {
                if read_gate {
                    return Ok(TaintedValue::reference(name));
                }
                return Ok(carrier.with_reference_node(name));
            }
            read_gate |= scope.taint_parent_reads;
            tolerant |= scope.ignore_reference_exception;
            current = scope.parent.clone();
        }
        if tolerant {
            let carrier = TaintedValue::reference(name);
            self.0.borrow_mut().record.insert(name, carrier.clone());
            return Ok(carrier);
        }
        Err(reference_unresolved(display))
    }

    /// Locate the scope owning `name`, along with whether a
    /// `taint_parent_writes` gate sits between `self` (inclusive) and the
    /// owner (exclusive).
    fn owner_of(&self, name: Name) -> Option<(Environment, bool)> {
        let mut gate = false;
        let mut current = self.clone();
        loop {
            if current.has_local(name) {
                let gated = gate && !current.ptr_eq(self);
                return Some((current, gated));
            }
            gate |= current.0.borrow().taint_parent_writes;
            let parent = current.0.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// The root of the chain.
    fn root(&self) -> Environment {
        let mut current = self.clone();
        loop {
            let parent = current.0.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Assign `carrier` to `name`.
    ///
    /// A write crossing a `taint_parent_writes` gate into another scope
    /// stores a tainted reference instead. Unresolved names bind at the
    /// root, matching sloppy-mode global creation.
    pub fn assign(&self, name: Name, carrier: TaintedValue) {
        match self.owner_of(name) {
            Some((owner, gated)) => {
                let stored = if gated {
                    TaintedValue::reference(name)
                } else {
                    carrier
                };
                owner.0.borrow_mut().record.insert(name, stored);
            }
            None => {
                let root = self.root();
                let gated = !root.ptr_eq(self) && self.is_tainted_env(Some(&root));
                let stored = if gated {
                    TaintedValue::reference(name)
                } else {
                    carrier
                };
                root.0.borrow_mut().record.insert(name, stored);
            }
        }
    }

    /// Flip the taint bit on the resolved entry without changing its value.
    /// Tainting attaches a reference residual when none is present, keeping
    /// the carrier well-formed.
    pub fn set_taint(&self, name: Name, flag: bool) {
        if let Some((owner, _)) = self.owner_of(name) {
            let mut scope = owner.0.borrow_mut();
            if let Some(entry) = scope.record.get_mut(&name) {
                if flag && entry.node().is_none() {
                    entry.set_node(Expression::Identifier(name));
                }
                entry.set_tainted(flag);
            }
        }
    }

    /// Indexed store into the array bound at `obj`.
    ///
    /// Policies: a tainted object entry is a no-op; a write crossing a
    /// parent-write gate stores a tainted reference at the slot and degrades
    /// the ancestor's entry to a reference-form node (value kept internally
    /// so later index reads still work); otherwise a plain indexed store.
    pub fn assign_member(
        &self,
        obj: Name,
        key: &Value,
        carrier: TaintedValue,
        residual: Option<Expression>,
    ) -> Result<(), EvalError> {
        let Some((owner, gated)) = self.owner_of(obj) else {
            return Ok(());
        };
        let entry = match owner.0.borrow().record.get(&obj) {
            Some(entry) => entry.clone(),
            None => return Ok(()),
        };
        if entry.tainted() {
            return Ok(());
        }
        let Some(Value::Array(array)) = entry.value() else {
            // Primitive member writes are silently dropped, as the language
            // does. Nullish objects raised before we got here.
            return Ok(());
        };
        let Some(index) = value_to_index(key) else {
            // Non-index keys are outside the array model; degrade the whole
            // object so later reads stay residual.
            owner.set_taint(obj, true);
            return Ok(());
        };
        if gated {
            let node = residual.unwrap_or(Expression::Identifier(obj));
            array.set(index, TaintedValue::residual(node));
            let degraded = entry.with_reference_node(obj);
            owner.0.borrow_mut().record.insert(obj, degraded);
        } else {
            array.set(index, carrier);
        }
        Ok(())
    }

    /// Nested indexed store along `path` rooted at `obj`.
    ///
    /// A tainted step taints the sub-object being indexed (in place) and
    /// returns; the final step follows the [`Environment::assign_member`]
    /// gate rules.
    pub fn assign_nested_member(
        &self,
        obj: Name,
        path: &[MemberStep],
        carrier: TaintedValue,
        residual: Option<Expression>,
    ) -> Result<(), EvalError> {
        let Some((last, prefix)) = path.split_last() else {
            return Ok(());
        };
        if prefix.is_empty() {
            if last.key.tainted() {
                self.set_taint(obj, true);
                return Ok(());
            }
            let Some(key) = last.key.value() else {
                self.set_taint(obj, true);
                return Ok(());
            };
            return self.assign_member(obj, key, carrier, residual);
        }

        let Some((owner, gated)) = self.owner_of(obj) else {
            return Ok(());
        };
        let entry = match owner.0.borrow().record.get(&obj) {
            Some(entry) => entry.clone(),
            None => return Ok(()),
        };
        if entry.tainted() {
            return Ok(());
        }
        let Some(Value::Array(root_array)) = entry.value() else {
            return Ok(());
        };

        // Walk the untainted prefix, tracking the slot we arrived through so
        // a tainted step can degrade it in place.
        let mut current: SharedArray = root_array.clone();
        let mut came_from: Option<(SharedArray, usize)> = None;
        for (depth, step) in prefix.iter().enumerate() {
            if step.key.tainted() {
                taint_sub_object(self, obj, came_from, depth, &prefix[..depth]);
                return Ok(());
            }
            let Some(index) = step.key.value().and_then(value_to_index) else {
                taint_sub_object(self, obj, came_from, depth, &prefix[..depth]);
                return Ok(());
            };
            let element = current.get(index);
            match element {
                Some(element) if element.tainted() => return Ok(()),
                Some(element) => match element.value() {
                    Some(Value::Array(next)) => {
                        let next = next.clone();
                        came_from = Some((current, index));
                        current = next;
                    }
                    Some(value) if value.is_nullish() => {
                        return Err(type_error(format!(
                            "Cannot read properties of {}",
                            value.kind_name()
                        )));
                    }
                    _ => return Ok(()),
                },
                None => {
                    return Err(type_error("Cannot read properties of undefined"));
                }
            }
        }

        if last.key.tainted() {
            match came_from {
                Some((container, index)) => {
                    if let Some(element) = container.get(index) {
                        let node = prefix
                            .last()
                            .map(|step| step.node.clone())
                            .unwrap_or(Expression::Identifier(obj));
                        container.set(index, element.tainted_with(node));
                    }
                }
                None => self.set_taint(obj, true),
            }
            return Ok(());
        }
        let Some(index) = last.key.value().and_then(value_to_index) else {
            self.set_taint(obj, true);
            return Ok(());
        };
        if gated {
            let node = residual.unwrap_or_else(|| last.node.clone());
            current.set(index, TaintedValue::residual(node));
            let degraded = entry.with_reference_node(obj);
            owner.0.borrow_mut().record.insert(obj, degraded);
        } else {
            current.set(index, carrier);
        }
        Ok(())
    }

    /// Whether any scope from `self` (inclusive) to `limit` (exclusive, or
    /// the root) has its parent-write gate set.
    pub fn is_tainted_env(&self, limit: Option<&Environment>) -> bool {
        let mut current = self.clone();
        loop {
            if let Some(limit) = limit {
                if current.ptr_eq(limit) {
                    return false;
                }
            }
            if current.0.borrow().taint_parent_writes {
                return true;
            }
            let parent = current.0.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Parent-shadowing snapshot of every visible binding.
    pub fn copy_chain_flattened(&self) -> FxHashMap<Name, TaintedValue> {
        let mut snapshot = FxHashMap::default();
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let scope = env.0.borrow();
            for (name, carrier) in &scope.record {
                snapshot.entry(*name).or_insert_with(|| carrier.clone());
            }
            current = scope.parent.clone();
        }
        snapshot
    }
}

/// Degrade the sub-object reached by `walked` steps to a tainted carrier in
/// place: the root entry when the taint strikes at depth zero, the slot we
/// came through otherwise.
fn taint_sub_object(
    env: &Environment,
    obj: Name,
    came_from: Option<(SharedArray, usize)>,
    depth: usize,
    walked: &[MemberStep],
) {
    if depth == 0 {
        env.set_taint(obj, true);
        return;
    }
    if let Some((container, index)) = came_from {
        if let Some(element) = container.get(index) {
            let node = walked
                .last()
                .map(|step| step.node.clone())
                .unwrap_or(Expression::Identifier(obj));
            container.set(index, element.tainted_with(node));
        }
    }
}

/// Array index form of a concrete key, when it has one.
pub fn value_to_index(key: &Value) -> Option<usize> {
    match key {
        Value::Num(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
            Some(*n as usize)
        }
        Value::Str(s) => s.parse::<usize>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: u32) -> Name {
        Name::from_raw(raw + 100)
    }

    #[test]
    fn declare_is_idempotent() {
        let env = Environment::new_root();
        let x = name(1);
        env.declare(x);
        env.assign(x, TaintedValue::of(Value::Num(3.0)));
        env.declare(x);
        let carrier = env.resolve(x, "x").unwrap();
        assert!(matches!(carrier.value(), Some(Value::Num(n)) if *n == 3.0));
    }

    #[test]
    fn resolve_normalizes_ancestor_nodes_to_references() {
        let root = Environment::new_root();
        let x = name(2);
        root.declare(x);
        root.assign(x, TaintedValue::of(Value::Num(7.0)));

        let child = root.child();
        let carrier = child.resolve(x, "x").unwrap();
        assert!(!carrier.tainted());
        assert!(matches!(carrier.value(), Some(Value::Num(n)) if *n == 7.0));
        assert!(matches!(
            carrier.node(),
            Some(Expression::Identifier(n)) if *n == x
        ));
    }

    #[test]
    fn taint_parent_reads_returns_references() {
        let root = Environment::new_root();
        let x = name(3);
        root.declare(x);
        root.assign(x, TaintedValue::of(Value::Num(7.0)));

        let child = root.child();
        child.set_taint_parent_reads(true);
        let carrier = child.resolve(x, "x").unwrap();
        assert!(carrier.tainted());
        assert!(carrier.value().is_none());
    }

    #[test]
    fn unresolved_raises_unless_tolerant() {
        let env = Environment::new_root();
        let ghost = name(4);
        assert!(env.resolve(ghost, "ghost").is_err());

        env.set_ignore_reference_exception(true);
        let carrier = env.resolve(ghost, "ghost").unwrap();
        assert!(carrier.tainted());
        // Implicitly declared: a second resolve finds it locally.
        assert!(env.has_local(ghost));
    }

    #[test]
    fn tolerance_is_visible_from_children() {
        let root = Environment::new_root();
        root.set_ignore_reference_exception(true);
        let child = root.child();
        let ghost = name(5);
        let carrier = child.resolve(ghost, "ghost").unwrap();
        assert!(carrier.tainted());
        // Declared locally in the reader, not the tolerant ancestor.
        assert!(child.has_local(ghost));
        assert!(!root.has_local(ghost));
    }

    #[test]
    fn gated_parent_writes_degrade_to_references() {
        let root = Environment::new_root();
        let x = name(6);
        root.declare(x);
        root.assign(x, TaintedValue::of(Value::Num(1.0)));

        let branch = root.child();
        branch.set_taint_parent_writes(true);
        branch.assign(x, TaintedValue::of(Value::Num(2.0)));

        let stored = root.resolve(x, "x").unwrap();
        assert!(stored.tainted());
        assert!(stored.value().is_none());
    }

    #[test]
    fn local_writes_are_not_gated() {
        let branch = Environment::new_root().child();
        branch.set_taint_parent_writes(true);
        let x = name(7);
        branch.declare(x);
        branch.assign(x, TaintedValue::of(Value::Num(2.0)));
        let stored = branch.resolve(x, "x").unwrap();
        assert!(!stored.tainted());
    }

    #[test]
    fn unresolved_assignment_binds_at_root() {
        let root = Environment::new_root();
        let child = root.child();
        let x = name(8);
        child.assign(x, TaintedValue::of(Value::Num(5.0)));
        assert!(root.has_local(x));
    }

    #[test]
    fn member_store_through_gate_degrades_object() {
        let root = Environment::new_root();
        let a = name(9);
        root.declare(a);
        root.assign(
            a,
            TaintedValue::of(Value::Array(SharedArray::new(vec![
                TaintedValue::of(Value::Num(10.0)),
                TaintedValue::of(Value::Num(20.0)),
            ]))),
        );

        let branch = root.child();
        branch.set_taint_parent_writes(true);
        branch
            .assign_member(
                a,
                &Value::Num(0.0),
                TaintedValue::of(Value::Num(15.0)),
                Some(Expression::Identifier(a)),
            )
            .unwrap();

        let entry = root.resolve(a, "a").unwrap();
        // The entry stays untainted with a reference node; index reads still
        // see the array, with slot 0 degraded and slot 1 intact.
        assert!(!entry.tainted());
        assert!(matches!(entry.node(), Some(Expression::Identifier(_))));
        let Some(Value::Array(array)) = entry.value() else {
            panic!("array preserved");
        };
        assert!(array.get(0).unwrap().tainted());
        assert!(!array.get(1).unwrap().tainted());
    }

    #[test]
    fn plain_member_store() {
        let env = Environment::new_root();
        let a = name(10);
        env.declare(a);
        env.assign(
            a,
            TaintedValue::of(Value::Array(SharedArray::new(vec![TaintedValue::of(
                Value::Num(1.0),
            )]))),
        );
        env.assign_member(a, &Value::Num(0.0), TaintedValue::of(Value::Num(2.0)), None)
            .unwrap();
        let entry = env.resolve(a, "a").unwrap();
        let Some(Value::Array(array)) = entry.value() else {
            panic!("array preserved");
        };
        assert!(matches!(
            array.get(0).unwrap().value(),
            Some(Value::Num(n)) if *n == 2.0
        ));
    }

    #[test]
    fn tainted_env_range_check() {
        let root = Environment::new_root();
        let mid = root.child();
        let leaf = mid.child();
        assert!(!leaf.is_tainted_env(None));
        mid.set_taint_parent_writes(true);
        assert!(leaf.is_tainted_env(None));
        // With the limit placed at `mid`, the flagged scope is excluded.
        assert!(!leaf.is_tainted_env(Some(&mid)));
    }

    #[test]
    fn flattened_snapshot_shadows() {
        let root = Environment::new_root();
        let x = name(11);
        let y = name(12);
        root.declare(x);
        root.assign(x, TaintedValue::of(Value::Num(1.0)));
        root.declare(y);

        let child = root.child();
        child.declare(x);
        child.assign(x, TaintedValue::of(Value::Num(2.0)));

        let snapshot = child.copy_chain_flattened();
        assert!(matches!(
            snapshot.get(&x).and_then(|c| c.value()),
            Some(Value::Num(n)) if *n == 2.0
        ));
        assert!(snapshot.contains_key(&y));
    }

    #[test]
    fn index_conversion() {
        assert_eq!(value_to_index(&Value::Num(2.0)), Some(2));
        assert_eq!(value_to_index(&Value::str("3")), Some(3));
        assert_eq!(value_to_index(&Value::Num(1.5)), None);
        assert_eq!(value_to_index(&Value::Num(-1.0)), None);
        assert_eq!(value_to_index(&Value::str("x")), None);
    }
}
