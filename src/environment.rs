//! Slot‑addressed lexical scopes.
//!
//! Every scope is an append‑only list of `(name, value)` slots. The resolver
//! hands the interpreter a `(distance, index)` pair for each local access;
//! the interpreter walks `distance` enclosing links and indexes directly, so
//! no name lookup ever happens at runtime for a resolved variable. Names are
//! kept only for debugging.
//!
//! The top level is not an `Environment`: code executing there has no
//! active scope and its declarations go to the interpreter's global map.

use crate::value::Value;
use log::{debug, trace};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a scope. Closures, bound methods and active call frames
/// all hold one.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: Vec<(String, Value)>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: Vec::new(),
            enclosing: None,
        }
    }

    /// A child scope of `enclosing`; `None` means the child sits directly
    /// under the global namespace.
    pub fn with_enclosing(enclosing: Option<EnvRef>) -> Self {
        Environment {
            values: Vec::new(),
            enclosing,
        }
    }

    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Append a slot; its index is the number of slots defined before it.
    pub fn define(&mut self, name: &str, value: Value) -> usize {
        trace!("define slot {} = '{}'", self.values.len(), name);

        self.values.push((name.to_string(), value));
        self.values.len() - 1
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn enclosing(&self) -> Option<&EnvRef> {
        self.enclosing.as_ref()
    }

    /// Name stored in slot `index` of this scope.
    pub fn slot_name(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(|(name, _)| name.as_str())
    }

    /// Walk `distance` enclosing links starting at `env`.
    ///
    /// # Panics
    ///
    /// Walking past the outermost scope means the resolver and interpreter
    /// disagree about scope layout; that is a bug, not a user error.
    pub fn ancestor(env: &EnvRef, distance: usize) -> EnvRef {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .clone()
                .expect("resolved scope distance walks past the outermost scope");
            current = next;
        }

        current
    }

    /// Read slot `index` of the scope `distance` links above `env`. `None`
    /// if that slot has not been defined yet, which happens when a closure
    /// runs inside its own variable's initializer.
    pub fn get_at(env: &EnvRef, distance: usize, index: usize) -> Option<Value> {
        let scope = Self::ancestor(env, distance);
        let value = scope.borrow().values.get(index).map(|(_, value)| value.clone());

        if value.is_none() {
            debug!("slot {} at distance {} is not defined yet", index, distance);
        }

        value
    }

    /// Overwrite slot `index` of the scope `distance` links above `env`.
    /// Returns `false` if the slot has not been defined yet.
    pub fn assign_at(env: &EnvRef, value: Value, distance: usize, index: usize) -> bool {
        let scope = Self::ancestor(env, distance);
        let mut scope = scope.borrow_mut();

        match scope.values.get_mut(index) {
            Some(slot) => {
                slot.1 = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_returns_sequential_indices() {
        let mut env = Environment::new();

        assert_eq!(env.define("a", Value::Number(1.0)), 0);
        assert_eq!(env.define("b", Value::Number(2.0)), 1);
        assert_eq!(env.len(), 2);
        assert_eq!(env.slot_name(1), Some("b"));
    }

    #[test]
    fn get_and_assign_walk_enclosing_links() {
        let outer = Environment::new().into_ref();
        outer.borrow_mut().define("x", Value::Number(1.0));

        let inner = Environment::with_enclosing(Some(Rc::clone(&outer))).into_ref();
        inner.borrow_mut().define("y", Value::Bool(true));

        assert_eq!(Environment::get_at(&inner, 1, 0), Some(Value::Number(1.0)));
        assert_eq!(Environment::get_at(&inner, 0, 0), Some(Value::Bool(true)));

        assert!(Environment::assign_at(&inner, Value::Number(9.0), 1, 0));
        assert_eq!(Environment::get_at(&outer, 0, 0), Some(Value::Number(9.0)));
    }

    #[test]
    fn siblings_share_their_parent() {
        let parent = Environment::new().into_ref();
        parent.borrow_mut().define("shared", Value::Number(0.0));

        let left = Environment::with_enclosing(Some(Rc::clone(&parent))).into_ref();
        let right = Environment::with_enclosing(Some(Rc::clone(&parent))).into_ref();

        Environment::assign_at(&left, Value::Number(5.0), 1, 0);
        assert_eq!(Environment::get_at(&right, 1, 0), Some(Value::Number(5.0)));
    }

    #[test]
    fn undefined_slots_are_reported_not_fabricated() {
        let outer = Environment::new().into_ref();
        let inner = Environment::with_enclosing(Some(Rc::clone(&outer))).into_ref();

        assert_eq!(Environment::get_at(&inner, 1, 0), None);
        assert!(!Environment::assign_at(&inner, Value::Nil, 1, 0));
        assert!(outer.borrow().is_empty());
    }

    #[test]
    #[should_panic(expected = "walks past the outermost scope")]
    fn walking_past_the_root_is_a_bug() {
        let env = Environment::new().into_ref();
        Environment::ancestor(&env, 1);
    }
}
