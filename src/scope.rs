// ABOUTME: Linked lexical frames: declare in the current frame, assign and look up by walking parents

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::value::{self, Value};

#[derive(Debug)]
pub struct Scope {
    vars: RwLock<HashMap<String, Value>>,
    parent: Option<Arc<Scope>>,
    /// A fork boundary: assignment never writes past this frame
    barrier: bool,
}

impl Scope {
    /// Creates a root frame with no parent
    pub fn root() -> Arc<Self> {
        Arc::new(Scope {
            vars: RwLock::new(HashMap::new()),
            parent: None,
            barrier: false,
        })
    }

    /// Creates a child frame; lookups fall through to the parent
    pub fn child(parent: &Arc<Scope>) -> Arc<Self> {
        Arc::new(Scope {
            vars: RwLock::new(HashMap::new()),
            parent: Some(Arc::clone(parent)),
            barrier: false,
        })
    }

    /// Creates a forked root: the origin's bindings stay readable, but
    /// assignments to them shadow here instead of mutating the origin.
    pub fn fork_root(parent: &Arc<Scope>) -> Arc<Self> {
        Arc::new(Scope {
            vars: RwLock::new(HashMap::new()),
            parent: Some(Arc::clone(parent)),
            barrier: true,
        })
    }

    /// Binds a name in THIS frame, shadowing any outer binding
    pub fn declare(&self, name: impl Into<String>, val: Value) {
        value::write(&self.vars).insert(name.into(), val);
    }

    /// Walks leaf-to-root and returns the nearest binding
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = value::read(&self.vars).get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Walks to the frame that owns `name` and overwrites it there.
    /// Returns false (and stores nothing) when the name is unbound anywhere.
    /// The walk never crosses a fork boundary: a name owned beyond it is
    /// shadowed at the boundary frame so the origin is left untouched.
    pub fn assign(&self, name: &str, val: Value) -> bool {
        let mut frame: Option<&Scope> = Some(self);
        while let Some(scope) = frame {
            if value::read(&scope.vars).contains_key(name) {
                value::write(&scope.vars).insert(name.to_string(), val);
                return true;
            }
            if scope.barrier {
                let visible = scope
                    .parent
                    .as_ref()
                    .is_some_and(|p| p.lookup(name).is_some());
                if visible {
                    scope.declare(name, val);
                    return true;
                }
                return false;
            }
            frame = scope.parent.as_deref();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let scope = Scope::root();
        scope.declare("x", Value::Int(42));
        assert_eq!(scope.lookup("x"), Some(Value::Int(42)));
        assert_eq!(scope.lookup("missing"), None);
    }

    #[test]
    fn test_shadowing() {
        let parent = Scope::root();
        parent.declare("x", Value::Int(1));
        let child = Scope::child(&parent);
        child.declare("x", Value::Int(2));
        assert_eq!(child.lookup("x"), Some(Value::Int(2)));
        assert_eq!(parent.lookup("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_assign_walks_to_owner() {
        let parent = Scope::root();
        parent.declare("x", Value::Int(1));
        let child = Scope::child(&parent);
        assert!(child.assign("x", Value::Int(9)));
        assert_eq!(parent.lookup("x"), Some(Value::Int(9)));
    }

    #[test]
    fn test_assign_unbound_is_noop() {
        let scope = Scope::root();
        assert!(!scope.assign("ghost", Value::Int(1)));
        assert_eq!(scope.lookup("ghost"), None);
    }

    #[test]
    fn test_fork_barrier_shadows_instead_of_mutating() {
        let origin = Scope::root();
        origin.declare("x", Value::Int(1));
        let fork = Scope::fork_root(&origin);
        let inner = Scope::child(&fork);
        assert!(inner.assign("x", Value::Int(9)));
        assert_eq!(origin.lookup("x"), Some(Value::Int(1)));
        assert_eq!(fork.lookup("x"), Some(Value::Int(9)));
        assert!(!inner.assign("ghost", Value::Int(1)));
    }

    #[test]
    fn test_multiple_levels() {
        let a = Scope::root();
        a.declare("a", Value::Int(1));
        let b = Scope::child(&a);
        b.declare("b", Value::Int(2));
        let c = Scope::child(&b);
        c.declare("c", Value::Int(3));
        assert_eq!(c.lookup("a"), Some(Value::Int(1)));
        assert_eq!(c.lookup("b"), Some(Value::Int(2)));
        assert_eq!(c.lookup("c"), Some(Value::Int(3)));
    }
}
