// ABOUTME: The dynamic value union used throughout evaluation, plus host-side conversions

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::ast::{Block, TypeExpr};
use crate::error::Error;
use crate::host::{HostFn, HostRef, Reflect, TypeHandle};
use crate::reflect::BoundMethod;
use crate::scope::Scope;

/// Script lists are shared by reference: binding a list to a second name
/// aliases the same underlying storage.
pub type ListRef = Arc<RwLock<Vec<Value>>>;

/// Script maps are string-keyed and shared by reference. Insertion order is
/// preserved for deterministic iteration; semantics do not depend on it.
pub type MapRef = Arc<RwLock<IndexMap<String, Value>>>;

/// Acquire a read guard, recovering from poisoning. A panicking script thread
/// must not brick sibling forks that share the same caches and frames.
pub(crate) fn read<T: ?Sized>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Acquire a write guard, recovering from poisoning.
pub(crate) fn write<T: ?Sized>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(ListRef),
    Map(MapRef),
    Func(Callable),
    Host(HostRef),
    Type(TypeHandle),
}

/// The three callable shapes, invocable uniformly by the evaluator.
#[derive(Clone)]
pub enum Callable {
    /// Defined in script; carries its captured lexical environment.
    Script(Arc<ScriptFn>),
    /// Published by the host through `set` / the standard library.
    Host(Arc<HostFn>),
    /// A host method bound to its receiver by a selector expression.
    Method(BoundMethod),
}

/// A script function value: parameters, body AST, and the scope that existed
/// at the point of the defining expression. Mutation of that scope remains
/// observable to future invocations.
pub struct ScriptFn {
    pub params: Vec<String>,
    pub named_result: Option<(String, TypeExpr)>,
    pub body: Arc<Block>,
    pub env: Arc<Scope>,
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Arc::new(RwLock::new(items)))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Value {
        Value::Map(Arc::new(RwLock::new(entries)))
    }

    pub fn empty_map() -> Value {
        Value::map(IndexMap::new())
    }

    /// Wrap a host object as a read-only snapshot. Selector reads and
    /// value-receiver methods work; assignment reports the value as
    /// non-addressable.
    pub fn host<T: Reflect>(obj: T) -> Value {
        Value::Host(HostRef::frozen(obj))
    }

    /// Wrap a shared, addressable host object. The host keeps its own clone
    /// of the `Arc` to observe script-side mutation.
    pub fn from_shared<T: Reflect>(shared: Arc<RwLock<T>>) -> Value {
        Value::Host(HostRef::Shared(shared))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Func(_) => "func",
            Value::Host(h) => h.type_name(),
            Value::Type(_) => "type",
        }
    }

    /// Truthiness: null is false, numbers are non-zero, strings and
    /// containers are non-empty, host values and functions are always true.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !read(items).is_empty(),
            Value::Map(entries) => !read(entries).is_empty(),
            Value::Func(_) | Value::Host(_) | Value::Type(_) => true,
        }
    }

    pub fn as_int(&self) -> Result<i64, Error> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Float(x) => Ok(*x as i64),
            other => Err(Error::type_mismatch(format!(
                "expected int, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_float(&self) -> Result<f64, Error> {
        match self {
            Value::Int(n) => Ok(*n as f64),
            Value::Float(x) => Ok(*x),
            other => Err(Error::type_mismatch(format!(
                "expected float, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_str(&self) -> Result<&str, Error> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(Error::type_mismatch(format!(
                "expected string, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(Error::type_mismatch(format!(
                "expected bool, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_list(&self) -> Result<&ListRef, Error> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(Error::type_mismatch(format!(
                "expected list, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_map(&self) -> Result<&MapRef, Error> {
        match self {
            Value::Map(entries) => Ok(entries),
            other => Err(Error::type_mismatch(format!(
                "expected map, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Equality cross-promotes numeric kinds; values of differing, unpromotable
/// kinds compare unequal without error. Containers compare structurally,
/// callables and host values by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Arc::ptr_eq(a, b) || *read(a) == *read(b)
            }
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || *read(a) == *read(b),
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            (Value::Host(a), Value::Host(b)) => a.ptr_eq(b),
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }
}

impl Callable {
    fn ptr_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Script(a), Callable::Script(b)) => Arc::ptr_eq(a, b),
            (Callable::Host(a), Callable::Host(b)) => Arc::ptr_eq(a, b),
            (Callable::Method(a), Callable::Method(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// The natural textual form, used by string concatenation and `print`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in read(items).iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "map[")?;
                for (i, (key, value)) in read(entries).iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                write!(f, "]")
            }
            Value::Func(c) => write!(f, "{}", c),
            Value::Host(h) => h.fmt_value(f),
            Value::Type(t) => write!(f, "{}", t.name()),
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Script(sf) => write!(f, "func({})", sf.params.join(", ")),
            Callable::Host(hf) => write!(f, "func {}", hf.name()),
            Callable::Method(bm) => write!(f, "method {}", bm.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Func(c) => write!(f, "<{}>", c),
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Value {
        Value::Int(n as i64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Value {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl From<HostFn> for Value {
    fn from(f: HostFn) -> Value {
        Value::Func(Callable::Host(Arc::new(f)))
    }
}

impl From<TypeHandle> for Value {
    fn from(t: TypeHandle) -> Value {
        Value::Type(t)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Value {
        Value::list(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<IndexMap<String, T>> for Value {
    fn from(entries: IndexMap<String, T>) -> Value {
        Value::map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(entries: HashMap<String, T>) -> Value {
        Value::map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Value {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(Value::Int(-3).truthy());
        assert!(!Value::Float(0.0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Str("x".into()).truthy());
        assert!(!Value::list(vec![]).truthy());
        assert!(Value::list(vec![Value::Null]).truthy());
    }

    #[test]
    fn test_cross_numeric_equality() {
        assert_eq!(Value::Int(3), Value::Float(3.0));
        assert_eq!(Value::Float(3.0), Value::Int(3));
        assert_ne!(Value::Int(3), Value::Float(3.5));
        assert_ne!(Value::Int(3), Value::Str("3".into()));
        assert_ne!(Value::Bool(true), Value::Int(1));
    }

    #[test]
    fn test_list_sharing() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::List(items) = &a {
            write(items).push(Value::Int(2));
        }
        if let Value::List(items) = &b {
            assert_eq!(read(items).len(), 2);
        } else {
            panic!("expected list");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
        let list = Value::from(vec![1i64, 2, 3]);
        assert_eq!(list.to_string(), "[1 2 3]");
    }

    #[test]
    fn test_deep_list_equality() {
        let a = Value::from(vec![1i64, 2, 3]);
        let b = Value::from(vec![1i64, 2, 3]);
        assert_eq!(a, b);
        let c = Value::from(vec![1i64, 2]);
        assert_ne!(a, c);
    }
}
