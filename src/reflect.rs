// ABOUTME: Per-type descriptor cache: embedded flattening, field accessor paths, method binding

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::Error;
use crate::host::{GetFn, HostRef, MethodImpl, MutFn, RefFn, SetFn, TypeSpec};
use crate::value::{self, Callable, Value};

/// One embedding step on the way to a promoted field or method
pub(crate) struct Step {
    as_ref: RefFn,
    as_mut: MutFn,
}

/// A field resolved against a descriptor: the accessor path through embedded
/// types (empty for own fields) plus the leaf getter and setter.
pub struct FieldInfo {
    name: &'static str,
    path: Vec<Arc<Step>>,
    get: GetFn,
    set: SetFn,
}

impl FieldInfo {
    fn read(&self, obj: &dyn Any) -> Value {
        let mut leaf = obj;
        for step in &self.path {
            leaf = (step.as_ref)(leaf);
        }
        (self.get)(leaf)
    }

    fn write(&self, obj: &mut dyn Any, v: Value) -> Result<(), Error> {
        let mut leaf = obj;
        for step in &self.path {
            leaf = (step.as_mut)(leaf);
        }
        (self.set)(leaf, v)
    }
}

/// A method resolved against a descriptor, with its receiver discipline
pub struct MethodInfo {
    name: &'static str,
    path: Vec<Arc<Step>>,
    imp: MethodImpl,
}

impl MethodInfo {
    pub fn is_pointer_receiver(&self) -> bool {
        matches!(self.imp, MethodImpl::Mut(_))
    }
}

/// A method bound to its receiver by a selector or identifier lookup
#[derive(Clone)]
pub struct BoundMethod {
    pub(crate) recv: HostRef,
    pub(crate) method: Arc<MethodInfo>,
}

impl BoundMethod {
    pub fn name(&self) -> &'static str {
        self.method.name
    }

    pub(crate) fn ptr_eq(&self, other: &BoundMethod) -> bool {
        self.recv.ptr_eq(&other.recv) && Arc::ptr_eq(&self.method, &other.method)
    }

    /// Invoke with the receiver discipline the method declares. A
    /// pointer-receiver method against a frozen value runs on a temporary
    /// copy; its writes are discarded after a diagnostic.
    pub(crate) fn invoke(&self, args: &[Value]) -> Result<Value, Error> {
        match (&self.method.imp, &self.recv) {
            (MethodImpl::Ref(f), recv) => recv.with(|obj| {
                let mut leaf: &dyn Any = obj.as_any();
                for step in &self.method.path {
                    leaf = (step.as_ref)(leaf);
                }
                f(leaf, args)
            }),
            (MethodImpl::Mut(f), HostRef::Shared(cell)) => {
                let mut guard = value::write(cell);
                let mut leaf: &mut dyn Any = guard.as_any_mut();
                for step in &self.method.path {
                    leaf = (step.as_mut)(leaf);
                }
                f(leaf, args)
            }
            (MethodImpl::Mut(f), HostRef::Frozen(obj)) => {
                eprintln!(
                    "script: method {} needs an addressable receiver; writes will be discarded",
                    self.method.name
                );
                let mut tmp = obj.clone_boxed();
                let mut leaf: &mut dyn Any = tmp.as_any_mut();
                for step in &self.method.path {
                    leaf = (step.as_mut)(leaf);
                }
                f(leaf, args)
            }
        }
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "method {} of {}", self.method.name, self.recv.type_name())
    }
}

/// The flattened, memoized view of one host type: every reachable field and
/// method keyed by promoted name, plus the embedded type names.
pub struct Descriptor {
    type_name: &'static str,
    fields: HashMap<&'static str, Arc<FieldInfo>>,
    methods: HashMap<&'static str, Arc<MethodInfo>>,
    embedded: Vec<&'static str>,
}

impl Descriptor {
    /// Flatten breadth-first so shallower declarations shadow deeper ones;
    /// among equal-depth embeddings the first listed wins. Within one level a
    /// pointer-receiver method overrides a value-receiver of the same name.
    fn build(spec: TypeSpec) -> Descriptor {
        let mut d = Descriptor {
            type_name: spec.name,
            fields: HashMap::new(),
            methods: HashMap::new(),
            embedded: Vec::new(),
        };
        let mut queue: VecDeque<(TypeSpec, Vec<Arc<Step>>)> = VecDeque::new();
        queue.push_back((spec, Vec::new()));
        while let Some((spec, path)) = queue.pop_front() {
            for f in spec.fields {
                if !d.fields.contains_key(f.name) {
                    d.fields.insert(
                        f.name,
                        Arc::new(FieldInfo {
                            name: f.name,
                            path: path.clone(),
                            get: f.get,
                            set: f.set,
                        }),
                    );
                }
            }
            let mut level: Vec<(&'static str, MethodImpl)> = Vec::new();
            for m in spec.methods {
                match level.iter_mut().find(|(name, _)| *name == m.name) {
                    Some(slot) if matches!(m.imp, MethodImpl::Mut(_)) => slot.1 = m.imp,
                    Some(_) => {}
                    None => level.push((m.name, m.imp)),
                }
            }
            for (name, imp) in level {
                if !d.methods.contains_key(name) {
                    d.methods.insert(
                        name,
                        Arc::new(MethodInfo {
                            name,
                            path: path.clone(),
                            imp,
                        }),
                    );
                }
            }
            for e in spec.embeds {
                d.embedded.push(e.name);
                let step = Arc::new(Step {
                    as_ref: e.as_ref,
                    as_mut: e.as_mut,
                });
                let mut sub_path = path.clone();
                sub_path.push(step);
                queue.push_back(((e.spec)(), sub_path));
            }
        }
        d
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn embedded(&self) -> &[&'static str] {
        &self.embedded
    }

    /// Read a field or bind a method against `recv`. `None` when the name
    /// resolves to neither; the evaluator treats that leniently.
    pub(crate) fn get(&self, recv: &HostRef, name: &str) -> Option<Value> {
        if let Some(field) = self.fields.get(name) {
            return Some(recv.with(|obj| field.read(obj.as_any())));
        }
        if let Some(method) = self.methods.get(name) {
            return Some(Value::Func(Callable::Method(BoundMethod {
                recv: recv.clone(),
                method: Arc::clone(method),
            })));
        }
        None
    }

    /// Write a field through an addressable receiver. `Ok(false)` when the
    /// field does not exist; an error when the receiver is frozen.
    pub(crate) fn set(&self, recv: &HostRef, name: &str, v: Value) -> Result<bool, Error> {
        let Some(field) = self.fields.get(name) else {
            return Ok(false);
        };
        match recv {
            HostRef::Shared(cell) => {
                let mut guard = value::write(cell);
                field.write(guard.as_any_mut(), v)?;
                Ok(true)
            }
            HostRef::Frozen(_) => Err(Error::FieldNotAssignable {
                field: field.name.to_string(),
                type_name: self.type_name,
            }),
        }
    }
}

/// Process-wide memoization of descriptors. Built at most once per type:
/// shared read, exclusive fill, double-check after upgrading.
#[derive(Default)]
pub struct ReflectCache {
    cache: RwLock<HashMap<TypeId, Arc<Descriptor>>>,
}

impl ReflectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor(&self, recv: &HostRef) -> Arc<Descriptor> {
        let id = recv.type_id();
        if let Some(hit) = value::read(&self.cache).get(&id) {
            return Arc::clone(hit);
        }
        let mut cache = value::write(&self.cache);
        if let Some(hit) = cache.get(&id) {
            return Arc::clone(hit);
        }
        let built = Arc::new(Descriptor::build(recv.with(|obj| obj.type_spec())));
        cache.insert(id, Arc::clone(&built));
        built
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Reflect, TypeSpec};

    #[derive(Debug, Clone, Default)]
    struct Inner {
        x: i64,
    }

    impl Reflect for Inner {
        fn type_name() -> &'static str {
            "Inner"
        }

        fn type_spec() -> TypeSpec {
            TypeSpec::new("Inner")
                .field(
                    "X",
                    |t: &Inner| t.x,
                    |t: &mut Inner, v| {
                        t.x = v.as_int()?;
                        Ok(())
                    },
                )
                .method("Tag", |_t: &Inner, _args| Ok(Value::from("inner")))
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Outer {
        inner: Inner,
        y: i64,
    }

    impl Reflect for Outer {
        fn type_name() -> &'static str {
            "Outer"
        }

        fn type_spec() -> TypeSpec {
            TypeSpec::new("Outer")
                .embed(|t: &Outer| &t.inner, |t: &mut Outer| &mut t.inner)
                .field(
                    "Y",
                    |t: &Outer| t.y,
                    |t: &mut Outer, v| {
                        t.y = v.as_int()?;
                        Ok(())
                    },
                )
                .method_mut("Tag", |_t: &mut Outer, _args| Ok(Value::from("outer")))
        }
    }

    #[test]
    fn test_embedded_field_promotion() {
        let cache = ReflectCache::new();
        let recv = HostRef::frozen(Outer {
            inner: Inner { x: 7 },
            y: 9,
        });
        let d = cache.descriptor(&recv);
        assert_eq!(d.get(&recv, "X").unwrap(), Value::Int(7));
        assert_eq!(d.get(&recv, "Y").unwrap(), Value::Int(9));
        assert!(d.has_field("X"));
        assert!(!d.has_field("Tag"));
        assert_eq!(d.embedded(), ["Inner"]);
    }

    #[test]
    fn test_outer_method_shadows_embedded() {
        let cache = ReflectCache::new();
        let recv = HostRef::frozen(Outer::default());
        let d = cache.descriptor(&recv);
        let bound = match d.get(&recv, "Tag").unwrap() {
            Value::Func(Callable::Method(b)) => b,
            other => panic!("expected bound method, got {:?}", other),
        };
        assert!(bound.method.is_pointer_receiver());
        assert_eq!(bound.invoke(&[]).unwrap(), Value::from("outer"));
    }

    #[test]
    fn test_write_through_shared_embedded_path() {
        let cache = ReflectCache::new();
        let recv = HostRef::shared(Outer::default());
        let d = cache.descriptor(&recv);
        assert!(d.set(&recv, "X", Value::Int(41)).unwrap());
        assert_eq!(d.get(&recv, "X").unwrap(), Value::Int(41));
    }

    #[test]
    fn test_write_to_frozen_fails() {
        let cache = ReflectCache::new();
        let recv = HostRef::frozen(Outer::default());
        let d = cache.descriptor(&recv);
        assert!(matches!(
            d.set(&recv, "X", Value::Int(1)),
            Err(Error::FieldNotAssignable { .. })
        ));
    }

    #[test]
    fn test_descriptor_built_once() {
        let cache = ReflectCache::new();
        let a = cache.descriptor(&HostRef::frozen(Outer::default()));
        let b = cache.descriptor(&HostRef::shared(Outer::default()));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
