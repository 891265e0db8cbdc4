// ABOUTME: Host-value bridge: the Reflect trait, type descriptors sources, handles, and host callables

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::Error;
use crate::value::{self, Value};

/// Implemented by host types exposed to scripts. The description returned by
/// [`type_spec`](Reflect::type_spec) is consumed once per type by the
/// reflection cache, which flattens embedded types into a single descriptor.
///
/// The optional container capabilities feed `len`, `has`, and `range` when a
/// host type behaves like a sequence or mapping.
pub trait Reflect: Any + Clone + fmt::Debug + Send + Sync {
    fn type_name() -> &'static str;

    fn type_spec() -> TypeSpec;

    fn length(&self) -> Option<usize> {
        None
    }

    fn entries(&self) -> Option<Vec<(Value, Value)>> {
        None
    }
}

/// Object-safe erasure of [`Reflect`]; implemented for every `Reflect` type.
pub trait HostObject: Any + Send + Sync {
    fn type_name(&self) -> &'static str;
    fn type_spec(&self) -> TypeSpec;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_boxed(&self) -> Box<dyn HostObject>;
    fn length(&self) -> Option<usize>;
    fn entries(&self) -> Option<Vec<(Value, Value)>>;
    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: Reflect> HostObject for T {
    fn type_name(&self) -> &'static str {
        <T as Reflect>::type_name()
    }

    fn type_spec(&self) -> TypeSpec {
        <T as Reflect>::type_spec()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn HostObject> {
        Box::new(self.clone())
    }

    fn length(&self) -> Option<usize> {
        Reflect::length(self)
    }

    fn entries(&self) -> Option<Vec<(Value, Value)>> {
        Reflect::entries(self)
    }

    fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A script-side handle to a host object.
///
/// `Shared` is addressable: selector-assignment and pointer-receiver methods
/// write through to storage the host can still see. `Frozen` is a by-value
/// snapshot; writes against it fail (fields) or are discarded with a
/// diagnostic (pointer-receiver methods on a temporary copy).
#[derive(Clone)]
pub enum HostRef {
    Shared(Arc<RwLock<dyn HostObject>>),
    Frozen(Arc<dyn HostObject>),
}

impl HostRef {
    pub fn shared<T: Reflect>(obj: T) -> Self {
        HostRef::Shared(Arc::new(RwLock::new(obj)))
    }

    pub fn frozen<T: Reflect>(obj: T) -> Self {
        HostRef::Frozen(Arc::new(obj))
    }

    /// Run `f` against the underlying object under the appropriate guard
    pub fn with<R>(&self, f: impl FnOnce(&dyn HostObject) -> R) -> R {
        match self {
            HostRef::Shared(cell) => f(&*value::read(cell)),
            HostRef::Frozen(obj) => f(&**obj),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.with(|obj| obj.as_any().type_id())
    }

    pub fn type_name(&self) -> &'static str {
        self.with(|obj| obj.type_name())
    }

    pub fn is_addressable(&self) -> bool {
        matches!(self, HostRef::Shared(_))
    }

    pub(crate) fn ptr_eq(&self, other: &HostRef) -> bool {
        match (self, other) {
            (HostRef::Shared(a), HostRef::Shared(b)) => Arc::ptr_eq(a, b),
            (HostRef::Frozen(a), HostRef::Frozen(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn fmt_value(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|obj| obj.fmt_value(f))
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_value(f)
    }
}

pub(crate) type GetFn = Box<dyn Fn(&dyn Any) -> Value + Send + Sync>;
pub(crate) type SetFn = Box<dyn Fn(&mut dyn Any, Value) -> Result<(), Error> + Send + Sync>;
pub(crate) type RefFn = Box<dyn (Fn(&dyn Any) -> &dyn Any) + Send + Sync>;
pub(crate) type MutFn = Box<dyn (Fn(&mut dyn Any) -> &mut dyn Any) + Send + Sync>;

/// Raw, unflattened description of one host type: its own fields, methods,
/// and anonymous embeddings. Built with the fluent methods below.
pub struct TypeSpec {
    pub(crate) name: &'static str,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) methods: Vec<MethodSpec>,
    pub(crate) embeds: Vec<EmbedSpec>,
}

pub(crate) struct FieldSpec {
    pub(crate) name: &'static str,
    pub(crate) get: GetFn,
    pub(crate) set: SetFn,
}

pub(crate) struct MethodSpec {
    pub(crate) name: &'static str,
    pub(crate) imp: MethodImpl,
}

/// Receiver discipline: `Ref` is a value receiver, `Mut` a pointer receiver.
pub(crate) enum MethodImpl {
    Ref(Box<dyn Fn(&dyn Any, &[Value]) -> Result<Value, Error> + Send + Sync>),
    Mut(Box<dyn Fn(&mut dyn Any, &[Value]) -> Result<Value, Error> + Send + Sync>),
}

pub(crate) struct EmbedSpec {
    pub(crate) name: &'static str,
    pub(crate) spec: fn() -> TypeSpec,
    pub(crate) as_ref: RefFn,
    pub(crate) as_mut: MutFn,
}

fn downcast_ref<T: Any>(obj: &dyn Any) -> &T {
    obj.downcast_ref().expect("host object type confusion")
}

fn downcast_mut<T: Any>(obj: &mut dyn Any) -> &mut T {
    obj.downcast_mut().expect("host object type confusion")
}

impl TypeSpec {
    pub fn new(name: &'static str) -> Self {
        TypeSpec {
            name,
            fields: Vec::new(),
            methods: Vec::new(),
            embeds: Vec::new(),
        }
    }

    /// Expose a field. The setter receives the raw script value and performs
    /// its own conversion (`as_int`, `as_str`, ...), mirroring the host
    /// runtime's convert-if-convertible rule.
    pub fn field<T, V, G, S>(mut self, name: &'static str, get: G, set: S) -> Self
    where
        T: Any,
        V: Into<Value>,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, Value) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.fields.push(FieldSpec {
            name,
            get: Box::new(move |obj| get(downcast_ref::<T>(obj)).into()),
            set: Box::new(move |obj, v| set(downcast_mut::<T>(obj), v)),
        });
        self
    }

    /// Expose a value-receiver method
    pub fn method<T, F>(mut self, name: &'static str, f: F) -> Self
    where
        T: Any,
        F: Fn(&T, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.methods.push(MethodSpec {
            name,
            imp: MethodImpl::Ref(Box::new(move |obj, args| f(downcast_ref::<T>(obj), args))),
        });
        self
    }

    /// Expose a pointer-receiver method. On name collision with a
    /// value-receiver method, the pointer receiver wins at descriptor build.
    pub fn method_mut<T, F>(mut self, name: &'static str, f: F) -> Self
    where
        T: Any,
        F: Fn(&mut T, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.methods.push(MethodSpec {
            name,
            imp: MethodImpl::Mut(Box::new(move |obj, args| f(downcast_mut::<T>(obj), args))),
        });
        self
    }

    /// Anonymously embed another reflected type: its fields and methods are
    /// promoted onto this type unless shadowed.
    pub fn embed<T, E>(mut self, get_ref: fn(&T) -> &E, get_mut: fn(&mut T) -> &mut E) -> Self
    where
        T: Any,
        E: Reflect,
    {
        self.embeds.push(EmbedSpec {
            name: <E as Reflect>::type_name(),
            spec: <E as Reflect>::type_spec,
            as_ref: Box::new(move |obj| get_ref(downcast_ref::<T>(obj)) as &dyn Any),
            as_mut: Box::new(move |obj| get_mut(downcast_mut::<T>(obj)) as &mut dyn Any),
        });
        self
    }
}

/// A first-class reference to a host type, usable with `make`.
#[derive(Clone)]
pub struct TypeHandle {
    name: &'static str,
    type_id: TypeId,
    make: fn() -> Value,
}

impl TypeHandle {
    pub fn of<T: Reflect + Default>() -> Self {
        TypeHandle {
            name: <T as Reflect>::type_name(),
            type_id: TypeId::of::<T>(),
            make: || Value::Host(HostRef::shared(T::default())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Zero-construct a fresh, addressable instance
    pub(crate) fn instantiate(&self) -> Value {
        (self.make)()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &TypeHandle) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}", self.name)
    }
}

/// Declared parameter kinds for host functions. Arguments are coerced before
/// the call: `null` becomes the kind's zero value, and int/float convert
/// into each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Any,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
}

impl ParamKind {
    fn zero(self) -> Value {
        match self {
            ParamKind::Any => Value::Null,
            ParamKind::Bool => Value::Bool(false),
            ParamKind::Int => Value::Int(0),
            ParamKind::Float => Value::Float(0.0),
            ParamKind::Str => Value::Str(String::new()),
            ParamKind::List => Value::list(Vec::new()),
            ParamKind::Map => Value::empty_map(),
        }
    }
}

/// A host-provided function value with declared parameter kinds and an
/// optional variadic tail (the last kind describes the tail's element type).
pub struct HostFn {
    name: String,
    params: Vec<ParamKind>,
    variadic: bool,
    f: Box<dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync>,
}

impl HostFn {
    pub fn new(
        name: impl Into<String>,
        params: &[ParamKind],
        f: impl Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        HostFn {
            name: name.into(),
            params: params.to_vec(),
            variadic: false,
            f: Box::new(f),
        }
    }

    /// Mark the last declared parameter as a variadic tail
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(&self, args: &[Value]) -> Result<Value, Error> {
        let fixed = if self.variadic {
            self.params.len() - 1
        } else {
            self.params.len()
        };
        if self.variadic {
            if args.len() < fixed {
                return Err(Error::arg_count(
                    &self.name,
                    format!("at least {}", fixed),
                    args.len(),
                ));
            }
        } else if args.len() != fixed {
            return Err(Error::arg_count(&self.name, fixed.to_string(), args.len()));
        }
        let mut coerced = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let kind = if i < fixed {
                self.params[i]
            } else {
                self.params[self.params.len() - 1]
            };
            coerced.push(self.coerce(arg, kind, i)?);
        }
        (self.f)(&coerced)
    }

    fn coerce(&self, v: &Value, kind: ParamKind, pos: usize) -> Result<Value, Error> {
        let out = match (v, kind) {
            (Value::Null, k) => k.zero(),
            (_, ParamKind::Any) => v.clone(),
            (Value::Bool(_), ParamKind::Bool)
            | (Value::Int(_), ParamKind::Int)
            | (Value::Float(_), ParamKind::Float)
            | (Value::Str(_), ParamKind::Str)
            | (Value::List(_), ParamKind::List)
            | (Value::Map(_), ParamKind::Map) => v.clone(),
            (Value::Int(n), ParamKind::Float) => Value::Float(*n as f64),
            (Value::Float(x), ParamKind::Int) => Value::Int(*x as i64),
            _ => {
                return Err(Error::type_mismatch(format!(
                    "{}: argument {} must be {:?}, got {}",
                    self.name,
                    pos,
                    kind,
                    v.type_name()
                )))
            }
        };
        Ok(out)
    }
}

impl fmt::Debug for HostFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host func {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_fn() -> HostFn {
        HostFn::new("sum", &[ParamKind::Int, ParamKind::Int], |args| {
            Ok(Value::Int(args[0].as_int()? + args[1].as_int()?))
        })
    }

    #[test]
    fn test_fixed_arity() {
        let f = sum_fn();
        assert_eq!(
            f.invoke(&[Value::Int(1), Value::Int(2)]).unwrap(),
            Value::Int(3)
        );
        assert!(matches!(
            f.invoke(&[Value::Int(1)]),
            Err(Error::ArgCountMismatch { .. })
        ));
    }

    #[test]
    fn test_null_becomes_zero_value() {
        let f = sum_fn();
        assert_eq!(
            f.invoke(&[Value::Null, Value::Int(2)]).unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_numeric_conversion() {
        let f = sum_fn();
        assert_eq!(
            f.invoke(&[Value::Float(1.9), Value::Int(2)]).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_variadic_tail() {
        let join = HostFn::new("concat", &[ParamKind::Str, ParamKind::Str], |args| {
            let mut out = String::new();
            for a in args {
                out.push_str(a.as_str()?);
            }
            Ok(Value::Str(out))
        })
        .variadic();
        assert_eq!(
            join.invoke(&[Value::from("a"), Value::from("b"), Value::from("c")])
                .unwrap(),
            Value::from("abc")
        );
        assert_eq!(join.invoke(&[Value::from("a")]).unwrap(), Value::from("a"));
        assert!(join.invoke(&[]).is_err());
    }
}
