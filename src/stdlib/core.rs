// ABOUTME: Top-level builtins: len, print, and the has membership test

use std::sync::Arc;

use crate::error::Error;
use crate::host::{HostFn, ParamKind};
use crate::reflect::ReflectCache;
use crate::scope::Scope;
use crate::value::{self, Value};

pub(crate) fn install(scope: &Arc<Scope>, reflect: &Arc<ReflectCache>) {
    scope.declare(
        "len",
        Value::from(HostFn::new("len", &[ParamKind::Any], |args| {
            let n = match &args[0] {
                Value::Str(s) => s.len(),
                Value::List(items) => value::read(items).len(),
                Value::Map(entries) => value::read(entries).len(),
                Value::Host(host) => host.with(|obj| obj.length()).ok_or_else(|| {
                    Error::type_mismatch(format!("len: {} has no length", host.type_name()))
                })?,
                other => {
                    return Err(Error::type_mismatch(format!(
                        "len: cannot measure {}",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Int(n as i64))
        })),
    );

    scope.declare(
        "print",
        Value::from(
            HostFn::new("print", &[ParamKind::Any], |args| {
                let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
                println!("{}", rendered.join(" "));
                Ok(Value::Null)
            })
            .variadic(),
        ),
    );

    let cache = Arc::clone(reflect);
    scope.declare(
        "has",
        Value::from(
            HostFn::new("has", &[ParamKind::Any, ParamKind::Any], move |args| {
                let container = &args[0];
                let found = args[1..].iter().all(|e| has_one(&cache, container, e));
                Ok(Value::Bool(found))
            })
            .variadic(),
        ),
    );
}

/// Membership by container shape: deep equality in lists, key presence in
/// maps, field names in structures, substrings in strings. A null container
/// holds nothing.
fn has_one(reflect: &ReflectCache, container: &Value, element: &Value) -> bool {
    match container {
        Value::Null => false,
        Value::List(items) => value::read(items).iter().any(|v| v == element),
        Value::Map(entries) => match element {
            Value::Str(key) => value::read(entries).contains_key(key),
            _ => false,
        },
        Value::Str(s) => match element {
            Value::Str(sub) => s.contains(sub.as_str()),
            _ => false,
        },
        Value::Host(host) => {
            if let Some(pairs) = host.with(|obj| obj.entries()) {
                return pairs.iter().any(|(_, v)| v == element);
            }
            match element {
                Value::Str(name) => reflect.descriptor(host).has_field(name),
                _ => false,
            }
        }
        _ => false,
    }
}
