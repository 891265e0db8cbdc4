// ABOUTME: The strings namespace: Builder type handle plus the text-processing function family

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Error;
use crate::host::{HostFn, ParamKind, Reflect, TypeHandle, TypeSpec};
use crate::scope::Scope;
use crate::value::{self, Value};

/// An accumulating string builder, published as the `strings.Builder` type
/// handle. `WriteString` takes a pointer receiver, so mutation requires the
/// addressable instance `make(strings.Builder)` produces.
#[derive(Debug, Clone, Default)]
pub struct StringBuilder {
    buf: String,
}

impl Reflect for StringBuilder {
    fn type_name() -> &'static str {
        "strings.Builder"
    }

    fn type_spec() -> TypeSpec {
        TypeSpec::new("strings.Builder")
            .method_mut("WriteString", |b: &mut StringBuilder, args: &[Value]| {
                if args.len() != 1 {
                    return Err(Error::arg_count("WriteString", "1", args.len()));
                }
                b.buf.push_str(args[0].as_str()?);
                Ok(Value::Int(args[0].as_str()?.len() as i64))
            })
            .method("String", |b: &StringBuilder, args: &[Value]| {
                if !args.is_empty() {
                    return Err(Error::arg_count("String", "0", args.len()));
                }
                Ok(Value::Str(b.buf.clone()))
            })
            .method("Len", |b: &StringBuilder, args: &[Value]| {
                if !args.is_empty() {
                    return Err(Error::arg_count("Len", "0", args.len()));
                }
                Ok(Value::Int(b.buf.len() as i64))
            })
            .method_mut("Reset", |b: &mut StringBuilder, args: &[Value]| {
                if !args.is_empty() {
                    return Err(Error::arg_count("Reset", "0", args.len()));
                }
                b.buf.clear();
                Ok(Value::Null)
            })
    }

    fn length(&self) -> Option<usize> {
        Some(self.buf.len())
    }
}

pub(crate) fn install(scope: &Arc<Scope>) {
    let mut ns: IndexMap<String, Value> = IndexMap::new();
    ns.insert(
        "Builder".to_string(),
        Value::Type(TypeHandle::of::<StringBuilder>()),
    );

    let mut publish = |name: &str, params: &[ParamKind], f: fn(&[Value]) -> Result<Value, Error>| {
        ns.insert(name.to_string(), Value::from(HostFn::new(name, params, f)));
    };

    publish("Join", &[ParamKind::List, ParamKind::Str], |args| {
        let items = args[0].as_list()?;
        let sep = args[1].as_str()?;
        let parts: Vec<String> = value::read(items).iter().map(Value::to_string).collect();
        Ok(Value::Str(parts.join(sep)))
    });

    publish("Split", &[ParamKind::Str, ParamKind::Str], |args| {
        let s = args[0].as_str()?;
        let sep = args[1].as_str()?;
        let parts: Vec<Value> = if sep.is_empty() {
            s.chars().map(|c| Value::Str(c.to_string())).collect()
        } else {
            s.split(sep).map(Value::from).collect()
        };
        Ok(Value::list(parts))
    });

    publish("Trim", &[ParamKind::Str, ParamKind::Str], |args| {
        let s = args[0].as_str()?;
        let cutset = args[1].as_str()?;
        Ok(Value::from(s.trim_matches(|c| cutset.contains(c))))
    });

    publish("TrimSpace", &[ParamKind::Str], |args| {
        Ok(Value::from(args[0].as_str()?.trim()))
    });

    publish(
        "Replace",
        &[ParamKind::Str, ParamKind::Str, ParamKind::Str],
        |args| {
            let s = args[0].as_str()?;
            Ok(Value::from(s.replace(args[1].as_str()?, args[2].as_str()?)))
        },
    );

    publish("Contains", &[ParamKind::Str, ParamKind::Str], |args| {
        Ok(Value::Bool(args[0].as_str()?.contains(args[1].as_str()?)))
    });

    publish("HasPrefix", &[ParamKind::Str, ParamKind::Str], |args| {
        Ok(Value::Bool(
            args[0].as_str()?.starts_with(args[1].as_str()?),
        ))
    });

    publish("HasSuffix", &[ParamKind::Str, ParamKind::Str], |args| {
        Ok(Value::Bool(args[0].as_str()?.ends_with(args[1].as_str()?)))
    });

    publish("ToUpper", &[ParamKind::Str], |args| {
        Ok(Value::from(args[0].as_str()?.to_uppercase()))
    });

    publish("ToLower", &[ParamKind::Str], |args| {
        Ok(Value::from(args[0].as_str()?.to_lowercase()))
    });

    publish("Index", &[ParamKind::Str, ParamKind::Str], |args| {
        let found = args[0].as_str()?.find(args[1].as_str()?);
        Ok(Value::Int(found.map(|i| i as i64).unwrap_or(-1)))
    });

    drop(publish);
    scope.declare("strings", Value::map(ns));
}
