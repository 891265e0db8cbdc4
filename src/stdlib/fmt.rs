// ABOUTME: The fmt namespace: Println, Printf, Sprintf and the verb renderer behind them

use std::sync::Arc;

use indexmap::IndexMap;

use crate::host::{HostFn, ParamKind};
use crate::scope::Scope;
use crate::value::Value;

pub(crate) fn install(scope: &Arc<Scope>) {
    let mut ns: IndexMap<String, Value> = IndexMap::new();

    ns.insert(
        "Println".to_string(),
        Value::from(
            HostFn::new("Println", &[ParamKind::Any], |args| {
                let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
                println!("{}", rendered.join(" "));
                Ok(Value::Null)
            })
            .variadic(),
        ),
    );

    ns.insert(
        "Printf".to_string(),
        Value::from(
            HostFn::new("Printf", &[ParamKind::Str, ParamKind::Any], |args| {
                print!("{}", sprintf(args[0].as_str()?, &args[1..]));
                Ok(Value::Null)
            })
            .variadic(),
        ),
    );

    ns.insert(
        "Sprintf".to_string(),
        Value::from(
            HostFn::new("Sprintf", &[ParamKind::Str, ParamKind::Any], |args| {
                Ok(Value::Str(sprintf(args[0].as_str()?, &args[1..])))
            })
            .variadic(),
        ),
    );

    scope.declare("fmt", Value::map(ns));
}

/// A small verb renderer: %v %s %d %f %t %q and %%, with an optional
/// precision for %f. Bad verbs and missing arguments render inline markers
/// instead of failing, the way the host formatting package behaves.
pub(crate) fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::new();
    let mut chars = format.chars().peekable();
    let mut next_arg = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek() {
                if d.is_ascii_digit() {
                    digits.push(*d);
                    chars.next();
                } else {
                    break;
                }
            }
            precision = digits.parse::<usize>().ok();
        }
        let Some(verb) = chars.next() else {
            out.push('%');
            break;
        };
        match args.get(next_arg) {
            Some(v) => out.push_str(&render_verb(verb, precision, v)),
            None => out.push_str(&format!("%!{}(MISSING)", verb)),
        }
        next_arg += 1;
    }
    out
}

fn render_verb(verb: char, precision: Option<usize>, v: &Value) -> String {
    match verb {
        'v' | 's' => v.to_string(),
        'd' => match v {
            Value::Int(n) => n.to_string(),
            Value::Float(x) => (*x as i64).to_string(),
            other => format!("%!d({})", other),
        },
        'f' => match v.as_float() {
            Ok(x) => format!("{:.*}", precision.unwrap_or(6), x),
            Err(_) => format!("%!f({})", v),
        },
        't' => match v {
            Value::Bool(b) => b.to_string(),
            other => format!("%!t({})", other),
        },
        'q' => format!("{:?}", v.to_string()),
        other => format!("%!{}({})", other, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprintf_verbs() {
        assert_eq!(
            sprintf("%s-%d", &[Value::from("a"), Value::Int(1)]),
            "a-1"
        );
        assert_eq!(sprintf("%v", &[Value::from(vec![1i64, 2])]), "[1 2]");
        assert_eq!(sprintf("%.2f", &[Value::Float(1.0 / 3.0)]), "0.33");
        assert_eq!(sprintf("100%%", &[]), "100%");
        assert_eq!(sprintf("%t", &[Value::Bool(true)]), "true");
    }

    #[test]
    fn test_sprintf_degenerate_cases() {
        assert_eq!(sprintf("%d", &[]), "%!d(MISSING)");
        assert_eq!(sprintf("%d", &[Value::from("x")]), "%!d(x)");
        assert_eq!(sprintf("trailing %", &[]), "trailing %");
    }
}
