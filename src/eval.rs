// ABOUTME: Tree-walking evaluator: statement and expression dispatch, sentinels, coercing arithmetic

use std::fmt;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::ast::{AssignOp, BinOp, Block, Expr, Stmt, TypeExpr, UnOp};
use crate::error::Error;
use crate::reflect::ReflectCache;
use crate::scope::Scope;
use crate::value::{self, Callable, ScriptFn, Value};

/// Out-of-band control results. Loops consume `Break`/`Continue`; the nearest
/// function call frame consumes `Return`. These are returned, never raised.
/// A naked `return` carries `None` so the call frame can substitute the
/// named result's current value.
pub(crate) enum Flow {
    Value(Value),
    Break,
    Continue,
    Return(Option<Value>),
}

/// Evaluation context shared by every frame of one script run
pub(crate) struct Ctx<'a> {
    pub(crate) global: &'a RwLock<Value>,
    pub(crate) reflect: &'a ReflectCache,
    pub(crate) strict_names: bool,
}

fn diagnose(message: impl fmt::Display) {
    eprintln!("script: {}", message);
}

/// Evaluate a block in a fresh child frame
pub(crate) fn eval_block(ctx: &Ctx, block: &Block, scope: &Arc<Scope>) -> Result<Flow, Error> {
    let frame = Scope::child(scope);
    eval_block_in(ctx, block, &frame)
}

/// Evaluate a block in the given frame. The block's value is the value of
/// its last statement.
pub(crate) fn eval_block_in(ctx: &Ctx, block: &Block, scope: &Arc<Scope>) -> Result<Flow, Error> {
    let mut last = Value::Null;
    for stmt in &block.stmts {
        match eval_stmt(ctx, stmt, scope)? {
            Flow::Value(v) => last = v,
            other => return Ok(other),
        }
    }
    Ok(Flow::Value(last))
}

fn eval_stmt(ctx: &Ctx, stmt: &Stmt, scope: &Arc<Scope>) -> Result<Flow, Error> {
    match stmt {
        Stmt::Expr(expr) => Ok(Flow::Value(eval_expr(ctx, expr, scope)?)),

        Stmt::Var { name, ty, init } => {
            let v = match init {
                Some(expr) => eval_expr(ctx, expr, scope)?,
                None => zero_of_type(ty.as_ref()),
            };
            scope.declare(name.clone(), v);
            Ok(Flow::Value(Value::Null))
        }

        Stmt::Assign { op, target, value } => {
            let v = eval_expr(ctx, value, scope)?;
            match op {
                AssignOp::Define => match target {
                    Expr::Ident(name) => scope.declare(name.clone(), v),
                    _ => {
                        return Err(Error::UnsupportedNode(
                            "left side of := must be an identifier".to_string(),
                        ))
                    }
                },
                AssignOp::Set => store(ctx, target, v, scope)?,
                AssignOp::Add => {
                    let current = eval_expr(ctx, target, scope)?;
                    let sum = arith_add(current, v)?;
                    store(ctx, target, sum, scope)?;
                }
            }
            Ok(Flow::Value(Value::Null))
        }

        Stmt::IncDec { name, inc } => {
            let current = ident_value(ctx, name, scope)?;
            let next = if *inc {
                arith_add(current, Value::Int(1))?
            } else {
                arith_sub(current, Value::Int(1))?
            };
            scope.assign(name, next.clone());
            Ok(Flow::Value(next))
        }

        Stmt::Return(expr) => {
            let v = match expr {
                Some(expr) => Some(eval_expr(ctx, expr, scope)?),
                None => None,
            };
            Ok(Flow::Return(v))
        }

        Stmt::Break => Ok(Flow::Break),
        Stmt::Continue => Ok(Flow::Continue),
        Stmt::Block(block) => eval_block(ctx, block, scope),

        Stmt::If {
            init,
            cond,
            then,
            alt,
        } => {
            // the initializer's frame spans the whole if-else chain
            let frame = Scope::child(scope);
            if let Some(init) = init {
                eval_stmt(ctx, init, &frame)?;
            }
            if eval_expr(ctx, cond, &frame)?.truthy() {
                eval_block(ctx, then, &frame)
            } else if let Some(alt) = alt {
                eval_stmt(ctx, alt, &frame)
            } else {
                Ok(Flow::Value(Value::Null))
            }
        }

        Stmt::For {
            init,
            cond,
            post,
            body,
        } => {
            let frame = Scope::child(scope);
            if let Some(init) = init {
                eval_stmt(ctx, init, &frame)?;
            }
            loop {
                if let Some(cond) = cond {
                    if !eval_expr(ctx, cond, &frame)?.truthy() {
                        break;
                    }
                }
                match eval_block(ctx, body, &frame)? {
                    Flow::Break => break,
                    Flow::Return(v) => return Ok(Flow::Return(v)),
                    // the post statement still runs after a continue
                    Flow::Continue | Flow::Value(_) => {}
                }
                if let Some(post) = post {
                    eval_stmt(ctx, post, &frame)?;
                }
            }
            Ok(Flow::Value(Value::Null))
        }

        Stmt::Range {
            key,
            value,
            subject,
            body,
        } => {
            let subject = eval_expr(ctx, subject, scope)?;
            for (k, v) in range_pairs(&subject)? {
                let frame = Scope::child(scope);
                if let Some(name) = key {
                    frame.declare(name.clone(), k);
                }
                if let Some(name) = value {
                    frame.declare(name.clone(), v);
                }
                match eval_block_in(ctx, body, &frame)? {
                    Flow::Break => break,
                    Flow::Return(v) => return Ok(Flow::Return(v)),
                    Flow::Continue | Flow::Value(_) => {}
                }
            }
            Ok(Flow::Value(Value::Null))
        }

        Stmt::Switch {
            init,
            tag,
            cases,
            default,
        } => {
            let frame = Scope::child(scope);
            if let Some(init) = init {
                eval_stmt(ctx, init, &frame)?;
            }
            let tag_value = match tag {
                Some(expr) => Some(eval_expr(ctx, expr, &frame)?),
                None => None,
            };
            for case in cases {
                for expr in &case.exprs {
                    let v = eval_expr(ctx, expr, &frame)?;
                    let matched = match &tag_value {
                        Some(tag) => v == *tag,
                        None => v.truthy(),
                    };
                    if matched {
                        return finish_switch(eval_block(ctx, &case.body, &frame)?);
                    }
                }
            }
            match default {
                Some(block) => finish_switch(eval_block(ctx, block, &frame)?),
                None => Ok(Flow::Value(Value::Null)),
            }
        }
    }
}

/// A break inside a switch terminates the switch, not an enclosing loop
fn finish_switch(flow: Flow) -> Result<Flow, Error> {
    Ok(match flow {
        Flow::Break | Flow::Value(_) => Flow::Value(Value::Null),
        other => other,
    })
}

/// Store `v` into an assignable expression: identifier, index, or selector
fn store(ctx: &Ctx, target: &Expr, v: Value, scope: &Arc<Scope>) -> Result<(), Error> {
    match target {
        Expr::Ident(name) => {
            // assignment to an unbound name is a silent no-op
            scope.assign(name, v);
            Ok(())
        }
        Expr::Index { subject, index } => {
            let container = eval_expr(ctx, subject, scope)?;
            let idx = eval_expr(ctx, index, scope)?;
            match container {
                Value::List(items) => {
                    let i = match idx {
                        Value::Int(i) => i,
                        other => {
                            return Err(Error::type_mismatch(format!(
                                "list index must be int, got {}",
                                other.type_name()
                            )))
                        }
                    };
                    let mut items = value::write(&items);
                    let len = items.len();
                    if i < 0 || i as usize >= len {
                        return Err(Error::IndexOutOfRange { index: i, len });
                    }
                    items[i as usize] = v;
                    Ok(())
                }
                Value::Map(entries) => {
                    let key = match idx {
                        Value::Str(s) => s,
                        other => return Err(Error::KeyTypeMismatch(other.type_name())),
                    };
                    value::write(&entries).insert(key, v);
                    Ok(())
                }
                other => Err(Error::type_mismatch(format!(
                    "cannot index-assign into {}",
                    other.type_name()
                ))),
            }
        }
        Expr::Selector { subject, field } => {
            let container = eval_expr(ctx, subject, scope)?;
            match container {
                Value::Map(entries) => {
                    value::write(&entries).insert(field.clone(), v);
                    Ok(())
                }
                Value::Host(host) => {
                    let descriptor = ctx.reflect.descriptor(&host);
                    if !descriptor.set(&host, field, v)? {
                        diagnose(format_args!(
                            "unknown field {} on {}; assignment ignored",
                            field,
                            descriptor.type_name()
                        ));
                    }
                    Ok(())
                }
                other => Err(Error::type_mismatch(format!(
                    "cannot assign to field {} of {}",
                    field,
                    other.type_name()
                ))),
            }
        }
        _ => Err(Error::type_mismatch("left side is not assignable")),
    }
}

pub(crate) fn eval_expr(ctx: &Ctx, expr: &Expr, scope: &Arc<Scope>) -> Result<Value, Error> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(x) => Ok(Value::Float(*x)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Ident(name) => ident_value(ctx, name, scope),

        Expr::Unary(op, operand) => {
            let v = eval_expr(ctx, operand, scope)?;
            match op {
                UnOp::Not => Ok(Value::Bool(!v.truthy())),
                UnOp::Neg => match v {
                    Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                    Value::Float(x) => Ok(Value::Float(-x)),
                    other => Err(Error::type_mismatch(format!(
                        "cannot negate {}",
                        other.type_name()
                    ))),
                },
                UnOp::Pos => match v {
                    Value::Int(_) | Value::Float(_) => Ok(v),
                    other => Err(Error::type_mismatch(format!(
                        "unary + requires a number, got {}",
                        other.type_name()
                    ))),
                },
            }
        }

        Expr::Binary(op, lhs, rhs) => match op {
            BinOp::And => {
                let left = eval_expr(ctx, lhs, scope)?;
                if !left.truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(eval_expr(ctx, rhs, scope)?.truthy()))
            }
            BinOp::Or => {
                let left = eval_expr(ctx, lhs, scope)?;
                if left.truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(eval_expr(ctx, rhs, scope)?.truthy()))
            }
            _ => {
                let left = eval_expr(ctx, lhs, scope)?;
                let right = eval_expr(ctx, rhs, scope)?;
                binary_value(*op, left, right)
            }
        },

        Expr::Call { callee, args } => {
            // make is a special form: its first argument may be a type
            if matches!(callee.as_ref(), Expr::Ident(name) if name == "make") {
                return eval_make(ctx, args, scope);
            }
            let f = eval_expr(ctx, callee, scope)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(ctx, arg, scope)?);
            }
            call_value(ctx, &f, values, &callee_label(callee))
        }

        Expr::Index { subject, index } => {
            let container = eval_expr(ctx, subject, scope)?;
            let idx = eval_expr(ctx, index, scope)?;
            index_value(&container, &idx)
        }

        Expr::Selector { subject, field } => {
            let container = eval_expr(ctx, subject, scope)?;
            match container {
                Value::Map(entries) => {
                    Ok(value::read(&entries).get(field).cloned().unwrap_or(Value::Null))
                }
                Value::Host(host) => {
                    let descriptor = ctx.reflect.descriptor(&host);
                    match descriptor.get(&host, field) {
                        Some(v) => Ok(v),
                        None => {
                            diagnose(format_args!(
                                "unknown selector {} on {}; using null",
                                field,
                                descriptor.type_name()
                            ));
                            Ok(Value::Null)
                        }
                    }
                }
                other => Err(Error::type_mismatch(format!(
                    "type {} has no field {}",
                    other.type_name(),
                    field
                ))),
            }
        }

        Expr::Func {
            params,
            named_result,
            body,
        } => Ok(Value::Func(Callable::Script(Arc::new(ScriptFn {
            params: params.clone(),
            named_result: named_result.clone(),
            body: Arc::clone(body),
            env: Arc::clone(scope),
        })))),

        Expr::MapLit { entries } => {
            let mut out = IndexMap::new();
            for (key_expr, value_expr) in entries {
                let key = match eval_expr(ctx, key_expr, scope)? {
                    Value::Str(s) => s,
                    other => return Err(Error::KeyTypeMismatch(other.type_name())),
                };
                out.insert(key, eval_expr(ctx, value_expr, scope)?);
            }
            Ok(Value::map(out))
        }

        Expr::SliceLit { elems } => {
            let mut out = Vec::with_capacity(elems.len());
            for elem in elems {
                out.push(eval_expr(ctx, elem, scope)?);
            }
            Ok(Value::list(out))
        }

        Expr::TypeLit(_) => Err(Error::UnsupportedNode(
            "type expression is only valid as a make argument or composite literal".to_string(),
        )),
    }
}

/// Resolve an identifier: predeclared names, the scope chain, then the
/// global object's fields, keys, and methods. A miss is non-fatal unless
/// strict name resolution is on.
pub(crate) fn ident_value(ctx: &Ctx, name: &str, scope: &Arc<Scope>) -> Result<Value, Error> {
    match name {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        "G" => return Ok(value::read(ctx.global).clone()),
        _ => {}
    }
    if let Some(v) = scope.lookup(name) {
        return Ok(v);
    }
    let global = value::read(ctx.global).clone();
    match &global {
        Value::Map(entries) => {
            if let Some(v) = value::read(entries).get(name) {
                return Ok(v.clone());
            }
        }
        Value::Host(host) => {
            let descriptor = ctx.reflect.descriptor(host);
            if let Some(v) = descriptor.get(host, name) {
                return Ok(v);
            }
        }
        _ => {}
    }
    if ctx.strict_names {
        Err(Error::UndefinedName(name.to_string()))
    } else {
        diagnose(format_args!("undefined name {}; using null", name));
        Ok(Value::Null)
    }
}

fn callee_label(callee: &Expr) -> String {
    match callee {
        Expr::Ident(name) => name.clone(),
        Expr::Selector { field, .. } => field.clone(),
        _ => "function".to_string(),
    }
}

/// Dispatch a call by callable shape
pub(crate) fn call_value(
    ctx: &Ctx,
    f: &Value,
    args: Vec<Value>,
    label: &str,
) -> Result<Value, Error> {
    match f {
        Value::Func(Callable::Script(script)) => call_script(ctx, script, args, label),
        Value::Func(Callable::Host(host)) => host.invoke(&args),
        Value::Func(Callable::Method(method)) => method.invoke(&args),
        other => Err(Error::type_mismatch(format!(
            "{} is not callable ({})",
            label,
            other.type_name()
        ))),
    }
}

fn call_script(
    ctx: &Ctx,
    script: &ScriptFn,
    args: Vec<Value>,
    label: &str,
) -> Result<Value, Error> {
    if args.len() != script.params.len() {
        return Err(Error::arg_count(
            label,
            script.params.len().to_string(),
            args.len(),
        ));
    }
    // the argument frame parents the captured environment, not the caller
    let frame = Scope::child(&script.env);
    for (param, arg) in script.params.iter().zip(args) {
        frame.declare(param.clone(), arg);
    }
    if let Some((name, ty)) = &script.named_result {
        frame.declare(name.clone(), zero_of_type(Some(ty)));
    }
    match eval_block_in(ctx, &script.body, &frame)? {
        Flow::Return(Some(v)) => Ok(v),
        // a naked return and falling off the end both yield the named
        // result's current binding when one is declared
        Flow::Return(None) => match &script.named_result {
            Some((name, _)) => Ok(frame.lookup(name).unwrap_or(Value::Null)),
            None => Ok(Value::Null),
        },
        Flow::Value(v) => match &script.named_result {
            Some((name, _)) => Ok(frame.lookup(name).unwrap_or(Value::Null)),
            None => Ok(v),
        },
        Flow::Break | Flow::Continue => Err(Error::UnsupportedNode(
            "break or continue outside of a loop".to_string(),
        )),
    }
}

/// `make(map[K]V)`, `make([]T, n)`, or `make(T)` for a type handle
fn eval_make(ctx: &Ctx, args: &[Expr], scope: &Arc<Scope>) -> Result<Value, Error> {
    let Some(first) = args.first() else {
        return Err(Error::arg_count("make", "at least 1", 0));
    };
    match first {
        Expr::TypeLit(TypeExpr::Map(_, _)) => Ok(Value::empty_map()),
        Expr::TypeLit(TypeExpr::Slice(_)) => {
            let n = match args.get(1) {
                Some(size) => eval_expr(ctx, size, scope)?.as_int()?,
                None => 0,
            };
            if n < 0 {
                return Err(Error::type_mismatch("make: negative list size"));
            }
            Ok(Value::list(vec![Value::Null; n as usize]))
        }
        Expr::TypeLit(other) => Err(Error::type_mismatch(format!(
            "make: cannot construct {:?}",
            other
        ))),
        expr => match eval_expr(ctx, expr, scope)? {
            Value::Type(handle) => Ok(handle.instantiate()),
            other => Err(Error::type_mismatch(format!(
                "make expects a type, got {}",
                other.type_name()
            ))),
        },
    }
}

fn index_value(container: &Value, idx: &Value) -> Result<Value, Error> {
    match container {
        Value::List(items) => {
            let i = match idx {
                Value::Int(i) => *i,
                other => {
                    return Err(Error::type_mismatch(format!(
                        "list index must be int, got {}",
                        other.type_name()
                    )))
                }
            };
            let items = value::read(items);
            if i < 0 || i as usize >= items.len() {
                return Err(Error::IndexOutOfRange {
                    index: i,
                    len: items.len(),
                });
            }
            Ok(items[i as usize].clone())
        }
        Value::Map(entries) => {
            let key = match idx {
                Value::Str(s) => s,
                other => return Err(Error::KeyTypeMismatch(other.type_name())),
            };
            Ok(value::read(entries).get(key).cloned().unwrap_or(Value::Null))
        }
        Value::Str(s) => {
            let i = match idx {
                Value::Int(i) => *i,
                other => {
                    return Err(Error::type_mismatch(format!(
                        "string index must be int, got {}",
                        other.type_name()
                    )))
                }
            };
            if i < 0 || i as usize >= s.len() || !s.is_char_boundary(i as usize) {
                return Err(Error::IndexOutOfRange {
                    index: i,
                    len: s.len(),
                });
            }
            match s[i as usize..].chars().next() {
                Some(c) => Ok(Value::Str(c.to_string())),
                None => Err(Error::IndexOutOfRange {
                    index: i,
                    len: s.len(),
                }),
            }
        }
        other => Err(Error::type_mismatch(format!(
            "cannot index {}",
            other.type_name()
        ))),
    }
}

/// Key/value pairs for range iteration, snapshotted before the loop body runs
fn range_pairs(subject: &Value) -> Result<Vec<(Value, Value)>, Error> {
    match subject {
        Value::List(items) => Ok(value::read(items)
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, v)| (Value::Int(i as i64), v))
            .collect()),
        Value::Map(entries) => Ok(value::read(entries)
            .iter()
            .map(|(k, v)| (Value::Str(k.clone()), v.clone()))
            .collect()),
        Value::Str(s) => Ok(s
            .char_indices()
            .map(|(i, c)| (Value::Int(i as i64), Value::Str(c.to_string())))
            .collect()),
        Value::Host(host) => host.with(|obj| obj.entries()).ok_or_else(|| {
            Error::type_mismatch(format!("cannot range over {}", host.type_name()))
        }),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::type_mismatch(format!(
            "cannot range over {}",
            other.type_name()
        ))),
    }
}

/// Zero value of a declared type; unknown names default to null
pub(crate) fn zero_of_type(ty: Option<&TypeExpr>) -> Value {
    match ty {
        None => Value::Null,
        Some(TypeExpr::Named(name)) => match name.as_str() {
            "int" | "int64" | "int32" => Value::Int(0),
            "float" | "float64" | "float32" => Value::Float(0.0),
            "string" => Value::Str(String::new()),
            "bool" => Value::Bool(false),
            _ => Value::Null,
        },
        Some(TypeExpr::Slice(_)) => Value::list(Vec::new()),
        Some(TypeExpr::Map(_, _)) => Value::empty_map(),
    }
}

fn binary_value(op: BinOp, left: Value, right: Value) -> Result<Value, Error> {
    match op {
        BinOp::Add => arith_add(left, right),
        BinOp::Sub => arith_sub(left, right),
        BinOp::Mul => arith_mul(left, right),
        BinOp::Div => arith_div(left, right),
        BinOp::Rem => arith_rem(left, right),
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::Ne => Ok(Value::Bool(left != right)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => order(op, left, right),
        BinOp::And | BinOp::Or => unreachable!("short-circuit operators handled by caller"),
    }
}

/// String concatenation applies when either operand is a string; the other
/// operand is rendered in its natural textual form.
pub(crate) fn arith_add(left: Value, right: Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 + b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
        (Value::Str(a), b) => Ok(Value::Str(format!("{}{}", a, b))),
        (a, Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (a, b) => Err(Error::type_mismatch(format!(
            "cannot add {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn arith_sub(left: Value, right: Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 - b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a - b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
        (a, b) => Err(Error::type_mismatch(format!(
            "cannot subtract {} from {}",
            b.type_name(),
            a.type_name()
        ))),
    }
}

fn arith_mul(left: Value, right: Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 * b)),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a * b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
        (a, b) => Err(Error::type_mismatch(format!(
            "cannot multiply {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn arith_div(left: Value, right: Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }
        (Value::Int(a), Value::Float(b)) => {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            Ok(Value::Float(a as f64 / b))
        }
        (Value::Float(a), Value::Int(b)) => {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            Ok(Value::Float(a / b as f64))
        }
        (Value::Float(a), Value::Float(b)) => {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            Ok(Value::Float(a / b))
        }
        (a, b) => Err(Error::type_mismatch(format!(
            "cannot divide {} by {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn arith_rem(left: Value, right: Value) -> Result<Value, Error> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_rem(b)))
        }
        (a, b) => Err(Error::type_mismatch(format!(
            "cannot take {} % {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn order(op: BinOp, left: Value, right: Value) -> Result<Value, Error> {
    let ordering = match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (a, b) => {
            return Err(Error::type_mismatch(format!(
                "cannot order {} and {}",
                a.type_name(),
                b.type_name()
            )))
        }
    };
    let result = match (op, ordering) {
        (_, None) => false,
        (BinOp::Lt, Some(o)) => o.is_lt(),
        (BinOp::Le, Some(o)) => o.is_le(),
        (BinOp::Gt, Some(o)) => o.is_gt(),
        (BinOp::Ge, Some(o)) => o.is_ge(),
        _ => unreachable!("order called with a non-ordering operator"),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_concat_formats_numbers() {
        assert_eq!(
            arith_add(Value::from("n="), Value::Int(3)).unwrap(),
            Value::from("n=3")
        );
        assert_eq!(
            arith_add(Value::Int(3), Value::from("!")).unwrap(),
            Value::from("3!")
        );
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(
            arith_add(Value::Int(1), Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            arith_mul(Value::Float(2.0), Value::Int(3)).unwrap(),
            Value::Float(6.0)
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            arith_div(Value::Int(1), Value::Int(0)),
            Err(Error::DivisionByZero)
        ));
        assert!(matches!(
            arith_div(Value::Float(1.0), Value::Float(0.0)),
            Err(Error::DivisionByZero)
        ));
        assert!(matches!(
            arith_rem(Value::Int(1), Value::Int(0)),
            Err(Error::DivisionByZero)
        ));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(
            order(BinOp::Lt, Value::Int(1), Value::Float(1.5)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            order(BinOp::Ge, Value::from("b"), Value::from("a")).unwrap(),
            Value::Bool(true)
        );
        assert!(order(BinOp::Lt, Value::Int(1), Value::from("a")).is_err());
    }
}
