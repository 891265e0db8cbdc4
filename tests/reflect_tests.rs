// ABOUTME: Host reflection end-to-end: field access, embedded promotion, method dispatch, mutation

use std::sync::{Arc, RwLock};

use hostscript::{Error, Interpreter, Reflect, TypeSpec, Value};

#[derive(Debug, Clone, Default)]
struct Base {
    x: i64,
}

impl Reflect for Base {
    fn type_name() -> &'static str {
        "Base"
    }

    fn type_spec() -> TypeSpec {
        TypeSpec::new("Base")
            .field(
                "X",
                |t: &Base| t.x,
                |t: &mut Base, v| {
                    t.x = v.as_int()?;
                    Ok(())
                },
            )
            .method("Test", |_t: &Base, _args| Ok(Value::from("base")))
    }
}

#[derive(Debug, Clone, Default)]
struct Base2 {
    yyy: i64,
}

impl Reflect for Base2 {
    fn type_name() -> &'static str {
        "Base2"
    }

    fn type_spec() -> TypeSpec {
        TypeSpec::new("Base2").field(
            "YYY",
            |t: &Base2| t.yyy,
            |t: &mut Base2, v| {
                t.yyy = v.as_int()?;
                Ok(())
            },
        )
    }
}

#[derive(Debug, Clone, Default)]
struct Composite {
    base: Base,
    base2: Base2,
    tags: Value,
}

impl Reflect for Composite {
    fn type_name() -> &'static str {
        "Composite"
    }

    fn type_spec() -> TypeSpec {
        TypeSpec::new("Composite")
            .embed(|t: &Composite| &t.base, |t: &mut Composite| &mut t.base)
            .embed(|t: &Composite| &t.base2, |t: &mut Composite| &mut t.base2)
            .field(
                "TestMp",
                |t: &Composite| t.tags.clone(),
                |t: &mut Composite, v| {
                    t.tags = v;
                    Ok(())
                },
            )
            .method("Bar", |t: &Composite, _args| Ok(Value::Int(t.base.x)))
            .method("Concat", |_t: &Composite, args: &[Value]| {
                let mut out = String::new();
                for a in args {
                    out.push_str(&a.to_string());
                }
                Ok(Value::from(out))
            })
            .method_mut("Test", |_t: &mut Composite, _args| Ok(Value::from("override")))
    }
}

fn pair(x: &str, y: &str) -> Value {
    let mut m = indexmap::IndexMap::new();
    m.insert("x".to_string(), Value::from(x));
    m.insert("y".to_string(), Value::from(y));
    Value::map(m)
}

fn sample() -> Composite {
    Composite {
        base: Base { x: 222 },
        base2: Base2 { yyy: 333 },
        tags: Value::list(vec![pair("a", "b"), pair("c", "d")]),
    }
}

#[test]
fn test_global_field_read_write_visible_to_host() {
    let interp = Interpreter::new();
    let shared = Arc::new(RwLock::new(sample()));
    interp.set_global(Value::from_shared(Arc::clone(&shared)));

    let result = interp
        .interpret("print(G.X); G.X = 3; return G.X")
        .unwrap();
    assert_eq!(result, Value::Int(3));
    assert_eq!(shared.read().unwrap().base.x, 3);
}

#[test]
fn test_embedded_fields_promote_to_top_level_names() {
    let interp = Interpreter::new();
    interp.set_global(Value::host(sample()));
    assert_eq!(interp.interpret("return X + YYY").unwrap(), Value::Int(555));
    assert_eq!(interp.interpret("return G.YYY").unwrap(), Value::Int(333));
}

#[test]
fn test_method_dispatch_through_global() {
    let interp = Interpreter::new();
    interp.set_global(Value::host(sample()));
    assert_eq!(interp.interpret("return Bar()").unwrap(), Value::Int(222));
    assert_eq!(interp.interpret("return G.Bar()").unwrap(), Value::Int(222));
}

#[test]
fn test_pointer_receiver_overrides_embedded_method() {
    let interp = Interpreter::new();
    interp.set_global(Value::host(sample()));
    assert_eq!(
        interp.interpret("return Test()").unwrap(),
        Value::from("override")
    );
}

#[test]
fn test_variadic_style_method_args() {
    let interp = Interpreter::new();
    interp.set_global(Value::host(sample()));
    assert_eq!(
        interp.interpret(r#"return Concat("a", 1, "b")"#).unwrap(),
        Value::from("a1b")
    );
}

#[test]
fn test_reflection_reads_are_idempotent() {
    let interp = Interpreter::new();
    interp.set_global(Value::host(sample()));
    let a = interp.interpret("G.X").unwrap();
    let b = interp.interpret("G.X").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_range_over_host_list_field() {
    let interp = Interpreter::new();
    interp.set_global(Value::host(sample()));
    let src = r#"
out := ""
for _, m := range TestMp {
    out += m.x + m.y + ","
}
return out
"#;
    assert_eq!(interp.interpret(src).unwrap(), Value::from("ab,cd,"));
}

#[test]
fn test_assignment_to_frozen_value_fails() {
    let interp = Interpreter::new();
    interp.set_global(Value::host(sample()));
    assert!(matches!(
        interp.interpret("G.X = 3"),
        Err(Error::FieldNotAssignable { .. })
    ));
}

#[test]
fn test_unknown_selector_yields_null() {
    let interp = Interpreter::new();
    interp.set_global(Value::host(sample()));
    assert_eq!(interp.interpret("G.Missing").unwrap(), Value::Null);
    assert_eq!(interp.interpret("Missing").unwrap(), Value::Null);
}

#[test]
fn test_embedded_field_assignment_through_shared_global() {
    let interp = Interpreter::new();
    let shared = Arc::new(RwLock::new(sample()));
    interp.set_global(Value::from_shared(Arc::clone(&shared)));
    interp.interpret("YYY = 1").unwrap();
    // bare-name assignment to an unbound identifier is a silent no-op
    assert_eq!(shared.read().unwrap().base2.yyy, 333);
    interp.interpret("G.YYY = 7").unwrap();
    assert_eq!(shared.read().unwrap().base2.yyy, 7);
}

#[test]
fn test_pointer_receiver_on_frozen_discards_writes() {
    #[derive(Debug, Clone, Default)]
    struct Counter {
        n: i64,
    }

    impl Reflect for Counter {
        fn type_name() -> &'static str {
            "Counter"
        }

        fn type_spec() -> TypeSpec {
            TypeSpec::new("Counter")
                .field(
                    "N",
                    |t: &Counter| t.n,
                    |t: &mut Counter, v| {
                        t.n = v.as_int()?;
                        Ok(())
                    },
                )
                .method_mut("Bump", |t: &mut Counter, _args| {
                    t.n += 1;
                    Ok(Value::Int(t.n))
                })
        }
    }

    let interp = Interpreter::new();
    interp.set("frozen", Value::host(Counter { n: 0 }));
    // the temporary copy sees the increment, the snapshot does not
    assert_eq!(interp.interpret("frozen.Bump()").unwrap(), Value::Int(1));
    assert_eq!(interp.interpret("frozen.N").unwrap(), Value::Int(0));

    let shared = Arc::new(RwLock::new(Counter { n: 0 }));
    interp.set("live", Value::from_shared(Arc::clone(&shared)));
    assert_eq!(interp.interpret("live.Bump()").unwrap(), Value::Int(1));
    assert_eq!(interp.interpret("live.Bump()").unwrap(), Value::Int(2));
    assert_eq!(shared.read().unwrap().n, 2);
}

#[test]
fn test_field_type_conversion_on_write() {
    let interp = Interpreter::new();
    let shared = Arc::new(RwLock::new(sample()));
    interp.set_global(Value::from_shared(Arc::clone(&shared)));
    // float converts into the int field
    interp.interpret("G.X = 4.9").unwrap();
    assert_eq!(shared.read().unwrap().base.x, 4);
    // a string does not
    assert!(matches!(
        interp.interpret(r#"G.X = "nope""#),
        Err(Error::TypeMismatch(_))
    ));
}

#[test]
fn test_host_entries_capability_supports_range_and_len() {
    #[derive(Debug, Clone, Default)]
    struct Bag {
        items: Vec<i64>,
    }

    impl Reflect for Bag {
        fn type_name() -> &'static str {
            "Bag"
        }

        fn type_spec() -> TypeSpec {
            TypeSpec::new("Bag")
        }

        fn length(&self) -> Option<usize> {
            Some(self.items.len())
        }

        fn entries(&self) -> Option<Vec<(Value, Value)>> {
            Some(
                self.items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (Value::Int(i as i64), Value::Int(*v)))
                    .collect(),
            )
        }
    }

    let interp = Interpreter::new();
    interp.set("bag", Value::host(Bag { items: vec![5, 6] }));
    assert_eq!(interp.interpret("len(bag)").unwrap(), Value::Int(2));
    assert_eq!(
        interp
            .interpret("total := 0; for _, v := range bag { total += v }; return total")
            .unwrap(),
        Value::Int(11)
    );
    assert_eq!(interp.interpret("has(bag, 6)").unwrap(), Value::Bool(true));
    assert_eq!(interp.interpret("has(bag, 9)").unwrap(), Value::Bool(false));
}
