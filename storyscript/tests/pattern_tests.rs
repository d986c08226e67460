mod common;

use common::ScriptedContext;
use storyscript::runtime::{Datatype, ErrorKind, MacroRegistry, NamedType, Value};
use storyscript::RuntimeConfig;

fn call(ctx: &mut ScriptedContext, name: &str, args: Vec<Value>) -> Value {
    MacroRegistry::standard().call(ctx, name, args).unwrap()
}

fn datatype(value: &Value) -> &Datatype {
    match value {
        Value::Datatype(d) => d,
        other => panic!("expected a datatype, got {:?}", other),
    }
}

fn named(t: NamedType) -> Value {
    Value::Datatype(Datatype::Named(t))
}

#[test]
fn patterns_match_whole_strings_only() {
    let mut ctx = ScriptedContext::new();
    let foo = call(&mut ctx, "p", vec![Value::string("foo")]);
    let foo = datatype(&foo);
    assert!(foo.check(&Value::string("foo")).unwrap());
    assert!(!foo.check(&Value::string("xfooy")).unwrap());
    assert!(!foo.check(&Value::Number(1.0)).unwrap());

    let anywhere = call(
        &mut ctx,
        "p",
        vec![named(NamedType::String), Value::string("foo"), named(NamedType::String)],
    );
    assert!(datatype(&anywhere).check(&Value::string("xfooy")).unwrap());
}

#[test]
fn repeat_takes_leading_bounds() {
    let mut ctx = ScriptedContext::new();
    let many = call(
        &mut ctx,
        "p-many",
        vec![Value::Number(2.0), Value::Number(3.0), Value::string("ab")],
    );
    let many = datatype(&many);
    assert!(many.check(&Value::string("abab")).unwrap());
    assert!(!many.check(&Value::string("ab")).unwrap());
    assert!(!many.check(&Value::string("abababab")).unwrap());

    let err = MacroRegistry::standard()
        .call(
            &mut ctx,
            "p-many",
            vec![Value::Number(3.0), Value::Number(2.0), Value::string("a")],
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);

    let one_or_more = call(&mut ctx, "p-many", vec![Value::string("a")]);
    assert!(!datatype(&one_or_more).check(&Value::string("")).unwrap());
}

#[test]
fn nested_patterns_compose() {
    let mut ctx = ScriptedContext::new();
    let animal = call(&mut ctx, "p-either", vec![Value::string("cat"), Value::string("dog")]);
    let opt_s = call(&mut ctx, "p-opt", vec![Value::string("s")]);
    let phrase = call(
        &mut ctx,
        "p",
        vec![Value::string("the "), animal, opt_s.clone()],
    );
    let phrase = datatype(&phrase);
    assert!(phrase.check(&Value::string("the dogs")).unwrap());
    assert!(phrase.check(&Value::string("the cat")).unwrap());
    assert!(!phrase.check(&Value::string("the cow")).unwrap());

    // an optional pattern can't be used on its own
    let err = datatype(&opt_s).check(&Value::string("s")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Datatype);
}

#[test]
fn malformed_arguments_fail_at_construction() {
    let mut ctx = ScriptedContext::new();
    let std = MacroRegistry::standard();
    let err = std.call(&mut ctx, "p", vec![Value::Boolean(true)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Datatype);
    let err = std.call(&mut ctx, "p", vec![named(NamedType::Number)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Datatype);
    let err = std.call(&mut ctx, "p-not", vec![named(NamedType::String)]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Datatype);
}

#[test]
fn case_insensitive_and_negated_patterns() {
    let mut ctx = ScriptedContext::new();
    let ins = call(&mut ctx, "p-ins", vec![Value::string("yes")]);
    assert!(datatype(&ins).check(&Value::string("YeS")).unwrap());

    let not_vowel = call(&mut ctx, "p-not", vec![Value::string("aeiou")]);
    assert!(datatype(&not_vowel).check(&Value::string("z")).unwrap());
    assert!(!datatype(&not_vowel).check(&Value::string("a")).unwrap());
}

#[test]
fn size_limit_comes_from_config() {
    let config = RuntimeConfig {
        pattern_size_limit: 16,
        ..RuntimeConfig::default()
    };
    let mut ctx = ScriptedContext::with_config(config);
    let err = MacroRegistry::standard()
        .call(
            &mut ctx,
            "p-many",
            vec![Value::Number(50.0), Value::Number(100.0), named(NamedType::Alnum)],
        )
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
}
