mod common;

use common::ScriptedContext;
use pretty_assertions::assert_eq;
use storyscript::runtime::structural::{equals, to_source};
use storyscript::runtime::{
    Changer, ChangerFn, ChangerRegistry, Colour, ErrorKind, MacroRegistry, RuntimeResult, Value,
};

/// What a run of changers did to a piece of text
#[derive(Debug, Default, PartialEq)]
struct TextDescriptor {
    colour: Option<String>,
    styles: Vec<String>,
}

fn apply_colour(d: &mut TextDescriptor, params: &[Value]) -> RuntimeResult<()> {
    d.colour = params.first().map(to_source);
    Ok(())
}

fn apply_style(d: &mut TextDescriptor, params: &[Value]) -> RuntimeResult<()> {
    d.styles
        .extend(params.iter().filter_map(Value::as_str).map(str::to_string));
    Ok(())
}

fn registry() -> ChangerRegistry<TextDescriptor> {
    let mut registry = ChangerRegistry::new();
    registry.register("text-colour", apply_colour as ChangerFn<TextDescriptor>);
    registry.register("text-style", apply_style as ChangerFn<TextDescriptor>);
    registry
}

fn changer(ctx: &mut ScriptedContext, name: &str, args: Vec<Value>) -> Changer {
    match MacroRegistry::standard().call(ctx, name, args).unwrap() {
        Value::Changer(changer) => changer,
        other => panic!("expected a changer, got {:?}", other),
    }
}

#[test]
fn composed_changers_run_left_to_right() {
    let mut ctx = ScriptedContext::new();
    let red = changer(&mut ctx, "text-color", vec![Value::string("red")]);
    let bold = changer(&mut ctx, "text-style", vec![Value::string("bold")]);
    let blue = changer(
        &mut ctx,
        "colour",
        vec![Value::Colour(Colour::rgb(0, 0, 255))],
    );

    let chain = red.compose(&bold).compose(&blue);
    assert_eq!(chain.len(), 3);

    let mut text = TextDescriptor::default();
    chain.run(&registry(), &mut text).unwrap();
    assert_eq!(text.styles, vec!["bold".to_string()]);
    // the last colour wins
    assert_eq!(text.colour, Some(to_source(&Value::Colour(Colour::rgb(0, 0, 255)))));
}

#[test]
fn composition_leaves_operands_untouched() {
    let mut ctx = ScriptedContext::new();
    let bold = changer(&mut ctx, "text-style", vec![Value::string("bold")]);
    let italic = changer(&mut ctx, "text-style", vec![Value::string("italic")]);
    let before = to_source(&Value::Changer(bold.clone()));

    let both = bold.compose(&italic);
    assert_eq!(to_source(&Value::Changer(bold.clone())), before);
    assert_eq!(
        to_source(&Value::Changer(both.clone())),
        r#"(text-style:"bold")+(text-style:"italic")"#
    );

    let again = bold.compose(&italic);
    assert!(equals(&Value::Changer(both), &Value::Changer(again)));
}

#[test]
fn unknown_text_style_is_explained() {
    let mut ctx = ScriptedContext::new();
    let err = MacroRegistry::standard()
        .call(&mut ctx, "text-style", vec![Value::string("sparkly")])
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Datatype);
    assert!(err.explanation.as_deref().unwrap_or_default().contains("bold"));
}

#[test]
fn changers_without_a_handler_fail_when_run() {
    let mut ctx = ScriptedContext::new();
    let bold = changer(&mut ctx, "text-style", vec![Value::string("bold")]);
    let mut registry = ChangerRegistry::new();
    registry.register("text-colour", apply_colour as ChangerFn<TextDescriptor>);

    let mut text = TextDescriptor::default();
    let err = bold.run(&registry, &mut text).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Operation);
    assert_eq!(text, TextDescriptor::default());
}
