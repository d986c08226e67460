//! Standard macro set
//!
//! Collections, patterns, lambda consumers, colours and the changers the
//! renderer understands. Installed once into the standard registry.

use crate::runtime::changer::Changer;
use crate::runtime::custom_macro::CustomMacro;
use crate::runtime::datatype::{Datatype, NamedType};
use crate::runtime::environment::EvalContext;
use crate::runtime::error::{nth, plural, RuntimeError, RuntimeResult};
use crate::runtime::lambda::{ClauseName, Lambda};
use crate::runtime::macros::{MacroFn, MacroRegistry};
use crate::runtime::pattern::{Combinator, Pattern};
use crate::runtime::structural;
use crate::runtime::type_validator::{ParamType, Signature};
use crate::runtime::values::{
    Colour, Datamap, Dataset, Gradient, GradientStop, MapKey, TypedVar, Value,
};
use std::rc::Rc;
use std::sync::Arc;

/// Style names accepted by `(text-style:)`
pub const TEXT_STYLES: [&str; 24] = [
    "none",
    "bold",
    "italic",
    "underline",
    "double-underline",
    "wavy-underline",
    "strike",
    "double-strike",
    "wavy-strike",
    "superscript",
    "subscript",
    "mark",
    "outline",
    "shadow",
    "emboss",
    "condense",
    "expand",
    "blur",
    "blurrier",
    "smear",
    "mirror",
    "upside-down",
    "fade-in-out",
    "rumble",
];

pub struct StandardLibrary;

impl StandardLibrary {
    pub fn install(registry: &mut MacroRegistry) {
        Self::load_collection_macros(registry);
        Self::load_pattern_macros(registry);
        Self::load_lambda_macros(registry);
        Self::load_colour_macros(registry);
        Self::load_changer_macros(registry);
        Self::load_meta_macros(registry);
    }

    fn define(registry: &mut MacroRegistry, names: &[&str], params: Vec<ParamType>, func: MacroFn) {
        match Signature::new(params) {
            Ok(signature) => registry.register(names, signature, func),
            Err(err) => log::warn!("not registering {:?}: {}", names, err),
        }
    }

    fn load_collection_macros(registry: &mut MacroRegistry) {
        let any = || ParamType::is(Datatype::any());

        Self::define(registry, &["a", "array"], vec![ParamType::rest(any())], Self::array);
        Self::define(registry, &["dm", "datamap"], vec![ParamType::rest(any())], Self::datamap);
        Self::define(registry, &["ds", "dataset"], vec![ParamType::rest(any())], Self::dataset);
        Self::define(
            registry,
            &["count"],
            vec![
                ParamType::Either(vec![
                    ParamType::is(Datatype::string()),
                    ParamType::is(Datatype::Named(NamedType::Array)),
                    ParamType::is(Datatype::Named(NamedType::Dataset)),
                ]),
                ParamType::one_or_more(any()),
            ],
            Self::count,
        );
        Self::define(
            registry,
            &["range"],
            vec![
                ParamType::is(Datatype::Named(NamedType::Integer)),
                ParamType::is(Datatype::Named(NamedType::Integer)),
            ],
            Self::range,
        );
    }

    fn load_pattern_macros(registry: &mut MacroRegistry) {
        let fragment = || {
            ParamType::Either(vec![
                ParamType::is(Datatype::string()),
                ParamType::is(Datatype::Named(NamedType::Datatype)),
            ])
        };
        let fragments = || vec![ParamType::one_or_more(fragment())];

        Self::define(registry, &["p", "pattern"], fragments(), Self::pattern);
        Self::define(registry, &["p-either", "pattern-either"], fragments(), Self::pattern_either);
        Self::define(registry, &["p-opt", "pattern-opt"], fragments(), Self::pattern_opt);
        Self::define(registry, &["p-not", "pattern-not"], fragments(), Self::pattern_not);
        Self::define(registry, &["p-ins", "pattern-ins"], fragments(), Self::pattern_ins);
        Self::define(
            registry,
            &["p-many", "pattern-many"],
            vec![ParamType::one_or_more(ParamType::Either(vec![
                ParamType::is(Datatype::number()),
                fragment(),
            ]))],
            Self::pattern_many,
        );
    }

    fn load_lambda_macros(registry: &mut MacroRegistry) {
        let where_lambda = || ParamType::lambda(&[ClauseName::Where]);
        let values = || ParamType::rest(ParamType::is(Datatype::any()));

        Self::define(registry, &["filtered"], vec![where_lambda(), values()], Self::filtered);
        Self::define(registry, &["find"], vec![where_lambda(), values()], Self::find);
        Self::define(registry, &["all-pass"], vec![where_lambda(), values()], Self::all_pass);
        Self::define(registry, &["some-pass"], vec![where_lambda(), values()], Self::some_pass);
        Self::define(registry, &["none-pass"], vec![where_lambda(), values()], Self::none_pass);
        Self::define(
            registry,
            &["altered"],
            vec![
                ParamType::Either(vec![
                    ParamType::lambda(&[ClauseName::Via]),
                    ParamType::lambda(&[ClauseName::Where, ClauseName::Via]),
                ]),
                values(),
            ],
            Self::altered,
        );
        Self::define(
            registry,
            &["folded"],
            vec![
                ParamType::Either(vec![
                    ParamType::lambda(&[ClauseName::Making, ClauseName::Via]),
                    ParamType::lambda(&[ClauseName::Making, ClauseName::Where, ClauseName::Via]),
                ]),
                ParamType::is(Datatype::any()),
                values(),
            ],
            Self::folded,
        );
    }

    fn load_colour_macros(registry: &mut MacroRegistry) {
        let channel = || ParamType::check(is_channel, "a whole number between 0 and 255");

        Self::define(registry, &["rgb"], vec![channel(), channel(), channel()], Self::rgb);
        Self::define(
            registry,
            &["rgba"],
            vec![
                channel(),
                channel(),
                channel(),
                ParamType::check(is_fraction, "a number between 0 and 1"),
            ],
            Self::rgba,
        );
        Self::define(
            registry,
            &["gradient"],
            vec![
                ParamType::is(Datatype::number()),
                ParamType::one_or_more(ParamType::Either(vec![
                    ParamType::is(Datatype::number()),
                    ParamType::is(Datatype::Named(NamedType::Colour)),
                ])),
            ],
            Self::gradient,
        );
    }

    fn load_changer_macros(registry: &mut MacroRegistry) {
        Self::define(
            registry,
            &["text-colour", "text-color", "colour", "color"],
            vec![ParamType::Either(vec![
                ParamType::is(Datatype::string()),
                ParamType::is(Datatype::Named(NamedType::Colour)),
                ParamType::is(Datatype::Named(NamedType::Gradient)),
            ])],
            Self::text_colour,
        );
        Self::define(
            registry,
            &["text-style"],
            vec![ParamType::one_or_more(ParamType::is(Datatype::string()))],
            Self::text_style,
        );
    }

    fn load_meta_macros(registry: &mut MacroRegistry) {
        Self::define(
            registry,
            &["macro"],
            vec![ParamType::one_or_more(ParamType::Either(vec![
                ParamType::check(|v| matches!(v, Value::TypedVar(_)), "a typed variable"),
                ParamType::is(Datatype::string()),
            ]))],
            Self::custom_macro,
        );
        Self::define(
            registry,
            &["source"],
            vec![ParamType::is(Datatype::any())],
            Self::source,
        );
    }

    // Collections

    fn array(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        for value in &args {
            value.check_storable("an array")?;
        }
        Ok(Value::Array(args))
    }

    fn datamap(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        if args.len() % 2 != 0 {
            let last = args.last().map(structural::to_source).unwrap_or_default();
            return Err(RuntimeError::datatype(format!(
                "The (dm:) macro needs a value after every data name, but {} has none.",
                last
            )));
        }
        let mut map = Datamap::new();
        for pair in args.chunks_exact(2) {
            if let [name, value] = pair {
                let key = MapKey::from_value(name)?;
                if map.insert(key.clone(), value.clone())?.is_some() {
                    return Err(RuntimeError::property(format!(
                        "The (dm:) macro was given the data name {} more than once.",
                        key.to_source()
                    )));
                }
            }
        }
        Ok(Value::Datamap(map))
    }

    fn dataset(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::Dataset(Dataset::from_values(args)?))
    }

    fn count(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (container, needles) = split_first(&args)?;
        let mut total = 0usize;
        for (index, needle) in needles.iter().enumerate() {
            total += match (container, needle) {
                (Value::String(haystack), Value::String(s)) if !s.is_empty() => {
                    haystack.matches(s.as_str()).count()
                }
                (Value::String(_), other) => {
                    return Err(RuntimeError::datatype(format!(
                        "The (count:) macro's {} value should be a non-empty string, because \
                         only strings can be counted inside strings, but it was {}.",
                        nth(index + 2),
                        other.type_name()
                    )))
                }
                (Value::Array(items), needle) => items
                    .iter()
                    .filter(|item| structural::equals(item, needle))
                    .count(),
                (Value::Dataset(set), needle) => usize::from(set.contains(needle)),
                (other, _) => {
                    return Err(RuntimeError::datatype(format!(
                        "I can't count values inside {}.",
                        other.type_name()
                    )))
                }
            };
        }
        Ok(Value::Number(total as f64))
    }

    fn range(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let a = range_bound(&args, 0)?;
        let b = range_bound(&args, 1)?;
        let (low, high) = (a.min(b), a.max(b));
        let limit = ctx.config().max_range_len;
        let len = high
            .checked_sub(low)
            .and_then(|span| span.checked_add(1))
            .filter(|len| usize::try_from(*len).map_or(false, |len| len <= limit));
        if len.is_none() {
            return Err(RuntimeError::operation(format!(
                "The (range:) macro can't make an array of more than {} from {} to {}.",
                plural(limit, "number"),
                low,
                high
            )));
        }
        Ok(Value::Array(
            (low..=high).map(|n| Value::Number(n as f64)).collect(),
        ))
    }

    // Patterns

    fn build_pattern(
        ctx: &mut dyn EvalContext,
        combinator: Combinator,
        args: &[Value],
    ) -> RuntimeResult<Value> {
        let pattern = Pattern::build(combinator, args, ctx.config().pattern_size_limit)?;
        Ok(Value::Datatype(Datatype::Pattern(Arc::new(pattern))))
    }

    fn pattern(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        Self::build_pattern(ctx, Combinator::Sequence, &args)
    }

    fn pattern_either(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        Self::build_pattern(ctx, Combinator::Either, &args)
    }

    fn pattern_opt(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        Self::build_pattern(ctx, Combinator::Optional, &args)
    }

    fn pattern_not(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        Self::build_pattern(ctx, Combinator::Not, &args)
    }

    fn pattern_ins(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        Self::build_pattern(ctx, Combinator::CaseInsensitive, &args)
    }

    /// `(p-many: [min, [max,]] ...fragments)`
    fn pattern_many(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let bounds: Vec<f64> = args.iter().take(2).map_while(Value::as_number).collect();
        let fragments = &args[bounds.len()..];
        if let Some(index) = fragments.iter().position(|v| v.as_number().is_some()) {
            return Err(RuntimeError::datatype(format!(
                "The (p-many:) macro's {} value is a number, but only the first two values \
                 can be numbers.",
                nth(bounds.len() + index + 1)
            )));
        }
        let pattern = Pattern::repeat(
            bounds.first().copied(),
            bounds.get(1).copied(),
            fragments,
            ctx.config().pattern_size_limit,
        )?;
        Ok(Value::Datatype(Datatype::Pattern(Arc::new(pattern))))
    }

    // Lambda consumers

    fn filtered(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (lambda, items) = lambda_and_items(&args)?;
        Ok(Value::Array(lambda.filter(ctx, items)?))
    }

    fn altered(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (lambda, items) = lambda_and_items(&args)?;
        Ok(Value::Array(lambda.map(ctx, items)?))
    }

    fn find(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (lambda, items) = lambda_and_items(&args)?;
        lambda.find(ctx, items)?.ok_or_else(|| {
            RuntimeError::operation(format!(
                "None of the {} given to (find:) passed the lambda '{}'.",
                plural(items.len(), "value"),
                structural::to_source(&Value::Lambda(Rc::clone(&lambda)))
            ))
        })
    }

    fn all_pass(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (lambda, items) = lambda_and_items(&args)?;
        Ok(Value::Boolean(lambda.all_pass(ctx, items)?))
    }

    fn some_pass(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (lambda, items) = lambda_and_items(&args)?;
        Ok(Value::Boolean(lambda.some_pass(ctx, items)?))
    }

    fn none_pass(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (lambda, items) = lambda_and_items(&args)?;
        Ok(Value::Boolean(lambda.none_pass(ctx, items)?))
    }

    fn folded(ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (lambda, rest) = lambda_and_items(&args)?;
        let (initial, items) = split_first(rest)?;
        lambda.fold(ctx, initial.clone(), items)
    }

    // Colours

    fn rgb(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let [r, g, b] = channels(&args)?;
        Ok(Value::Colour(Colour::rgb(r, g, b)))
    }

    fn rgba(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let [r, g, b] = channels(&args)?;
        let alpha = number_arg(&args, 3)?;
        Ok(Value::Colour(Colour::rgba(r, g, b, alpha)))
    }

    /// `(gradient: angle, position, colour, position, colour, ...)`
    fn gradient(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let angle = number_arg(&args, 0)?;
        let stops = &args[1..];
        if stops.len() < 4 || stops.len() % 2 != 0 {
            return Err(RuntimeError::datatype(
                "The (gradient:) macro needs at least two stops, each a position number \
                 followed by a colour.",
            ));
        }
        let mut gradient = Gradient {
            angle,
            stops: Vec::with_capacity(stops.len() / 2),
        };
        for (pair_index, pair) in stops.chunks_exact(2).enumerate() {
            match pair {
                [Value::Number(position), Value::Colour(colour)] if (0.0..=1.0).contains(position) => {
                    gradient.stops.push(GradientStop {
                        position: *position,
                        colour: colour.clone(),
                    })
                }
                _ => {
                    return Err(RuntimeError::datatype(format!(
                        "The (gradient:) macro's {} stop should be a number between 0 and 1 \
                         followed by a colour.",
                        nth(pair_index + 1)
                    )))
                }
            }
        }
        Ok(Value::Gradient(gradient))
    }

    // Changers

    fn text_colour(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        Ok(Value::Changer(Changer::new("text-colour", args)))
    }

    fn text_style(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        for (index, style) in args.iter().enumerate() {
            let name = style.as_str().unwrap_or_default();
            if !TEXT_STYLES.contains(&name.to_lowercase().as_str()) {
                return Err(RuntimeError::datatype(format!(
                    "The (text-style:) macro's {} value, {}, isn't a text style I know.",
                    nth(index + 1),
                    structural::to_source(style)
                ))
                .with_explanation(format!("The known styles are {}.", TEXT_STYLES.join(", "))));
            }
        }
        Ok(Value::Changer(Changer::new("text-style", args)))
    }

    // Meta

    /// `(macro: ...typed variables, body)`
    fn custom_macro(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let Some((Value::String(body), params)) = args.split_last() else {
            return Err(RuntimeError::datatype(
                "The (macro:) macro's last value should be a string holding the macro's body.",
            ));
        };
        let typed = params
            .iter()
            .enumerate()
            .map(|(index, param)| match param {
                Value::TypedVar(typed) => Ok(typed.clone()),
                other => Err(RuntimeError::datatype(format!(
                    "The (macro:) macro's {} value should be a typed variable, but it was {}.",
                    nth(index + 1),
                    other.type_name()
                ))),
            })
            .collect::<RuntimeResult<Vec<TypedVar>>>()?;
        Ok(Value::CustomMacro(Rc::new(CustomMacro::new(typed, body.clone())?)))
    }

    fn source(_ctx: &mut dyn EvalContext, args: Vec<Value>) -> RuntimeResult<Value> {
        let (value, _) = split_first(&args)?;
        Ok(Value::String(structural::to_source(value)))
    }
}

fn is_channel(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.fract() == 0.0 && (0.0..=255.0).contains(n))
}

fn is_fraction(value: &Value) -> bool {
    matches!(value, Value::Number(n) if (0.0..=1.0).contains(n))
}

fn missing(index: usize) -> RuntimeError {
    RuntimeError::macrocall(format!("The {} value is missing.", nth(index + 1)))
}

fn split_first(args: &[Value]) -> RuntimeResult<(&Value, &[Value])> {
    args.split_first().ok_or_else(|| missing(0))
}

fn number_arg(args: &[Value], index: usize) -> RuntimeResult<f64> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(RuntimeError::datatype(format!(
            "The {} value should be a number, but it was {}.",
            nth(index + 1),
            other.type_name()
        ))),
        None => Err(missing(index)),
    }
}

/// Integers beyond 2^53 can't be told apart as numbers
fn range_bound(args: &[Value], index: usize) -> RuntimeResult<i64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_991.0;
    let n = number_arg(args, index)?;
    if n.abs() > MAX_EXACT {
        return Err(RuntimeError::operation(format!(
            "The (range:) macro's {} value, {}, is too large to count from.",
            nth(index + 1),
            structural::to_source(&Value::Number(n))
        )));
    }
    Ok(n as i64)
}

fn lambda_and_items(args: &[Value]) -> RuntimeResult<(Rc<Lambda>, &[Value])> {
    match split_first(args)? {
        (Value::Lambda(lambda), items) => Ok((Rc::clone(lambda), items)),
        (other, _) => Err(RuntimeError::datatype(format!(
            "The 1st value should be a lambda, but it was {}.",
            other.type_name()
        ))),
    }
}

fn channels(args: &[Value]) -> RuntimeResult<[u8; 3]> {
    let mut out = [0u8; 3];
    for (index, channel) in out.iter_mut().enumerate() {
        *channel = number_arg(args, index)? as u8;
    }
    Ok(out)
}
