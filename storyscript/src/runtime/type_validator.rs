// Macro signatures and argument validation

use crate::runtime::datatype::Datatype;
use crate::runtime::error::{nth, plural, RuntimeError, RuntimeResult};
use crate::runtime::lambda::ClauseName;
use crate::runtime::values::Value;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

/// Arbitrary value test used for range-limited parameters
#[derive(Clone, Copy)]
pub struct ValueCheck {
    pub test: fn(&Value) -> bool,
    pub description: &'static str,
}

impl fmt::Debug for ValueCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueCheck({})", self.description)
    }
}

/// Accepted shape of one parameter position
#[derive(Debug, Clone)]
pub enum ParamType {
    Is(Datatype),
    /// May be left out, but only at the end of the call
    Optional(Box<ParamType>),
    Either(Vec<ParamType>),
    /// Like the inner type, reporting mismatches with a custom message
    Wrapped(Box<ParamType>, String),
    Check(ValueCheck),
    /// A lambda whose clause set is exactly these clauses
    LambdaShape(Vec<ClauseName>),
    /// Zero or more remaining values of this type
    Rest(Box<ParamType>),
    /// One or more remaining values of this type
    OneOrMore(Box<ParamType>),
}

impl ParamType {
    pub fn is(datatype: Datatype) -> ParamType {
        ParamType::Is(datatype)
    }

    pub fn optional(inner: ParamType) -> ParamType {
        ParamType::Optional(Box::new(inner))
    }

    pub fn rest(inner: ParamType) -> ParamType {
        ParamType::Rest(Box::new(inner))
    }

    pub fn one_or_more(inner: ParamType) -> ParamType {
        ParamType::OneOrMore(Box::new(inner))
    }

    pub fn wrapped(inner: ParamType, message: impl Into<String>) -> ParamType {
        ParamType::Wrapped(Box::new(inner), message.into())
    }

    pub fn check(test: fn(&Value) -> bool, description: &'static str) -> ParamType {
        ParamType::Check(ValueCheck { test, description })
    }

    pub fn lambda(clauses: &[ClauseName]) -> ParamType {
        ParamType::LambdaShape(clauses.to_vec())
    }

    pub fn accepts(&self, value: &Value) -> RuntimeResult<bool> {
        match self {
            ParamType::Is(datatype) => datatype.check(value),
            ParamType::Optional(inner)
            | ParamType::Wrapped(inner, _)
            | ParamType::Rest(inner)
            | ParamType::OneOrMore(inner) => inner.accepts(value),
            ParamType::Either(options) => {
                for option in options {
                    if option.accepts(value)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            ParamType::Check(check) => Ok((check.test)(value)),
            ParamType::LambdaShape(clauses) => Ok(match value {
                Value::Lambda(lambda) => {
                    lambda.clause_names() == clauses.iter().copied().collect::<BTreeSet<_>>()
                }
                _ => false,
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ParamType::Is(datatype) => datatype.describe(),
            ParamType::Optional(inner)
            | ParamType::Wrapped(inner, _)
            | ParamType::Rest(inner)
            | ParamType::OneOrMore(inner) => inner.describe(),
            ParamType::Either(options) => {
                let described: Vec<String> = options.iter().map(ParamType::describe).collect();
                match described.split_last() {
                    Some((last, rest)) if !rest.is_empty() => {
                        format!("{} or {}", rest.join(", "), last)
                    }
                    _ => described.concat(),
                }
            }
            ParamType::Check(check) => check.description.to_string(),
            ParamType::LambdaShape(clauses) => format!("a lambda with {}", clause_list(clauses)),
        }
    }

    fn only_lambda_shapes(&self) -> bool {
        match self {
            ParamType::LambdaShape(_) => true,
            ParamType::Optional(inner) => inner.only_lambda_shapes(),
            ParamType::Either(options) => {
                !options.is_empty() && options.iter().all(ParamType::only_lambda_shapes)
            }
            _ => false,
        }
    }

    fn is_optional(&self) -> bool {
        matches!(self, ParamType::Optional(_))
    }
}

fn clause_list<'a>(clauses: impl IntoIterator<Item = &'a ClauseName>) -> String {
    let names = clauses.into_iter().map(|c| format!("'{}'", c)).join(", ");
    if names.is_empty() {
        "no clauses".to_string()
    } else {
        format!("{} clauses", names)
    }
}

/// Trailing repeated parameter, resolved when the signature is built
#[derive(Debug, Clone)]
struct RestParam {
    param: ParamType,
    at_least_one: bool,
}

#[derive(Debug, Clone)]
pub struct Signature {
    fixed: Vec<ParamType>,
    rest: Option<RestParam>,
}

impl Signature {
    /// A rest parameter may only appear last
    pub fn new(mut params: Vec<ParamType>) -> RuntimeResult<Signature> {
        let trailing_rest = matches!(
            params.last(),
            Some(ParamType::Rest(_)) | Some(ParamType::OneOrMore(_))
        );
        let rest = if trailing_rest {
            match params.pop() {
                Some(ParamType::Rest(inner)) => Some(RestParam {
                    param: *inner,
                    at_least_one: false,
                }),
                Some(ParamType::OneOrMore(inner)) => Some(RestParam {
                    param: *inner,
                    at_least_one: true,
                }),
                _ => None,
            }
        } else {
            None
        };
        if params
            .iter()
            .any(|p| matches!(p, ParamType::Rest(_) | ParamType::OneOrMore(_)))
        {
            return Err(RuntimeError::syntax(
                "A repeated parameter can only be the last parameter of a signature.",
            ));
        }
        Ok(Signature { fixed: params, rest })
    }

    pub fn empty() -> Signature {
        Signature {
            fixed: Vec::new(),
            rest: None,
        }
    }

    /// Minimum number of values a call must supply
    pub fn required(&self) -> usize {
        self.fixed.iter().filter(|p| !p.is_optional()).count()
            + usize::from(self.rest.as_ref().map_or(false, |r| r.at_least_one))
    }

    /// Check `args` against this signature, left to right, stopping at the
    /// first problem found.
    pub fn validate(&self, macro_name: &str, args: &[Value]) -> RuntimeResult<()> {
        self.validate_as(&format!("({}:) macro", macro_name), args)
    }

    /// Like `validate`, naming the callee with `label` ("custom macro")
    pub fn validate_as(&self, label: &str, args: &[Value]) -> RuntimeResult<()> {
        for (index, param) in self.fixed.iter().enumerate() {
            match args.get(index) {
                Some(arg) => check_arg(label, index, param, arg)?,
                None if param.is_optional() => {}
                None => {
                    let missing = self.fixed[index..].iter().filter(|p| !p.is_optional()).count()
                        + usize::from(self.rest.as_ref().map_or(false, |r| r.at_least_one));
                    return Err(missing_values(label, missing));
                }
            }
        }

        let extra = args.get(self.fixed.len()..).unwrap_or(&[]);
        match &self.rest {
            Some(rest) => {
                if rest.at_least_one && extra.is_empty() {
                    return Err(missing_values(label, 1));
                }
                for (offset, arg) in extra.iter().enumerate() {
                    check_arg(label, self.fixed.len() + offset, &rest.param, arg)?;
                }
                Ok(())
            }
            None if extra.is_empty() => Ok(()),
            None => Err(RuntimeError::macrocall(format!(
                "The {} was given {} too many.",
                label,
                plural(extra.len(), "value")
            ))),
        }
    }
}

fn missing_values(label: &str, count: usize) -> RuntimeError {
    RuntimeError::macrocall(format!(
        "The {} needs {} more.",
        label,
        plural(count, "value")
    ))
}

fn check_arg(label: &str, index: usize, param: &ParamType, arg: &Value) -> RuntimeResult<()> {
    if param.accepts(arg)? {
        return Ok(());
    }
    let inner = match param {
        ParamType::Optional(inner) => inner.as_ref(),
        other => other,
    };
    match (inner, arg) {
        (ParamType::Wrapped(_, message), _) => Err(RuntimeError::datatype(message.clone())),
        (ParamType::LambdaShape(expected), Value::Lambda(lambda)) => {
            let expected: BTreeSet<ClauseName> = expected.iter().copied().collect();
            Err(RuntimeError::datatype(format!(
                "The {}'s {} value should be a lambda with {}, but it had {}.",
                label,
                nth(index + 1),
                clause_list(&expected),
                clause_list(&lambda.clause_names())
            )))
        }
        (ParamType::Either(_), Value::Lambda(lambda)) if inner.only_lambda_shapes() => {
            Err(RuntimeError::datatype(format!(
                "The {}'s {} value should be {}, but it had {}.",
                label,
                nth(index + 1),
                inner.describe(),
                clause_list(&lambda.clause_names())
            )))
        }
        _ => Err(RuntimeError::datatype(format!(
            "The {}'s {} value should be {}, but it was {}.",
            label,
            nth(index + 1),
            inner.describe(),
            describe_value(arg)
        ))),
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Datatype(datatype) => format!("the datatype {}", datatype.describe()),
        other => other.type_name().to_string(),
    }
}
