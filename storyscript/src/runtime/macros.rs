//! Macro registry and dispatcher
//!
//! Macros are registered once under one or more names, each with a signature.
//! Dispatch propagates argument errors, expands spreads, validates the
//! arguments against the signature and only then runs the implementation.

use crate::runtime::environment::EvalContext;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::structural;
use crate::runtime::type_validator::Signature;
use crate::runtime::values::Value;
use indexmap::IndexMap;
use std::fmt;

pub type MacroFn = fn(&mut dyn EvalContext, Vec<Value>) -> RuntimeResult<Value>;

#[derive(Clone)]
pub struct MacroDefinition {
    /// Name used in messages; the first registered name
    pub name: String,
    pub signature: Signature,
    pub func: MacroFn,
}

impl fmt::Debug for MacroDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroDefinition")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// One positional argument of a macro call
#[derive(Debug, Clone)]
pub enum CallArg {
    Value(Value),
    /// `...value`: contributes each element of a string, array or dataset
    Spread(Value),
}

impl CallArg {
    fn value(&self) -> &Value {
        match self {
            CallArg::Value(value) | CallArg::Spread(value) => value,
        }
    }
}

impl From<Value> for CallArg {
    fn from(value: Value) -> Self {
        CallArg::Value(value)
    }
}

#[derive(Debug, Default)]
pub struct MacroRegistry {
    /// Normalized name -> index into `definitions`, in registration order
    names: IndexMap<String, usize>,
    definitions: Vec<MacroDefinition>,
}

/// Macro names ignore case, hyphens and underscores: `text-colour`,
/// `textColour` and `TEXT_COLOUR` are the same macro.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

lazy_static::lazy_static! {
    static ref STANDARD: MacroRegistry = {
        let mut registry = MacroRegistry::new();
        crate::runtime::stdlib::StandardLibrary::install(&mut registry);
        registry
    };
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard macro set, built on first use
    pub fn standard() -> &'static MacroRegistry {
        &STANDARD
    }

    /// Bind every name in `names` to one definition. Later registrations of
    /// the same name replace earlier ones.
    pub fn register(&mut self, names: &[&str], signature: Signature, func: MacroFn) {
        let Some(first) = names.first() else {
            return;
        };
        let index = self.definitions.len();
        self.definitions.push(MacroDefinition {
            name: first.to_string(),
            signature,
            func,
        });
        for name in names {
            self.names.insert(normalize(name), index);
        }
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.names
            .get(&normalize(name))
            .and_then(|index| self.definitions.get(*index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(&normalize(name))
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn dispatch(
        &self,
        ctx: &mut dyn EvalContext,
        name: &str,
        args: Vec<CallArg>,
    ) -> RuntimeResult<Value> {
        if let Some(err) = first_error(&args) {
            return Err(err);
        }
        let definition = self.get(name).ok_or_else(|| {
            RuntimeError::macrocall(format!(
                "I can't run the macro '{}' because it doesn't exist.",
                name
            ))
        })?;
        let values = expand_spreads(args)?;
        definition.signature.validate(&definition.name, &values)?;

        if ctx.config().log_dispatch {
            log::debug!(
                "dispatching ({}:) with {} argument(s)",
                definition.name,
                values.len()
            );
        }
        (definition.func)(ctx, values)
    }

    /// Dispatch with plain positional values
    pub fn call(&self, ctx: &mut dyn EvalContext, name: &str, args: Vec<Value>) -> RuntimeResult<Value> {
        self.dispatch(ctx, name, args.into_iter().map(CallArg::Value).collect())
    }
}

fn first_error(args: &[CallArg]) -> Option<RuntimeError> {
    args.iter()
        .find_map(|arg| structural::contains_error(std::slice::from_ref(arg.value())))
        .cloned()
}

/// Error gate plus spread expansion, shared by every kind of macro call
pub(crate) fn prepare_args(args: Vec<CallArg>) -> RuntimeResult<Vec<Value>> {
    if let Some(err) = first_error(&args) {
        return Err(err);
    }
    expand_spreads(args)
}

/// Replace each spread marker with the elements of its operand, in place.
/// Datasets spread in canonical order.
pub fn expand_spreads(args: Vec<CallArg>) -> RuntimeResult<Vec<Value>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            CallArg::Value(value) => values.push(value),
            CallArg::Spread(Value::String(s)) => {
                values.extend(s.chars().map(|c| Value::String(c.to_string())))
            }
            CallArg::Spread(Value::Array(items)) => values.extend(items),
            CallArg::Spread(Value::Dataset(set)) => values.extend(set.to_vec()),
            CallArg::Spread(other) => {
                return Err(RuntimeError::operation(format!(
                    "I can't spread out {}, because it isn't a string, dataset or array.",
                    other.type_name()
                )))
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::ErrorKind;
    use crate::runtime::values::Dataset;

    #[test]
    fn names_normalize() {
        assert_eq!(normalize("text-colour"), "textcolour");
        assert_eq!(normalize("Text_Colour"), "textcolour");
        assert_eq!(normalize("all-pass"), normalize("allPass"));
    }

    #[test]
    fn spreads_expand_in_place() {
        let set = Dataset::from_values(vec![Value::Number(3.0), Value::Number(1.0)]).unwrap();
        let values = expand_spreads(vec![
            CallArg::Value(Value::Boolean(true)),
            CallArg::Spread(Value::string("ab")),
            CallArg::Spread(Value::Dataset(set)),
            CallArg::Spread(Value::Array(vec![Value::Number(9.0)])),
        ])
        .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Boolean(true),
                Value::string("a"),
                Value::string("b"),
                Value::Number(1.0),
                Value::Number(3.0),
                Value::Number(9.0),
            ]
        );
    }

    #[test]
    fn spreading_a_number_is_an_operation_error() {
        let err = expand_spreads(vec![CallArg::Spread(Value::Number(1.0))]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Operation);
    }

    #[test]
    fn errors_are_propagated_before_spreading() {
        let original = RuntimeError::property("bad key");
        let err = prepare_args(vec![
            CallArg::Spread(Value::Number(1.0)),
            CallArg::Value(original.clone().into_value()),
        ])
        .unwrap_err();
        assert_eq!(err, original);
    }

    #[test]
    fn standard_registry_resolves_aliases() {
        let registry = MacroRegistry::standard();
        assert_eq!(registry.get("array").map(|d| d.name.as_str()), Some("a"));
        assert_eq!(registry.get("TextColor").map(|d| d.name.as_str()), Some("text-colour"));
        assert!(registry.get("nonexistent").is_none());
    }
}
