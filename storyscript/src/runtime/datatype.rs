//! Datatypes: named predicates over the value universe.
//!
//! Primitive datatypes (`num`, `str`, `array`...) check a value's kind; derived
//! ones narrow a base kind (`even` narrows `num`, `uppercase` narrows `str`).
//! Patterns built by the pattern engine are datatypes too.

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::pattern::Pattern;
use crate::runtime::values::{CompositeValue, TypedVar, Value};
use std::sync::Arc;

/// Anything that can be asked whether a value belongs to it
pub trait TypeClassifier {
    fn classify(&self, value: &Value) -> RuntimeResult<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedType {
    Any,
    Number,
    String,
    Boolean,
    Array,
    Datamap,
    Dataset,
    Changer,
    Lambda,
    Datatype,
    Colour,
    Gradient,
    HookName,
    Macro,
    Even,
    Odd,
    Integer,
    Empty,
    Whitespace,
    Uppercase,
    Lowercase,
    Anycase,
    Alnum,
    Digit,
    Newline,
}

const ALL_NAMED: [NamedType; 25] = [
    NamedType::Any,
    NamedType::Number,
    NamedType::String,
    NamedType::Boolean,
    NamedType::Array,
    NamedType::Datamap,
    NamedType::Dataset,
    NamedType::Changer,
    NamedType::Lambda,
    NamedType::Datatype,
    NamedType::Colour,
    NamedType::Gradient,
    NamedType::HookName,
    NamedType::Macro,
    NamedType::Even,
    NamedType::Odd,
    NamedType::Integer,
    NamedType::Empty,
    NamedType::Whitespace,
    NamedType::Uppercase,
    NamedType::Lowercase,
    NamedType::Anycase,
    NamedType::Alnum,
    NamedType::Digit,
    NamedType::Newline,
];

impl NamedType {
    /// Canonical (source) name
    pub fn name(&self) -> &'static str {
        match self {
            NamedType::Any => "any",
            NamedType::Number => "num",
            NamedType::String => "str",
            NamedType::Boolean => "bool",
            NamedType::Array => "array",
            NamedType::Datamap => "dm",
            NamedType::Dataset => "ds",
            NamedType::Changer => "changer",
            NamedType::Lambda => "lambda",
            NamedType::Datatype => "datatype",
            NamedType::Colour => "colour",
            NamedType::Gradient => "gradient",
            NamedType::HookName => "hookname",
            NamedType::Macro => "macro",
            NamedType::Even => "even",
            NamedType::Odd => "odd",
            NamedType::Integer => "int",
            NamedType::Empty => "empty",
            NamedType::Whitespace => "whitespace",
            NamedType::Uppercase => "uppercase",
            NamedType::Lowercase => "lowercase",
            NamedType::Anycase => "anycase",
            NamedType::Alnum => "alnum",
            NamedType::Digit => "digit",
            NamedType::Newline => "newline",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            NamedType::Number => &["number"],
            NamedType::String => &["string"],
            NamedType::Boolean => &["boolean"],
            NamedType::Datamap => &["datamap"],
            NamedType::Dataset => &["dataset"],
            NamedType::Colour => &["color"],
            NamedType::Integer => &["integer"],
            NamedType::Alnum => &["alphanumeric"],
            _ => &[],
        }
    }

    pub fn from_name(name: &str) -> Option<NamedType> {
        ALL_NAMED
            .iter()
            .copied()
            .find(|t| t.name() == name || t.aliases().contains(&name))
    }

    /// Description with article, used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            NamedType::Any => "anything",
            NamedType::Number => "a number",
            NamedType::String => "a string",
            NamedType::Boolean => "a boolean",
            NamedType::Array => "an array",
            NamedType::Datamap => "a datamap",
            NamedType::Dataset => "a dataset",
            NamedType::Changer => "a changer",
            NamedType::Lambda => "a lambda",
            NamedType::Datatype => "a datatype",
            NamedType::Colour => "a colour",
            NamedType::Gradient => "a gradient",
            NamedType::HookName => "a hook name",
            NamedType::Macro => "a custom macro",
            NamedType::Even => "an even number",
            NamedType::Odd => "an odd number",
            NamedType::Integer => "a whole number",
            NamedType::Empty => "an empty string or data structure",
            NamedType::Whitespace => "a string of whitespace",
            NamedType::Uppercase => "a string of uppercase letters",
            NamedType::Lowercase => "a string of lowercase letters",
            NamedType::Anycase => "a string of letters with case",
            NamedType::Alnum => "a string of letters and digits",
            NamedType::Digit => "a string of digits",
            NamedType::Newline => "a line break",
        }
    }

    pub fn is_type_of(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Error(_)) => false,
            (NamedType::Any, _) => true,
            (NamedType::Number, Value::Number(_)) => true,
            (NamedType::String, Value::String(_)) => true,
            (NamedType::Boolean, Value::Boolean(_)) => true,
            (NamedType::Array, Value::Array(_)) => true,
            (NamedType::Datamap, Value::Datamap(_)) => true,
            (NamedType::Dataset, Value::Dataset(_)) => true,
            (NamedType::Changer, Value::Changer(_)) => true,
            (NamedType::Lambda, Value::Lambda(_)) => true,
            (NamedType::Datatype, Value::Datatype(_)) => true,
            (NamedType::Colour, Value::Colour(_)) => true,
            (NamedType::Gradient, Value::Gradient(_)) => true,
            (NamedType::HookName, Value::HookSet(_)) => true,
            (NamedType::Macro, Value::CustomMacro(_)) => true,
            (NamedType::Integer, Value::Number(n)) => n.is_finite() && n.fract() == 0.0,
            (NamedType::Even, Value::Number(n)) => n.fract() == 0.0 && n % 2.0 == 0.0,
            (NamedType::Odd, Value::Number(n)) => n.fract() == 0.0 && n.abs() % 2.0 == 1.0,
            (NamedType::Empty, Value::String(s)) => s.is_empty(),
            (NamedType::Empty, Value::Array(a)) => a.is_empty(),
            (NamedType::Empty, Value::Datamap(m)) => m.is_empty(),
            (NamedType::Empty, Value::Dataset(s)) => s.is_empty(),
            (NamedType::Newline, Value::String(s)) => matches!(s.as_str(), "\n" | "\r\n" | "\r"),
            (_, Value::String(s)) => match self.char_predicate() {
                Some(predicate) => !s.is_empty() && s.chars().all(predicate),
                None => false,
            },
            _ => false,
        }
    }

    fn char_predicate(&self) -> Option<fn(char) -> bool> {
        let predicate: fn(char) -> bool = match self {
            NamedType::Whitespace => char::is_whitespace,
            NamedType::Uppercase => char::is_uppercase,
            NamedType::Lowercase => char::is_lowercase,
            NamedType::Anycase => |c| c.is_uppercase() || c.is_lowercase(),
            NamedType::Alnum => char::is_alphanumeric,
            NamedType::Digit => |c| c.is_ascii_digit(),
            _ => return None,
        };
        Some(predicate)
    }

    /// Body of a regex character class matching one character of this kind
    pub(crate) fn char_class(&self) -> Option<&'static str> {
        match self {
            NamedType::Whitespace => Some(r"\s"),
            NamedType::Uppercase => Some(r"\p{Uppercase}"),
            NamedType::Lowercase => Some(r"\p{Lowercase}"),
            NamedType::Anycase => Some(r"\p{Uppercase}\p{Lowercase}"),
            NamedType::Alnum => Some(r"\p{Alphabetic}\p{N}"),
            NamedType::Digit => Some("0-9"),
            NamedType::Newline => Some(r"\r\n"),
            _ => None,
        }
    }

    /// Regex fragment used when this datatype appears inside a pattern.
    /// Character kinds match a single character there.
    pub(crate) fn pattern_fragment(&self) -> Option<String> {
        match self {
            NamedType::String => Some("(?s:.*?)".to_string()),
            NamedType::Empty => Some(String::new()),
            NamedType::Newline => Some(r"(?:\r\n|\n|\r)".to_string()),
            other => other.char_class().map(|class| format!("[{}]", class)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Datatype {
    Named(NamedType),
    Pattern(Arc<Pattern>),
}

impl Datatype {
    pub fn named(name: &str) -> Option<Datatype> {
        NamedType::from_name(name).map(Datatype::Named)
    }

    pub fn any() -> Datatype {
        Datatype::Named(NamedType::Any)
    }

    pub fn number() -> Datatype {
        Datatype::Named(NamedType::Number)
    }

    pub fn string() -> Datatype {
        Datatype::Named(NamedType::String)
    }

    pub fn boolean() -> Datatype {
        Datatype::Named(NamedType::Boolean)
    }

    pub fn is_type_of(&self, value: &Value) -> bool {
        match self {
            Datatype::Named(named) => named.is_type_of(value),
            Datatype::Pattern(pattern) => pattern.is_match(value),
        }
    }

    /// Top-level check. Patterns that are only valid nested inside other
    /// patterns refuse to be used here.
    pub fn check(&self, value: &Value) -> RuntimeResult<bool> {
        if let Datatype::Pattern(pattern) = self {
            if !pattern.usable_standalone() {
                return Err(RuntimeError::datatype(format!(
                    "The pattern {} can only be used inside another pattern, not on its own.",
                    pattern.source()
                )));
            }
        }
        Ok(self.is_type_of(value))
    }

    pub fn describe(&self) -> String {
        match self {
            Datatype::Named(named) => named.describe().to_string(),
            Datatype::Pattern(pattern) => format!("a string matching {}", pattern.source()),
        }
    }
}

impl CompositeValue for Datatype {
    const TYPE_NAME: &'static str = "datatype";

    fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Datatype::Named(a), Datatype::Named(b)) => a == b,
            (Datatype::Pattern(a), Datatype::Pattern(b)) => {
                Arc::ptr_eq(a, b) || a.source() == b.source()
            }
            _ => false,
        }
    }

    fn to_source(&self) -> String {
        match self {
            Datatype::Named(named) => named.name().to_string(),
            Datatype::Pattern(pattern) => pattern.source().to_string(),
        }
    }
}

impl TypeClassifier for Datatype {
    fn classify(&self, value: &Value) -> RuntimeResult<bool> {
        self.check(value)
    }
}

impl TypeClassifier for TypedVar {
    fn classify(&self, value: &Value) -> RuntimeResult<bool> {
        self.datatype.check(value)
    }
}
