// Runtime value system for storyscript
// Represents every datum an expression can produce, from scalars to composites

use crate::runtime::changer::Changer;
use crate::runtime::custom_macro::CustomMacro;
use crate::runtime::datatype::{Datatype, TypeClassifier};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::lambda::Lambda;
use crate::runtime::structural;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Array(Vec<Value>),
    Datamap(Datamap),
    Dataset(Dataset),
    Changer(Changer),
    Lambda(Rc<Lambda>),
    Datatype(Datatype),
    Colour(Colour),
    Gradient(Gradient),
    HookSet(HookSet),
    CustomMacro(Rc<CustomMacro>),
    TypedVar(TypedVar),
    Error(RuntimeError),
}

/// Behaviour every composite value kind supplies for itself
pub trait CompositeValue: Clone {
    /// Type tag, as used in user-facing messages
    const TYPE_NAME: &'static str;

    fn same_as(&self, other: &Self) -> bool;

    /// Re-parseable source text for this value
    fn to_source(&self) -> String;

    fn duplicate(&self) -> Self {
        self.clone()
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    /// User-facing name of this value's type, with its article
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "a number",
            Value::String(s) if s.is_empty() => "an empty string",
            Value::String(_) => "a string",
            Value::Boolean(_) => "a boolean",
            Value::Array(_) => "an array",
            Value::Datamap(_) => "a datamap",
            Value::Dataset(_) => "a dataset",
            Value::Changer(_) => "a changer",
            Value::Lambda(_) => "a lambda",
            Value::Datatype(_) => "a datatype",
            Value::Colour(_) => "a colour",
            Value::Gradient(_) => "a gradient",
            Value::HookSet(_) => "a hook name",
            Value::CustomMacro(_) => "a custom macro",
            Value::TypedVar(_) => "a typed variable",
            Value::Error(_) => "an error",
        }
    }

    /// Unstorable values can't be put in variables or collections
    pub fn is_unstorable(&self) -> bool {
        matches!(self, Value::Error(_) | Value::TypedVar(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Turn an error value back into an `Err`
    pub fn into_result(self) -> RuntimeResult<Value> {
        match self {
            Value::Error(err) => Err(err),
            other => Ok(other),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Values that can classify other values (datatypes and typed variables)
    pub fn as_classifier(&self) -> Option<&dyn TypeClassifier> {
        match self {
            Value::Datatype(d) => Some(d),
            Value::TypedVar(t) => Some(t),
            _ => None,
        }
    }

    /// Error returned when an unstorable value is about to be stored
    pub(crate) fn check_storable(&self, destination: &str) -> RuntimeResult<()> {
        match self {
            Value::Error(err) => Err(err.clone()),
            value if value.is_unstorable() => Err(RuntimeError::operation(format!(
                "{} can't be stored in {}.",
                capitalise(value.type_name()),
                destination
            ))),
            _ => Ok(()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        structural::equals(self, other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Error(err) => write!(f, "#<error: {}>", err.message),
            other => f.write_str(&structural::to_source(other)),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

pub(crate) fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Number formatting shared by source output and key comparison
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    n.to_string()
}

/// Key of a datamap entry. Numbers order before strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Number(OrderedFloat<f64>),
    String(String),
}

impl MapKey {
    pub fn from_value(value: &Value) -> RuntimeResult<MapKey> {
        match value {
            Value::Number(n) => Ok(MapKey::Number(OrderedFloat(*n))),
            Value::String(s) => Ok(MapKey::String(s.clone())),
            other => Err(RuntimeError::property(format!(
                "Only strings and numbers can be used as data names, not {}.",
                other.type_name()
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Number(n) => Value::Number(n.into_inner()),
            MapKey::String(s) => Value::String(s.clone()),
        }
    }

    /// The textually equivalent key of the other kind: `1` <-> `"1"`
    pub fn twin(&self) -> Option<MapKey> {
        match self {
            MapKey::Number(n) => Some(MapKey::String(format_number(n.into_inner()))),
            MapKey::String(s) => {
                let parsed = s.parse::<f64>().ok()?;
                if format_number(parsed) == *s {
                    Some(MapKey::Number(OrderedFloat(parsed)))
                } else {
                    None
                }
            }
        }
    }

    pub fn to_source(&self) -> String {
        structural::to_source(&self.to_value())
    }
}

/// Keyed mapping; iterates in canonical key order
#[derive(Debug, Clone, Default)]
pub struct Datamap {
    entries: BTreeMap<MapKey, Value>,
}

impl Datamap {
    pub fn new() -> Self {
        Datamap {
            entries: BTreeMap::new(),
        }
    }

    /// Build from alternating name/value pairs
    pub fn from_pairs<I>(pairs: I) -> RuntimeResult<Datamap>
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        let mut map = Datamap::new();
        for (key, value) in pairs {
            map.insert(MapKey::from_value(&key)?, value)?;
        }
        Ok(map)
    }

    pub fn insert(&mut self, key: MapKey, value: Value) -> RuntimeResult<Option<Value>> {
        value.check_storable("a datamap")?;
        if let Some(twin) = key.twin() {
            if self.entries.contains_key(&twin) {
                return Err(RuntimeError::property(format!(
                    "You can't use both {} and {} as data names in the same datamap.",
                    twin.to_source(),
                    key.to_source()
                )));
            }
        }
        Ok(self.entries.insert(key, value))
    }

    /// Lookup; asking for `1` when only `"1"` exists (or vice versa) is an error
    pub fn get(&self, key: &MapKey) -> RuntimeResult<Option<&Value>> {
        if let Some(value) = self.entries.get(key) {
            return Ok(Some(value));
        }
        match key.twin() {
            Some(twin) if self.entries.contains_key(&twin) => Err(RuntimeError::property(
                format!(
                    "This datamap has a data name of {}, not {}.",
                    twin.to_source(),
                    key.to_source()
                ),
            )),
            _ => Ok(None),
        }
    }

    pub fn contains_key(&self, key: &MapKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &MapKey) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &MapKey> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

/// Set of structurally unique values, kept in canonical sort order
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    items: Vec<Value>,
}

impl Dataset {
    pub fn new() -> Self {
        Dataset { items: Vec::new() }
    }

    pub fn from_values<I>(values: I) -> RuntimeResult<Dataset>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut set = Dataset::new();
        for value in values {
            set.insert(value)?;
        }
        Ok(set)
    }

    /// Returns false when an equal value was already present
    pub fn insert(&mut self, value: Value) -> RuntimeResult<bool> {
        value.check_storable("a dataset")?;
        match self
            .items
            .binary_search_by(|probe| structural::canonical_cmp(probe, &value))
        {
            Ok(_) => Ok(false),
            Err(index) => {
                self.items.insert(index, value);
                Ok(true)
            }
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.iter().any(|item| structural::equals(item, value))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Colour {
    pub fn rgb(r: u8, g: u8, b: u8) -> Colour {
        Colour { r, g, b, a: 1.0 }
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: f64) -> Colour {
        Colour { r, g, b, a }
    }
}

impl CompositeValue for Colour {
    const TYPE_NAME: &'static str = "colour";

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }

    fn to_source(&self) -> String {
        if self.a == 1.0 {
            format!("(rgb:{},{},{})", self.r, self.g, self.b)
        } else {
            format!(
                "(rgba:{},{},{},{})",
                self.r,
                self.g,
                self.b,
                format_number(self.a)
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientStop {
    pub position: f64,
    pub colour: Colour,
}

/// Linear colour gradient
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub angle: f64,
    pub stops: Vec<GradientStop>,
}

impl CompositeValue for Gradient {
    const TYPE_NAME: &'static str = "gradient";

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }

    fn to_source(&self) -> String {
        let stops = self
            .stops
            .iter()
            .map(|stop| format!("{},{}", format_number(stop.position), stop.colour.to_source()))
            .join(",");
        format!("(gradient:{},{})", format_number(self.angle), stops)
    }
}

/// Reference to one or more named hooks in the rendered document
#[derive(Debug, Clone, PartialEq)]
pub struct HookSet {
    pub names: Vec<String>,
}

impl HookSet {
    pub fn new(name: impl Into<String>) -> HookSet {
        HookSet {
            names: vec![name.into()],
        }
    }

    pub fn union(&self, other: &HookSet) -> HookSet {
        let mut names = self.names.clone();
        for name in &other.names {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        HookSet { names }
    }
}

impl CompositeValue for HookSet {
    const TYPE_NAME: &'static str = "hook name";

    fn same_as(&self, other: &Self) -> bool {
        self == other
    }

    fn to_source(&self) -> String {
        self.names.iter().map(|name| format!("?{}", name)).join("+")
    }
}

/// A variable name restricted to a datatype, e.g. `num-type _count`
#[derive(Debug, Clone)]
pub struct TypedVar {
    pub datatype: Datatype,
    pub name: String,
    /// Temp variables (`_name`) rather than story variables (`$name`)
    pub temp: bool,
}

impl TypedVar {
    pub fn temp(datatype: Datatype, name: impl Into<String>) -> TypedVar {
        TypedVar {
            datatype,
            name: name.into(),
            temp: true,
        }
    }

    pub fn sigil(&self) -> char {
        if self.temp {
            '_'
        } else {
            '$'
        }
    }
}

impl CompositeValue for TypedVar {
    const TYPE_NAME: &'static str = "typed variable";

    fn same_as(&self, other: &Self) -> bool {
        self.name == other.name
            && self.temp == other.temp
            && self.datatype.same_as(&other.datatype)
    }

    fn to_source(&self) -> String {
        format!(
            "{}-type {}{}",
            self.datatype.to_source(),
            self.sigil(),
            self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::ErrorKind;

    #[test]
    fn map_key_twins() {
        let one = MapKey::Number(OrderedFloat(1.0));
        assert_eq!(one.twin(), Some(MapKey::String("1".to_string())));
        assert_eq!(
            MapKey::String("1".to_string()).twin(),
            Some(MapKey::Number(OrderedFloat(1.0)))
        );
        assert_eq!(MapKey::String("01".to_string()).twin(), None);
        assert_eq!(MapKey::String("a".to_string()).twin(), None);
    }

    #[test]
    fn datamap_rejects_textual_twins() {
        let mut map = Datamap::new();
        map.insert(MapKey::Number(OrderedFloat(1.0)), Value::Boolean(true))
            .unwrap();
        let err = map
            .insert(MapKey::String("1".to_string()), Value::Boolean(false))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Property);

        let err = map.get(&MapKey::String("1".to_string())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Property);
        assert!(map
            .get(&MapKey::String("2".to_string()))
            .unwrap()
            .is_none());
    }

    #[test]
    fn datamap_keys_iterate_numbers_first() {
        let map = Datamap::from_pairs(vec![
            (Value::string("b"), Value::Number(1.0)),
            (Value::Number(10.0), Value::Number(2.0)),
            (Value::string("a"), Value::Number(3.0)),
            (Value::Number(2.0), Value::Number(4.0)),
        ])
        .unwrap();
        let keys: Vec<Value> = map.keys().map(MapKey::to_value).collect();
        assert_eq!(
            keys,
            vec![
                Value::Number(2.0),
                Value::Number(10.0),
                Value::string("a"),
                Value::string("b"),
            ]
        );
    }

    #[test]
    fn dataset_deduplicates_structurally() {
        let set = Dataset::from_values(vec![
            Value::Array(vec![Value::Number(1.0)]),
            Value::Number(3.0),
            Value::Array(vec![Value::Number(1.0)]),
            Value::Number(3.0),
        ])
        .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::Array(vec![Value::Number(1.0)])));
    }

    #[test]
    fn unstorable_values_are_rejected_by_collections() {
        let err_value = RuntimeError::datatype("boom").into_value();
        let mut set = Dataset::new();
        assert!(set.insert(err_value).is_err());

        let typed = Value::TypedVar(TypedVar::temp(Datatype::number(), "n"));
        let err = set.insert(typed).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Operation);
    }

    #[test]
    fn colour_source() {
        assert_eq!(Colour::rgb(255, 0, 10).to_source(), "(rgb:255,0,10)");
        assert_eq!(Colour::rgba(1, 2, 3, 0.5).to_source(), "(rgba:1,2,3,0.5)");
    }

    #[test]
    fn negative_zero_formats_as_zero() {
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(3.0), "3");
    }
}
