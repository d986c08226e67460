//! Structural value operations
//!
//! Equality, pattern matching, containment, cloning and source serialization
//! over the whole value universe. Every other runtime component builds on these.
//! All functions are pure.

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::values::{format_number, CompositeValue, Value};
use itertools::Itertools;
use std::cmp::Ordering;

/// Structural equality. Datamaps and datasets compare in canonical order, so
/// construction order never matters.
pub fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| equals(l, r))
        }
        (Value::Datamap(x), Value::Datamap(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .zip(y.iter())
                    .all(|((lk, lv), (rk, rv))| lk == rk && equals(lv, rv))
        }
        (Value::Dataset(x), Value::Dataset(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(l, r)| equals(l, r))
        }
        (Value::Changer(x), Value::Changer(y)) => x.same_as(y),
        (Value::Lambda(x), Value::Lambda(y)) => x.same_as(y),
        (Value::Datatype(x), Value::Datatype(y)) => x.same_as(y),
        (Value::Colour(x), Value::Colour(y)) => x.same_as(y),
        (Value::Gradient(x), Value::Gradient(y)) => x.same_as(y),
        (Value::HookSet(x), Value::HookSet(y)) => x.same_as(y),
        (Value::CustomMacro(x), Value::CustomMacro(y)) => x.same_as(y),
        (Value::TypedVar(x), Value::TypedVar(y)) => x.same_as(y),
        (Value::Error(x), Value::Error(y)) => x == y,
        _ => false,
    }
}

/// Like `equals`, but a datatype on either side classifies the other side
/// instead of being compared by value.
pub fn matches(value: &Value, pattern: &Value) -> RuntimeResult<bool> {
    match (pattern.as_classifier(), value.as_classifier()) {
        (Some(_), Some(_)) => return Ok(equals(value, pattern)),
        (Some(classifier), None) => return classifier.classify(value),
        (None, Some(classifier)) => return classifier.classify(pattern),
        (None, None) => {}
    }
    match (value, pattern) {
        (Value::Array(x), Value::Array(y)) => all_match(x.iter(), y.iter(), x.len(), y.len()),
        (Value::Datamap(x), Value::Datamap(y)) => {
            if x.len() != y.len() || x.keys().zip(y.keys()).any(|(l, r)| l != r) {
                return Ok(false);
            }
            all_match(x.values(), y.values(), x.len(), y.len())
        }
        (Value::Dataset(x), Value::Dataset(y)) => all_match(x.iter(), y.iter(), x.len(), y.len()),
        _ => Ok(equals(value, pattern)),
    }
}

fn all_match<'a>(
    values: impl Iterator<Item = &'a Value>,
    patterns: impl Iterator<Item = &'a Value>,
    value_len: usize,
    pattern_len: usize,
) -> RuntimeResult<bool> {
    if value_len != pattern_len {
        return Ok(false);
    }
    for (value, pattern) in values.zip(patterns) {
        if !matches(value, pattern)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Containment check. Strings contain substrings, arrays and datasets contain
/// elements, datamaps contain data names.
pub fn contains(container: &Value, item: &Value) -> RuntimeResult<bool> {
    match container {
        Value::String(s) => match item {
            Value::String(needle) => Ok(s.contains(needle.as_str())),
            other => Err(RuntimeError::datatype(format!(
                "I can't check if a string contains {}, because only strings can be inside strings.",
                other.type_name()
            ))),
        },
        Value::Array(items) => Ok(items.iter().any(|element| equals(element, item))),
        Value::Dataset(set) => Ok(set.contains(item)),
        Value::Datamap(map) => Ok(map.keys().any(|key| equals(&key.to_value(), item))),
        other => Err(RuntimeError::operation(format!(
            "I can't check what's inside {}, because it isn't a string or a data structure.",
            other.type_name()
        ))),
    }
}

/// One-level copy. Composites supply their own duplicate.
pub fn clone_value(value: &Value) -> Value {
    match value {
        Value::Changer(c) => Value::Changer(c.duplicate()),
        Value::Datatype(d) => Value::Datatype(d.duplicate()),
        Value::Colour(c) => Value::Colour(c.duplicate()),
        Value::Gradient(g) => Value::Gradient(g.duplicate()),
        Value::HookSet(h) => Value::HookSet(h.duplicate()),
        Value::TypedVar(t) => Value::TypedVar(t.duplicate()),
        // Arrays, datamaps and datasets own their elements; the clone is a fresh container
        other => other.clone(),
    }
}

/// Re-parseable source text. Datamaps and datasets serialize in canonical
/// order so equal collections always produce identical text.
///
/// Errors are never persisted; callers check for them first. They serialize to
/// an `(error:)` form only so diagnostics have something to print.
pub fn to_source(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        Value::String(s) => quote(s),
        Value::Boolean(b) => b.to_string(),
        Value::Array(items) => format!("(a:{})", source_list(items.iter())),
        Value::Datamap(map) => {
            let entries = map
                .iter()
                .map(|(key, value)| format!("{},{}", key.to_source(), to_source(value)))
                .join(",");
            format!("(dm:{})", entries)
        }
        Value::Dataset(set) => format!("(ds:{})", source_list(set.iter())),
        Value::Changer(c) => c.to_source(),
        Value::Lambda(l) => l.to_source(),
        Value::Datatype(d) => d.to_source(),
        Value::Colour(c) => c.to_source(),
        Value::Gradient(g) => g.to_source(),
        Value::HookSet(h) => h.to_source(),
        Value::CustomMacro(m) => m.to_source(),
        Value::TypedVar(t) => t.to_source(),
        Value::Error(err) => format!("(error:{})", quote(&err.message)),
    }
}

pub fn source_list<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values.map(to_source).join(",")
}

fn quote(s: &str) -> String {
    // JSON string escaping is valid string literal syntax
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// First error found in `values`, scanning nested collections depth-first,
/// left to right.
pub fn contains_error(values: &[Value]) -> Option<&RuntimeError> {
    values.iter().find_map(error_in)
}

fn error_in(value: &Value) -> Option<&RuntimeError> {
    match value {
        Value::Error(err) => Some(err),
        Value::Array(items) => items.iter().find_map(error_in),
        Value::Datamap(map) => map.values().find_map(error_in),
        Value::Dataset(set) => set.iter().find_map(error_in),
        _ => None,
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Boolean(_) => 2,
        Value::Array(_) => 3,
        Value::Datamap(_) => 4,
        Value::Dataset(_) => 5,
        _ => 6,
    }
}

/// Total order used for dataset iteration and sorted serialization.
/// Returns `Equal` exactly when the values are structurally equal.
pub fn canonical_cmp(a: &Value, b: &Value) -> Ordering {
    let rank = kind_rank(a).cmp(&kind_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x == y {
                Ordering::Equal
            } else {
                x.total_cmp(y)
            }
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => sequence_cmp(x.iter(), y.iter()),
        (Value::Dataset(x), Value::Dataset(y)) => sequence_cmp(x.iter(), y.iter()),
        (Value::Datamap(x), Value::Datamap(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ordering = lk.cmp(rk).then_with(|| canonical_cmp(lv, rv));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => {
            if equals(a, b) {
                Ordering::Equal
            } else {
                a.type_name()
                    .cmp(b.type_name())
                    .then_with(|| to_source(a).cmp(&to_source(b)))
            }
        }
    }
}

fn sequence_cmp<'a>(
    mut x: impl Iterator<Item = &'a Value>,
    mut y: impl Iterator<Item = &'a Value>,
) -> Ordering {
    loop {
        match (x.next(), y.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = canonical_cmp(l, r);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::datatype::Datatype;
    use crate::runtime::error::ErrorKind;
    use crate::runtime::pattern::{Combinator, Pattern};
    use crate::runtime::values::{Datamap, Dataset};
    use std::sync::Arc;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn arrays_compare_in_order() {
        let a = Value::Array(vec![num(1.0), num(2.0)]);
        let b = Value::Array(vec![num(2.0), num(1.0)]);
        assert!(!equals(&a, &b));
        assert!(equals(&a, &a.clone()));
    }

    #[test]
    fn datamaps_ignore_insertion_order() {
        let m1 = Datamap::from_pairs(vec![
            (Value::string("a"), num(1.0)),
            (Value::string("b"), num(2.0)),
        ])
        .unwrap();
        let m2 = Datamap::from_pairs(vec![
            (Value::string("b"), num(2.0)),
            (Value::string("a"), num(1.0)),
        ])
        .unwrap();
        assert!(equals(&Value::Datamap(m1), &Value::Datamap(m2)));
    }

    #[test]
    fn structural_pattern_match() {
        let pattern = Value::Array(vec![
            Value::Datatype(Datatype::number()),
            Value::Datatype(Datatype::number()),
        ]);
        assert!(matches(&Value::Array(vec![num(2.0), num(3.0)]), &pattern).unwrap());
        assert!(!matches(&Value::Array(vec![num(2.0), num(3.0), num(4.0)]), &pattern).unwrap());
        assert!(!matches(&Value::Array(vec![num(2.0), Value::string("x")]), &pattern).unwrap());
        // either side may hold the datatype
        assert!(matches(&pattern, &Value::Array(vec![num(2.0), num(3.0)])).unwrap());
    }

    #[test]
    fn contains_rules() {
        assert!(contains(&Value::string("hello"), &Value::string("ell")).unwrap());
        let err = contains(&Value::string("hello"), &num(1.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Datatype);
        let err = contains(&num(3.0), &num(3.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Operation);

        let map = Datamap::from_pairs(vec![(Value::string("k"), num(1.0))]).unwrap();
        assert!(contains(&Value::Datamap(map.clone()), &Value::string("k")).unwrap());
        assert!(!contains(&Value::Datamap(map), &num(1.0)).unwrap());
    }

    #[test]
    fn contains_scans_arrays_and_datasets_structurally() {
        let pair = Value::Array(vec![num(1.0), num(2.0)]);
        let array = Value::Array(vec![num(0.0), pair.clone()]);
        assert!(contains(&array, &Value::Array(vec![num(1.0), num(2.0)])).unwrap());
        assert!(!contains(&array, &Value::Array(vec![num(2.0), num(1.0)])).unwrap());
        assert!(!contains(&array, &num(1.0)).unwrap());

        let set = Value::Dataset(Dataset::from_values(vec![pair, Value::string("x")]).unwrap());
        assert!(contains(&set, &Value::Array(vec![num(1.0), num(2.0)])).unwrap());
        assert!(contains(&set, &Value::string("x")).unwrap());
        assert!(!contains(&set, &num(2.0)).unwrap());
    }

    #[test]
    fn classification_errors_propagate_from_matches() {
        let optional = Pattern::build(Combinator::Optional, &[Value::string("a")], 1 << 20).unwrap();
        let pattern = Value::Array(vec![Value::Datatype(Datatype::Pattern(Arc::new(optional)))]);
        let err = matches(&Value::Array(vec![Value::string("a")]), &pattern).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Datatype);
    }

    #[test]
    fn dataset_source_is_canonical() {
        let a = Dataset::from_values(vec![num(3.0), num(1.0), num(2.0)]).unwrap();
        let b = Dataset::from_values(vec![num(2.0), num(3.0), num(1.0)]).unwrap();
        assert_eq!(to_source(&Value::Dataset(a)), "(ds:1,2,3)");
        assert_eq!(to_source(&Value::Dataset(b)), "(ds:1,2,3)");
    }

    #[test]
    fn datamap_and_string_source() {
        let map = Datamap::from_pairs(vec![
            (Value::string("b"), Value::string("say \"hi\"")),
            (Value::string("a"), Value::Boolean(true)),
        ])
        .unwrap();
        assert_eq!(
            to_source(&Value::Datamap(map)),
            r#"(dm:"a",true,"b","say \"hi\"")"#
        );
    }

    #[test]
    fn contains_error_scans_depth_first() {
        let first = RuntimeError::syntax("first");
        let second = RuntimeError::syntax("second");
        let values = vec![
            num(1.0),
            Value::Array(vec![num(2.0), Value::Array(vec![first.clone().into_value()])]),
            second.into_value(),
        ];
        assert_eq!(contains_error(&values), Some(&first));
        assert_eq!(contains_error(&[num(1.0)]), None);
    }

    #[test]
    fn canonical_order_ranks_kinds() {
        let mut values = vec![
            Value::Boolean(false),
            Value::string("a"),
            num(10.0),
            Value::Array(vec![]),
            num(-1.0),
        ];
        values.sort_by(canonical_cmp);
        assert_eq!(
            values,
            vec![
                num(-1.0),
                num(10.0),
                Value::string("a"),
                Value::Boolean(false),
                Value::Array(vec![]),
            ]
        );
    }
}
