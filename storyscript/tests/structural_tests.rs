use pretty_assertions::assert_eq;
use proptest::prelude::*;
use storyscript::runtime::structural::{clone_value, equals, matches, to_source};
use storyscript::runtime::{Datamap, Dataset, Datatype, NamedType, Value};

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1000i32..1000).prop_map(|n| Value::Number(n as f64)),
        "[a-z]{0,6}".prop_map(Value::String),
        any::<bool>().prop_map(Value::Boolean),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 24, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::Array)
    })
}

proptest! {
    #[test]
    fn datamaps_ignore_insertion_order(
        entries in prop::collection::btree_map("[a-z]{1,4}", arb_value(), 0..8)
    ) {
        let forward: Vec<(Value, Value)> = entries
            .iter()
            .map(|(k, v)| (Value::string(k.as_str()), v.clone()))
            .collect();
        let mut backward = forward.clone();
        backward.reverse();

        let m1 = Value::Datamap(Datamap::from_pairs(forward).unwrap());
        let m2 = Value::Datamap(Datamap::from_pairs(backward).unwrap());
        prop_assert!(equals(&m1, &m2));
        prop_assert_eq!(to_source(&m1), to_source(&m2));
    }

    #[test]
    fn datasets_ignore_construction_order(values in prop::collection::vec(arb_value(), 0..10)) {
        let mut reversed = values.clone();
        reversed.reverse();
        let s1 = Value::Dataset(Dataset::from_values(values).unwrap());
        let s2 = Value::Dataset(Dataset::from_values(reversed).unwrap());
        prop_assert!(equals(&s1, &s2));
        prop_assert!(equals(&s2, &s1));
        prop_assert_eq!(to_source(&s1), to_source(&s2));
    }

    #[test]
    fn equality_is_reflexive_and_survives_cloning(value in arb_value()) {
        prop_assert!(equals(&value, &value));
        prop_assert!(equals(&value, &clone_value(&value)));
    }
}

#[test]
fn structural_datatype_matching() {
    let pattern = Value::Array(vec![
        Value::Datatype(Datatype::number()),
        Value::Datatype(Datatype::number()),
    ]);
    assert!(matches(&Value::Array(vec![2.0.into(), 3.0.into()]), &pattern).unwrap());
    assert!(!matches(&Value::Array(vec![2.0.into(), 3.0.into(), 4.0.into()]), &pattern).unwrap());

    let nested = Value::Array(vec![
        Value::Datatype(Datatype::Named(NamedType::Even)),
        Value::Array(vec![Value::Datatype(Datatype::string())]),
    ]);
    let candidate = Value::Array(vec![4.0.into(), Value::Array(vec!["x".into()])]);
    assert!(matches(&candidate, &nested).unwrap());
    // without datatypes, matching is plain equality
    assert!(!equals(&candidate, &nested));
}

#[test]
fn dataset_source_is_stable_for_any_order() {
    let orders = [[3.0, 1.0, 2.0], [1.0, 2.0, 3.0], [2.0, 3.0, 1.0]];
    let sources: Vec<String> = orders
        .iter()
        .map(|order| {
            let set = Dataset::from_values(order.iter().map(|n| Value::Number(*n))).unwrap();
            to_source(&Value::Dataset(set))
        })
        .collect();
    assert_eq!(sources, vec!["(ds:1,2,3)"; 3]);
}
