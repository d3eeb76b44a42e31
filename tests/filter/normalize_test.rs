//! Integration tests for filter normalization against the library schema.

#[path = "../common/mod.rs"]
mod common;

use relfilter::config::Settings;
use relfilter::filter::{Clause, Comparison, Filter, Normalizer, Operand, Operator};
use relfilter::schema::Reflector;
use relfilter::sql::Literal;
use relfilter::FilterError;
use serde_json::{json, Value};

fn normalize_with(settings: &Settings, reject: bool, raw: Value) -> Result<Filter, FilterError> {
    let schema = common::library();
    Normalizer::new(Reflector::new(&schema, settings))
        .reject_unknown_properties(reject)
        .normalize("Book", &raw)
}

fn normalize(raw: Value) -> Filter {
    normalize_with(&common::postgres(), false, raw).unwrap()
}

fn canonical(raw: Value) -> Value {
    serde_json::to_value(normalize(raw)).unwrap()
}

// ============================================================================
// Equality expansion and flattening
// ============================================================================

#[test]
fn test_implicit_and_explicit_equality_match() {
    assert_eq!(
        normalize(json!({ "title": "Animal Farm" })),
        normalize(json!({ "title": { "=": "Animal Farm" } }))
    );
}

#[test]
fn test_own_keys_precede_nested_and() {
    let filter = normalize(json!({
        "and": [ { "id": 1 }, { "publisherId": 2 } ],
        "title": "X",
        "mainAuthorId": 3
    }));

    let properties: Vec<&str> = filter
        .and
        .iter()
        .map(|clause| match clause {
            Clause::Leaf(cmp) => cmp.property.as_str(),
            other => panic!("unexpected clause {:?}", other),
        })
        .collect();
    assert_eq!(properties, ["title", "mainAuthorId", "id", "publisherId"]);
    assert!(filter.or.is_empty());
}

#[test]
fn test_nested_and_groups_flatten() {
    assert_eq!(
        canonical(json!({ "and": [ { "and": [ { "id": 1 }, { "and": [ { "title": "X" } ] } ] } ] })),
        json!({ "and": [ { "id": { "=": 1 } }, { "title": { "=": "X" } } ] })
    );
}

#[test]
fn test_relation_filters_recurse() {
    assert_eq!(
        canonical(json!({
            "authors": {
                "lastName": { "ilike": "orwe%" },
                "books": { "publisher": { "name": "Secker" } }
            }
        })),
        json!({
            "and": [ {
                "authors": {
                    "and": [
                        { "lastName": { "ilike": "orwe%" } },
                        { "books": { "and": [
                            { "publisher": { "and": [ { "name": { "=": "Secker" } } ] } }
                        ] } }
                    ]
                }
            } ]
        })
    );
}

#[test]
fn test_or_inside_relation() {
    assert_eq!(
        canonical(json!({ "publisher": { "or": [ { "name": "A" }, { "name": "B" } ] } })),
        json!({
            "and": [ {
                "publisher": {
                    "and": [],
                    "or": [ { "name": { "=": "A" } }, { "name": { "=": "B" } } ]
                }
            } ]
        })
    );
}

// ============================================================================
// Operands
// ============================================================================

#[test]
fn test_every_operator_is_accepted() {
    let cases = [
        ("=", json!("x"), Operator::Eq),
        ("neq", json!("x"), Operator::Neq),
        ("lt", json!(1), Operator::Lt),
        ("lte", json!(1), Operator::Lte),
        ("gt", json!(1), Operator::Gt),
        ("gte", json!(1), Operator::Gte),
        ("like", json!("x%"), Operator::Like),
        ("ilike", json!("x%"), Operator::ILike),
        ("nlike", json!("x%"), Operator::NotLike),
        ("nilike", json!("x%"), Operator::NotILike),
        ("inq", json!([1, 2]), Operator::In),
        ("nin", json!([1, 2]), Operator::NotIn),
        ("between", json!([1, 2]), Operator::Between),
    ];

    for (key, operand, expected) in cases {
        let filter = normalize(json!({ "id": { key: operand } }));
        match filter.and.as_slice() {
            [Clause::Leaf(cmp)] => assert_eq!(cmp.operator, expected, "operator key {}", key),
            other => panic!("unexpected clauses for {}: {:?}", key, other),
        }
    }
}

#[test]
fn test_between_operand_is_pair() {
    let filter = normalize(json!({ "id": { "between": [2, 5] } }));
    assert_eq!(
        filter.and,
        vec![Clause::Leaf(Comparison::new(
            "id",
            Operator::Between,
            Operand::Pair(Literal::Int(2), Literal::Int(5)),
        ))]
    );
}

#[test]
fn test_spatial_and_regex_operators_rejected() {
    for key in ["near", "regexp", "within"] {
        let err = normalize_with(&common::postgres(), false, json!({ "title": { key: "x" } }))
            .unwrap_err();
        assert!(
            matches!(err, FilterError::UnknownOperator { ref operator, .. } if operator == key),
            "{} should be unknown, got {:?}",
            key,
            err
        );
        assert_eq!(err.status_code(), 400);
    }
}

// ============================================================================
// Unknown properties
// ============================================================================

#[test]
fn test_unknown_property_rejected() {
    let err = normalize_with(&common::postgres(), true, json!({ "test": "x" })).unwrap_err();
    assert_eq!(
        err,
        FilterError::UnknownProperty {
            entity: "Book".into(),
            property: "test".into(),
            fragment: r#"{"test":"x"}"#.into(),
        }
    );
    assert_eq!(err.status_code(), 409);
}

#[test]
fn test_unknown_property_dropped_when_lenient() {
    let filter = normalize_with(&common::postgres(), false, json!({ "test": "x", "id": 1 })).unwrap();
    assert_eq!(filter.and, vec![Clause::Leaf(Comparison::eq("id", 1))]);
}

#[test]
fn test_unknown_property_rejected_at_depth() {
    let err = normalize_with(
        &common::postgres(),
        true,
        json!({ "or": [ { "authors": { "nickname": "G" } } ] }),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        FilterError::UnknownProperty { ref entity, ref property, .. }
            if entity == "Author" && property == "nickname"
    ));
}

#[test]
fn test_empty_filter() {
    assert!(normalize(json!({})).is_empty());
    assert!(normalize(Value::Null).is_empty());
}
