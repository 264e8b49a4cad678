// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Property-based tests for the criteria compiler.
//!
//! Uses proptest to push random state through condition rendering,
//! merging, and compilation, and verify the invariants hold everywhere:
//! no panics, exact operator syntax, merge discipline, stable hashing.
//!
//! Run with: `cargo test --test proptest_fuzz`

use proptest::prelude::*;
use serde_json::Value;

use search_criteria::backend::sphinx::crc32;
use search_criteria::{
    field, Condition, Criteria, FieldMapping, FieldSpec, FieldType, FilterValue, Operator,
    SolrBackend,
};

// =============================================================================
// Strategies
// =============================================================================

fn field_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

fn scalar_strategy() -> impl Strategy<Value = FilterValue> {
    prop_oneof![
        any::<i64>().prop_map(FilterValue::from),
        any::<bool>().prop_map(FilterValue::from),
        "[a-zA-Z0-9_]{1,12}".prop_map(|s| FilterValue::from(s.as_str())),
    ]
}

fn filter_value_strategy() -> impl Strategy<Value = FilterValue> {
    prop_oneof![
        Just(FilterValue::Null),
        scalar_strategy(),
        prop::collection::vec(scalar_strategy(), 1..5).prop_map(FilterValue::List),
        (any::<i64>(), any::<i64>())
            .prop_map(|(a, b)| FilterValue::range(a.min(b), a.max(b))),
    ]
}

fn operator_strategy() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Not),
        Just(Operator::Gt),
        Just(Operator::Gte),
        Just(Operator::Lt),
        Just(Operator::Lte),
        Just(Operator::In),
        Just(Operator::Nin),
    ]
}

fn field_type_strategy() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::Raw),
        Just(FieldType::String),
        Just(FieldType::Text),
        Just(FieldType::Int),
        Just(FieldType::Sint),
        Just(FieldType::Float),
        Just(FieldType::Date),
        Just(FieldType::Boolean),
        Just(FieldType::Location),
        Just(FieldType::Double),
        Just(FieldType::StringArray),
    ]
}

// =============================================================================
// Condition rendering
// =============================================================================

proptest! {
    #[test]
    fn rendering_never_panics(
        name in field_name_strategy(),
        operator in operator_strategy(),
        value in filter_value_strategy(),
    ) {
        let condition = Condition::new(name.clone(), operator);
        let rendered = condition.solr_filter(&name, &value);
        prop_assert!(!rendered.is_empty());
    }

    #[test]
    fn comparison_operators_render_half_open_ranges(
        name in field_name_strategy(),
        value in any::<i64>(),
    ) {
        let v = FilterValue::from(value);
        prop_assert_eq!(
            Condition::new(name.clone(), Operator::Gt).solr_filter(&name, &v),
            format!("{name}:{{{value} TO *}}")
        );
        prop_assert_eq!(
            Condition::new(name.clone(), Operator::Gte).solr_filter(&name, &v),
            format!("{name}:[{value} TO *]")
        );
        prop_assert_eq!(
            Condition::new(name.clone(), Operator::Lt).solr_filter(&name, &v),
            format!("{name}:{{* TO {value}}}")
        );
        prop_assert_eq!(
            Condition::new(name.clone(), Operator::Lte).solr_filter(&name, &v),
            format!("{name}:[* TO {value}]")
        );
    }

    /// `nin` on a list is exactly the negation wrapper around `in`.
    #[test]
    fn nin_list_wraps_in_expansion(
        name in field_name_strategy(),
        items in prop::collection::vec(scalar_strategy(), 1..5),
    ) {
        let value = FilterValue::List(items);
        let included = Condition::new(name.clone(), Operator::In).solr_filter(&name, &value);
        let excluded = Condition::new(name.clone(), Operator::Nin).solr_filter(&name, &value);
        prop_assert_eq!(excluded, format!("!({included})"));
    }

    /// `nin` on a range deliberately has NO `!(...)` wrapper; it renders
    /// the complement as two open ranges instead. This asymmetry with the
    /// list case is the wire behavior the backend expects; do not "fix"
    /// it without changing the backend contract.
    #[test]
    fn nin_range_renders_unwrapped_complement(
        name in field_name_strategy(),
        a in any::<i64>(),
        b in any::<i64>(),
    ) {
        let (first, last) = (a.min(b), a.max(b));
        let value = FilterValue::range(first, last);
        let rendered = Condition::new(name.clone(), Operator::Nin).solr_filter(&name, &value);
        prop_assert_eq!(
            rendered.clone(),
            format!("{name}:{{* TO {first}}} OR {name}:{{{last} TO *}}")
        );
        prop_assert!(!rendered.starts_with("!("));
    }
}

// =============================================================================
// Merge discipline
// =============================================================================

proptest! {
    #[test]
    fn merged_in_scalars_win(
        first in "[a-z]{1,8}",
        second in "[a-z]{1,8}",
    ) {
        let merged = Criteria::new().order(first).merge(Criteria::new().order(second.clone()));
        prop_assert_eq!(merged.search_options().order.as_deref(), Some(second.as_str()));
    }

    #[test]
    fn select_union_is_deduplicated_in_first_seen_order(
        left in prop::collection::vec(field_name_strategy(), 0..6),
        right in prop::collection::vec(field_name_strategy(), 0..6),
    ) {
        let merged = Criteria::new()
            .select(left.clone())
            .merge(Criteria::new().select(right.clone()));
        let select = &merged.search_options().select;

        // no duplicates
        let mut seen = std::collections::HashSet::new();
        for fld in select {
            prop_assert!(seen.insert(fld.clone()));
        }
        // everything requested is present
        for fld in left.iter().chain(right.iter()) {
            prop_assert!(select.contains(fld));
        }
    }

    #[test]
    fn without_accumulates_unique_values(
        name in field_name_strategy(),
        values in prop::collection::vec(any::<i64>(), 1..10),
    ) {
        let mut criteria = Criteria::new();
        for value in &values {
            criteria = criteria.without(name.clone(), *value);
        }
        let without = &criteria.filters().without;
        prop_assert_eq!(without.len(), 1);

        let unique: std::collections::HashSet<_> = values.iter().collect();
        prop_assert_eq!(without[0].1.len(), unique.len());
    }
}

// =============================================================================
// Compilation invariants
// =============================================================================

proptest! {
    #[test]
    fn pagination_accessors_are_always_positive(
        page in prop::option::of(0u64..1000),
        per_page in prop::option::of(0u64..1000),
    ) {
        let criteria = Criteria::new().paginate(page, per_page);
        prop_assert!(criteria.current_page() >= 1);
        prop_assert!(criteria.per_page() >= 1);

        let params = SolrBackend::to_params(&criteria);
        let rows = params.rows.unwrap();
        prop_assert_eq!(params.start.unwrap(), (criteria.current_page() - 1) * rows);
    }

    #[test]
    fn unpaginated_criteria_emit_no_window(
        terms in prop::collection::vec("[a-z]{1,8}", 0..4),
    ) {
        let mut criteria = Criteria::new();
        for term in terms {
            criteria = criteria.search(term);
        }
        let params = SolrBackend::to_params(&criteria);
        prop_assert_eq!(params.rows, None);
        prop_assert_eq!(params.start, None);
        prop_assert!(!params.q.is_empty());
    }

    #[test]
    fn compilation_never_panics(
        name in field_name_strategy(),
        operator in operator_strategy(),
        value in filter_value_strategy(),
        term in "[a-z ]{0,20}",
    ) {
        let criteria = Criteria::new()
            .search(term)
            .with(Condition::new(name.clone(), operator), value.clone())
            .without(name, value);
        let params = SolrBackend::to_params(&criteria);
        prop_assert!(!params.q.is_empty());
    }
}

// =============================================================================
// Field mapping and hashing
// =============================================================================

proptest! {
    #[test]
    fn physical_logical_roundtrip(
        name in field_name_strategy(),
        field_type in field_type_strategy(),
    ) {
        let mut mapping = FieldMapping::new();
        mapping.insert(name.clone(), FieldSpec::new(field_type));
        let physical = mapping.physical_name(&name);
        prop_assert_eq!(mapping.logical_name(&physical), name);
    }

    #[test]
    fn checksum_is_stable(input in ".*") {
        prop_assert_eq!(crc32(&input), crc32(&input));
    }
}

#[test]
fn checksum_matches_known_values() {
    assert_eq!(crc32("Test"), 2018365746);
    assert_eq!(crc32("Offer"), 3893864506);
}

#[test]
fn in_condition_with_null_element_keeps_existence_filter() {
    let value = FilterValue::List(vec![
        FilterValue::from(1),
        FilterValue::from(2),
        FilterValue::Null,
    ]);
    let rendered = field("k").in_().solr_filter("k", &value);
    assert_eq!(rendered, "k:1 OR k:2 OR !k:[* TO *]");
}

#[test]
fn null_filter_values_survive_json_conversion() {
    assert_eq!(FilterValue::from(Value::Null), FilterValue::Null);
    assert!(matches!(
        FilterValue::from(serde_json::json!([1, null])),
        FilterValue::List(_)
    ));
}
