// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Phrase-search backend: criteria to a `(query, options)` pair.
//!
//! The phrase-search engine matches attribute filters on numeric values
//! only, so string values in `with`/`without`/`conditions` are normalized
//! through a stable 32-bit checksum before they hit the wire. Geo centers
//! travel as radians, distances as a `[lo, hi]` meter range on the
//! `@geodist` pseudo-attribute.
//!
//! # Example
//!
//! ```
//! use search_criteria::{Criteria, SphinxBackend};
//!
//! let criteria = Criteria::new().search("pizza").with("enabled", true);
//! let compiled = SphinxBackend::to_params(&criteria);
//! assert_eq!(compiled.query, "pizza");
//! assert_eq!(compiled.options["match_mode"], "boolean");
//! ```

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::SearchBackend;
use crate::client::SphinxApi;
use crate::collection::{Collection, Document};
use crate::criteria::{Criteria, FilterValue};
use crate::error::Result;
use crate::metrics;

/// The compiled `(query, options)` pair of one phrase search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SphinxQuery {
    pub query: String,
    pub options: serde_json::Map<String, Value>,
}

/// The phrase-search compiler and executor.
pub struct SphinxBackend {
    api: Arc<dyn SphinxApi>,
}

impl SphinxBackend {
    pub fn new(api: Arc<dyn SphinxApi>) -> Self {
        Self { api }
    }

    /// Compile accumulated criteria state into the wire pair.
    pub fn to_params(criteria: &Criteria) -> SphinxQuery {
        let mut options = serde_json::Map::new();
        options.insert("match_mode".to_string(), Value::from("boolean"));

        let search_options = criteria.search_options();
        if let Some(order) = &search_options.order {
            options.insert("order".to_string(), Value::from(order.clone()));
        }
        if let Some(limit) = search_options.limit {
            options.insert("limit".to_string(), Value::from(limit));
        }
        if !search_options.select.is_empty() {
            options.insert("select".to_string(), Value::from(search_options.select.clone()));
        }
        if let Some(group_by) = &search_options.group_by {
            options.insert("group_by".to_string(), Value::from(group_by.clone()));
        }
        if search_options.pagination.is_some() {
            options.insert("page".to_string(), Value::from(criteria.current_page()));
            options.insert("per_page".to_string(), Value::from(criteria.per_page()));
        }

        let classes = class_constraints(criteria);
        if !classes.is_empty() {
            options.insert("classes".to_string(), Value::from(classes));
        }

        let filters = criteria.filters();
        if !filters.conditions.is_empty() {
            let mut conditions = serde_json::Map::new();
            for (field, value) in &filters.conditions {
                conditions.insert(field.clone(), normalize_value(value));
            }
            options.insert("conditions".to_string(), Value::Object(conditions));
        }

        let mut with = serde_json::Map::new();
        for (key, value) in &filters.with {
            with.insert(key.field_name().to_string(), normalize_value(value));
        }

        if !filters.without.is_empty() {
            let mut without = serde_json::Map::new();
            for (field, values) in &filters.without {
                let normalized: Vec<Value> = values.iter().map(normalize_value).collect();
                without.insert(field.clone(), Value::Array(normalized));
            }
            options.insert("without".to_string(), Value::Object(without));
        }

        if let (Some(center), Some(distance)) =
            (search_options.geo_center, search_options.geo_distance)
        {
            options.insert(
                "geo".to_string(),
                Value::from(vec![center.lat_radians(), center.lng_radians()]),
            );
            let (from, to) = distance.meter_bounds();
            with.insert("@geodist".to_string(), Value::from(vec![from, to]));
        }

        if !with.is_empty() {
            options.insert("with".to_string(), Value::Object(with));
        }

        for (key, value) in &search_options.custom {
            options.insert(key.clone(), value.clone());
        }

        SphinxQuery {
            query: filters.search.join(" "),
            options,
        }
    }

    /// Execute and reduce to matching record ids.
    pub async fn search_for_ids(&self, criteria: &Criteria) -> Result<Vec<i64>> {
        let compiled = Self::to_params(criteria);
        let result = self
            .api
            .search_for_ids(&compiled.query, &compiled.options)
            .await?;
        Ok(result.ids)
    }

    /// Total matching entries across all pages, via the ids interface.
    pub async fn total_entries(&self, criteria: &Criteria) -> Result<u64> {
        let compiled = Self::to_params(criteria);
        let result = self
            .api
            .search_for_ids(&compiled.query, &compiled.options)
            .await?;
        Ok(result.total_entries)
    }
}

#[async_trait]
impl SearchBackend for SphinxBackend {
    async fn execute(&self, criteria: &Criteria) -> Result<Collection> {
        let compiled = Self::to_params(criteria);
        debug!(query = %compiled.query, "executing sphinx query");

        let started = Instant::now();
        let result = self.api.search(&compiled.query, &compiled.options).await;
        metrics::record_query_latency("sphinx", started.elapsed());

        let matches = match result {
            Ok(matches) => {
                metrics::record_query("sphinx", "success");
                matches
            }
            Err(err) => {
                metrics::record_query("sphinx", "error");
                warn!(error = %err, "sphinx query failed");
                return Err(err);
            }
        };

        let mut collection = Collection::new(
            criteria.current_page(),
            criteria.per_page(),
            matches.total_entries,
        );
        collection.replace(matches.docs.into_iter().map(Document::Raw).collect());
        metrics::record_result_count(collection.len());
        Ok(collection)
    }
}

/// Explicit class constraints plus the bound type, deduplicated.
fn class_constraints(criteria: &Criteria) -> Vec<String> {
    let mut classes = criteria.filters().classes.clone();
    if let Some(bound) = criteria.bound_type() {
        let name = bound.name().to_string();
        if !classes.contains(&name) {
            classes.push(name);
        }
    }
    classes
}

/// Normalize a filter value for attribute matching: strings collapse to
/// their crc32 checksum, lists and ranges normalize element-wise.
fn normalize_value(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Scalar(scalar) => normalize_scalar(scalar),
        FilterValue::List(items) => Value::Array(items.iter().map(normalize_value).collect()),
        FilterValue::Range { first, last } => {
            Value::Array(vec![normalize_scalar(first), normalize_scalar(last)])
        }
    }
}

fn normalize_scalar(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::from(crc32(s)),
        other => other.clone(),
    }
}

/// Stable IEEE checksum used to stand in for non-numeric attribute values.
pub fn crc32(input: &str) -> u32 {
    crc32fast::hash(input.as_bytes())
}
