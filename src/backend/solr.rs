// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Inverted-index backend: criteria to Solr parameters and back.
//!
//! Compilation produces a [`SolrParams`] map (`q`, `fq[]`, `sort`, `fl`,
//! facet and geo parameters, `rows`/`start`); execution posts it to the
//! select handler of an injected [`SolrApi`] and materializes the raw
//! response into a [`Collection`].
//!
//! # Example
//!
//! ```
//! use search_criteria::{Criteria, SolrBackend, field};
//!
//! let criteria = Criteria::new()
//!     .search("pizza")
//!     .with(field("user_id").gte(), 10)
//!     .paginate(2, 10);
//!
//! let params = SolrBackend::to_params(&criteria);
//! assert_eq!(params.q, "(pizza)");
//! assert_eq!(params.fq, vec!["user_id:[10 TO *]"]);
//! assert_eq!(params.rows, Some(10));
//! assert_eq!(params.start, Some(10));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::SearchBackend;
use crate::client::SolrApi;
use crate::collection::{Collection, Document, Facets, Record};
use crate::config::SearchConfig;
use crate::criteria::condition::{render_scalar, render_value_flat};
use crate::criteria::{Criteria, FilterKey, FilterValue, Operator};
use crate::error::Result;
use crate::metrics;
use crate::schema::TypeRegistry;

/// The compiled wire parameters of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolrParams {
    pub q: String,
    pub fq: Vec<String>,
    pub sort: Option<String>,
    pub fl: Option<String>,
    pub facet: bool,
    pub facet_fields: Vec<String>,
    pub pt: Option<String>,
    pub d: Option<f64>,
    pub sfield: Option<String>,
    pub rows: Option<u64>,
    pub start: Option<u64>,
}

impl SolrParams {
    /// Flatten into repeated form-encoded pairs for the HTTP client.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("q".to_string(), self.q.clone())];
        for fq in &self.fq {
            pairs.push(("fq".to_string(), fq.clone()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort".to_string(), sort.clone()));
        }
        if let Some(fl) = &self.fl {
            pairs.push(("fl".to_string(), fl.clone()));
        }
        if self.facet {
            pairs.push(("facet".to_string(), "true".to_string()));
            for field in &self.facet_fields {
                pairs.push(("facet.field".to_string(), field.clone()));
            }
        }
        if let Some(pt) = &self.pt {
            pairs.push(("pt".to_string(), pt.clone()));
        }
        if let Some(d) = self.d {
            pairs.push(("d".to_string(), fmt_f64(d)));
        }
        if let Some(sfield) = &self.sfield {
            pairs.push(("sfield".to_string(), sfield.clone()));
        }
        if let Some(rows) = self.rows {
            pairs.push(("rows".to_string(), rows.to_string()));
        }
        if let Some(start) = self.start {
            pairs.push(("start".to_string(), start.to_string()));
        }
        pairs
    }
}

/// The inverted-index compiler and executor.
pub struct SolrBackend {
    api: Arc<dyn SolrApi>,
    config: SearchConfig,
    registry: TypeRegistry,
}

impl SolrBackend {
    pub fn new(api: Arc<dyn SolrApi>, config: SearchConfig, registry: TypeRegistry) -> Self {
        Self {
            api,
            config,
            registry,
        }
    }

    /// Compile accumulated criteria state into wire parameters.
    pub fn to_params(criteria: &Criteria) -> SolrParams {
        let mut params = SolrParams {
            q: "*:*".to_string(),
            ..SolrParams::default()
        };

        params.fq.extend(fq_from_with(criteria));
        for (field, values) in &criteria.filters().without {
            let key = mapped_field(criteria, field);
            params
                .fq
                .extend(values.iter().map(|v| format!("!{key}:{}", render_value_flat(v))));
        }

        if let Some(order) = &criteria.search_options().order {
            params.sort = Some(convert_search_order(criteria, order));
        }

        let search = &criteria.filters().search;
        if !search.is_empty() {
            params.q = search
                .iter()
                .map(|term| format!("({term})"))
                .collect::<Vec<_>>()
                .join(" AND ");
        }

        let options = criteria.search_options();
        if let (Some(center), Some(distance)) = (options.geo_center, options.geo_distance) {
            params.pt = Some(format!("{},{}", fmt_f64(center.lat), fmt_f64(center.lng)));
            params.d = Some(distance.outer_meters() / crate::geo::KM_TO_METER);
            params.sfield = Some(mapped_field(criteria, "location"));
            params.fq.push("{!geofilt}".to_string());
        }

        if !options.select.is_empty() {
            let mut fields = options.select.clone();
            fields.push("id".to_string());
            params.fl = Some(
                fields
                    .iter()
                    .map(|f| mapped_field(criteria, f))
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }

        for class in type_constraints(criteria) {
            params.fq.push(format!("type:{class}"));
        }

        if !options.facets.is_empty() {
            params.facet = true;
            params.facet_fields = options
                .facets
                .iter()
                .map(|f| mapped_field(criteria, f))
                .collect();
        }

        if options.pagination.is_some() {
            let rows = criteria.per_page();
            params.rows = Some(rows);
            params.start = Some((criteria.current_page() - 1) * rows);
        }

        params
    }

    /// Materialize a raw select response into a collection.
    pub fn materialize(&self, criteria: &Criteria, response: Value) -> Collection {
        let total = response["response"]["numFound"].as_u64().unwrap_or(0);
        let mut collection = Collection::new(criteria.current_page(), criteria.per_page(), total);
        collection.set_facets(hashify_facets(criteria, &response));

        let docs = response["response"]["docs"]
            .as_array()
            .map(|docs| {
                docs.iter()
                    .map(|doc| self.build_doc(criteria, doc))
                    .collect()
            })
            .unwrap_or_default();

        collection.set_original_response(response);
        collection.replace(docs);
        collection
    }

    /// Build one result document: the override hook if present, a typed
    /// record when the discriminator resolves, the raw document otherwise.
    fn build_doc(&self, criteria: &Criteria, doc: &Value) -> Document {
        if let Some(builder) = &criteria.search_options().document_builder {
            return builder(doc);
        }
        let resolved = doc
            .get("type")
            .and_then(Value::as_str)
            .and_then(|name| self.registry.resolve(name));
        match (resolved, doc.as_object()) {
            (Some(domain_type), Some(fields)) => {
                let attributes = convert_doc_attributes(criteria, fields);
                Document::Record(Record::new(domain_type, attributes))
            }
            _ => Document::Raw(doc.clone()),
        }
    }

    /// Delete every document in the index and commit.
    pub async fn truncate(&self) -> Result<Value> {
        self.api
            .post_json(
                &self.config.update_path,
                r#"{"delete":{"query":"*:*"},"commit":{}}"#,
            )
            .await
    }
}

#[async_trait]
impl SearchBackend for SolrBackend {
    async fn execute(&self, criteria: &Criteria) -> Result<Collection> {
        let params = Self::to_params(criteria);
        debug!(q = %params.q, fq = ?params.fq, "executing solr query");

        let started = Instant::now();
        let response = self
            .api
            .post(&self.config.select_path, &params.to_query_pairs())
            .await;
        metrics::record_query_latency("solr", started.elapsed());

        let response = match response {
            Ok(response) => {
                metrics::record_query("solr", "success");
                response
            }
            Err(err) => {
                metrics::record_query("solr", "error");
                warn!(error = %err, "solr query failed");
                return Err(err);
            }
        };

        let collection = self.materialize(criteria, response);
        metrics::record_result_count(collection.len());
        Ok(collection)
    }
}

/// Map a logical field through the per-query attribute mapping.
fn mapped_field(criteria: &Criteria, field: &str) -> String {
    match &criteria.search_options().attribute_mapping {
        Some(mapping) => mapping.physical_name(field),
        None => field.to_string(),
    }
}

/// Reverse-map a physical field back to its logical name.
fn reverse_field(criteria: &Criteria, physical: &str) -> String {
    match &criteria.search_options().attribute_mapping {
        Some(mapping) => mapping.logical_name(physical),
        None => physical.to_string(),
    }
}

/// Map an order string, preserving a trailing `asc`/`desc` token.
fn convert_search_order(criteria: &Criteria, order: &str) -> String {
    if let Some((field, direction)) = order.rsplit_once(' ') {
        if direction.eq_ignore_ascii_case("asc") || direction.eq_ignore_ascii_case("desc") {
            return format!("{} {direction}", mapped_field(criteria, field));
        }
    }
    mapped_field(criteria, order)
}

fn fq_from_with(criteria: &Criteria) -> Vec<String> {
    let mut fq = Vec::new();
    for (key, value) in &criteria.filters().with {
        for element in filter_elements(key, value) {
            let mapped = mapped_field(criteria, key.field_name());
            let fragment = match key {
                FilterKey::Condition(cond) => cond.solr_filter(&mapped, element),
                FilterKey::Field(_) => plain_filter(&mapped, element),
            };
            fq.push(fragment);
        }
    }
    fq
}

/// List values expand to one fragment per element, except for `in`/`nin`
/// conditions which consume the whole list at once.
fn filter_elements<'a>(key: &FilterKey, value: &'a FilterValue) -> Vec<&'a FilterValue> {
    let whole_list = matches!(
        key,
        FilterKey::Condition(cond) if matches!(cond.operator, Operator::In | Operator::Nin)
    );
    match value {
        FilterValue::List(items) if !whole_list => items.iter().collect(),
        other => vec![other],
    }
}

/// Equality rendering for plain (non-condition) filter keys.
fn plain_filter(key: &str, value: &FilterValue) -> String {
    match value {
        FilterValue::Null => format!("!{key}:[* TO *]"),
        FilterValue::Range { first, last } => {
            format!("{key}:[{} TO {}]", render_scalar(first), render_scalar(last))
        }
        other => format!("{key}:{}", render_value_flat(other)),
    }
}

/// Explicit class constraints plus the bound type, deduplicated.
fn type_constraints(criteria: &Criteria) -> Vec<String> {
    let mut classes = criteria.filters().classes.clone();
    if let Some(bound) = criteria.bound_type() {
        let name = bound.name().to_string();
        if !classes.contains(&name) {
            classes.push(name);
        }
    }
    classes
}

/// Turn facet response arrays (`[value, count, value, count, ...]`) into
/// per-field count maps keyed by logical field names.
fn hashify_facets(criteria: &Criteria, response: &Value) -> Option<Facets> {
    let fields = response.get("facet_counts")?.get("facet_fields")?.as_object()?;
    let mut facets = HashMap::new();
    for (field, values) in fields {
        let mut counts = HashMap::new();
        if let Some(pairs) = values.as_array() {
            for pair in pairs.chunks(2) {
                if let [value, count] = pair {
                    counts.insert(render_scalar(value), count.as_i64().unwrap_or(0));
                }
            }
        }
        facets.insert(reverse_field(criteria, field), counts);
    }
    Some(facets)
}

/// Rewrite a raw document into the stable attribute shape: logical field
/// names, a prefix-stripped id, and explicit nulls for missing selected
/// fields.
fn convert_doc_attributes(
    criteria: &Criteria,
    doc: &serde_json::Map<String, Value>,
) -> serde_json::Map<String, Value> {
    let mut attributes = serde_json::Map::new();
    for (key, value) in doc {
        if key == "id" {
            attributes.insert("id".to_string(), Value::String(strip_table_prefix(value)));
        } else {
            attributes.insert(reverse_field(criteria, key), value.clone());
        }
    }
    for field in select_fields(criteria) {
        attributes.entry(field).or_insert(Value::Null);
    }
    attributes
}

/// Document ids are stored as `"<table>/<id>"`; hand back the bare id.
fn strip_table_prefix(value: &Value) -> String {
    let raw = render_scalar(value);
    raw.rsplit('/').next().unwrap_or(&raw).to_string()
}

/// Fields guaranteed present on every materialized record: the explicit
/// select list, else the declared fields of the attached domain type.
fn select_fields(criteria: &Criteria) -> Vec<String> {
    let options = criteria.search_options();
    if !options.select.is_empty() {
        return options.select.clone();
    }
    options
        .named_scope_class
        .as_ref()
        .or(criteria.bound_type())
        .map(|t| t.select_fields())
        .unwrap_or_default()
}

/// Format floats the way the wire expects: integral values keep a
/// trailing `.0` (`47.0`, not `47`).
fn fmt_f64(value: f64) -> String {
    format!("{value:?}")
}
