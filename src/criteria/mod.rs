// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The chainable criteria builder.
//!
//! A [`Criteria`] accumulates filters and options through chainable
//! operations, then compiles and executes through an attached backend
//! strategy. Results are memoized on first population; build a fresh
//! criteria to re-query.
//!
//! # Merge invariants
//!
//! - scalar option writes overwrite
//! - map-valued option writes deep-merge by key
//! - `select`/`facet_fields` writes append-union, first-insertion order
//! - `without` accumulates a value set per field
//!
//! # Example
//!
//! ```
//! use search_criteria::{Criteria, field};
//! use search_criteria::geo::DistanceUnit;
//!
//! let criteria = Criteria::new()
//!     .search("pizza")
//!     .with("enabled", true)
//!     .with(field("user_id").gt(), 10)
//!     .select(["id", "title"])
//!     .near((47.0, 11.0))
//!     .within(49.0.km())
//!     .paginate(2, 10);
//!
//! assert_eq!(criteria.current_page(), 2);
//! assert_eq!(criteria.per_page(), 10);
//! ```

pub mod condition;
pub mod resolve;

pub use condition::{field, Condition, FieldRef, FilterKey, FilterValue, Operator};
pub use resolve::Resolved;

use std::sync::Arc;

use serde_json::Value;

use crate::backend::SearchBackend;
use crate::collection::{Collection, Document};
use crate::error::{EngineError, Result};
use crate::geo::{CoordinateSource, Coordinates, GeoDistance};
use crate::schema::{DomainType, FieldMapping};

pub const DEFAULT_PER_PAGE: u64 = 25;
pub const FIRST_PAGE: u64 = 1;

/// Hook overriding default document construction during materialization.
pub type DocumentBuilder = Arc<dyn Fn(&Value) -> Document + Send + Sync>;

/// Requested page window. Individual keys merge independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Accumulated filter state.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    /// Explicit type constraints, insertion-ordered set
    pub classes: Vec<String>,
    /// Free-text search terms, in the order given
    pub search: Vec<String>,
    /// Field-or-condition filters, insertion-ordered, upserted by key
    pub with: Vec<(FilterKey, FilterValue)>,
    /// Per-field excluded value sets
    pub without: Vec<(String, Vec<FilterValue>)>,
    /// Raw backend-native filters, upserted by key
    pub conditions: Vec<(String, FilterValue)>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.search.is_empty()
            && self.with.is_empty()
            && self.without.is_empty()
            && self.conditions.is_empty()
    }
}

/// Accumulated option state.
#[derive(Clone, Default)]
pub struct Options {
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub group_by: Option<String>,
    /// Ordered unique field list
    pub select: Vec<String>,
    pub pagination: Option<Pagination>,
    pub geo_center: Option<Coordinates>,
    pub geo_distance: Option<GeoDistance>,
    /// Backend pass-through options, deep-merged by key
    pub custom: serde_json::Map<String, Value>,
    pub attribute_mapping: Option<FieldMapping>,
    /// Ordered unique facet field list
    pub facets: Vec<String>,
    /// Fallback schema source for select-field back-fill
    pub named_scope_class: Option<Arc<DomainType>>,
    pub document_builder: Option<DocumentBuilder>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field("group_by", &self.group_by)
            .field("select", &self.select)
            .field("pagination", &self.pagination)
            .field("geo_center", &self.geo_center)
            .field("geo_distance", &self.geo_distance)
            .field("custom", &self.custom)
            .field("attribute_mapping", &self.attribute_mapping)
            .field("facets", &self.facets)
            .field(
                "named_scope_class",
                &self.named_scope_class.as_ref().map(|t| t.name().to_string()),
            )
            .field("document_builder", &self.document_builder.is_some())
            .finish()
    }
}

/// The chainable query builder.
pub struct Criteria {
    bound: Option<Arc<DomainType>>,
    backend: Option<Arc<dyn SearchBackend>>,
    filters: Filters,
    options: Options,
    results: Option<Collection>,
}

impl Default for Criteria {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Criteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Criteria")
            .field("bound", &self.bound.as_ref().map(|t| t.name().to_string()))
            .field("filters", &self.filters)
            .field("options", &self.options)
            .field("populated", &self.results.is_some())
            .finish()
    }
}

impl Criteria {
    /// Create an empty, unbound criteria.
    pub fn new() -> Self {
        Self {
            bound: None,
            backend: None,
            filters: Filters::default(),
            options: Options::default(),
            results: None,
        }
    }

    /// Create a criteria bound to a domain type. The bound type supplies
    /// the named-scope registry and the default type constraint.
    pub fn bound(domain_type: Arc<DomainType>) -> Self {
        let mut criteria = Self::new();
        criteria.bound = Some(domain_type);
        criteria
    }

    /// Attach the backend strategy used by [`Criteria::populate`].
    pub fn with_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn bound_type(&self) -> Option<&Arc<DomainType>> {
        self.bound.as_ref()
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn search_options(&self) -> &Options {
        &self.options
    }

    // ───────────────────────────────────────────────────────────────────
    // Chainable operations
    // ───────────────────────────────────────────────────────────────────

    /// Constrain results to the given type names (append-union).
    pub fn for_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in types {
            let name = name.into();
            if !self.filters.classes.contains(&name) {
                self.filters.classes.push(name);
            }
        }
        self
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.options.order = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.options.group_by = Some(field.into());
        self
    }

    /// Append a free-text search term. Terms are joined by the backend at
    /// compile time.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.filters.search.push(term.into());
        self
    }

    /// Add a filter keyed by a plain field name or a [`Condition`].
    /// Writing the same key again overwrites its value.
    pub fn with(mut self, key: impl Into<FilterKey>, value: impl Into<FilterValue>) -> Self {
        upsert(&mut self.filters.with, key.into(), value.into());
        self
    }

    /// Exclude a value for a field. Values accumulate into a per-field
    /// set; re-adding an already excluded value is a no-op.
    pub fn without(mut self, fld: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        let fld = fld.into();
        let value = value.into();
        match self.filters.without.iter_mut().find(|(f, _)| *f == fld) {
            Some((_, values)) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            None => self.filters.without.push((fld, vec![value])),
        }
        self
    }

    /// Add a raw backend-native filter, passed through untranslated.
    pub fn conditions(mut self, fld: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        upsert_str(&mut self.filters.conditions, fld.into(), value.into());
        self
    }

    /// Restrict returned fields (append-union, first-insertion order).
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for fld in fields {
            let fld = fld.into();
            if !self.options.select.contains(&fld) {
                self.options.select.push(fld);
            }
        }
        self
    }

    /// Request facet counts for fields (append-union).
    pub fn facet_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for fld in fields {
            let fld = fld.into();
            if !self.options.facets.contains(&fld) {
                self.options.facets.push(fld);
            }
        }
        self
    }

    /// Request a page window. Keys merge independently, so
    /// `.paginate(2, None)` keeps a previously set page size.
    pub fn paginate(
        mut self,
        page: impl Into<Option<u64>>,
        per_page: impl Into<Option<u64>>,
    ) -> Self {
        let current = self.options.pagination.unwrap_or_default();
        let page = page.into().or(current.page);
        let per_page = per_page.into().or(current.per_page);
        self.options.pagination = Some(Pagination { page, per_page });
        self
    }

    /// Set the geo center. Inputs that cannot resolve both coordinates
    /// are silently ignored.
    pub fn near(mut self, source: impl CoordinateSource) -> Self {
        if let Some(center) = source.to_coordinates() {
            self.options.geo_center = Some(center);
        }
        self
    }

    /// Set the geo distance, a scalar upper bound or a meter range.
    pub fn within(mut self, distance: impl Into<GeoDistance>) -> Self {
        self.options.geo_distance = Some(distance.into());
        self
    }

    /// Merge custom backend options by key.
    pub fn options(mut self, custom: serde_json::Map<String, Value>) -> Self {
        for (key, value) in custom {
            self.options.custom.insert(key, value);
        }
        self
    }

    /// Merge a field mapping used for physical-name derivation.
    pub fn attribute_mapping(mut self, mapping: FieldMapping) -> Self {
        match self.options.attribute_mapping.as_mut() {
            Some(existing) => existing.merge(&mapping),
            None => self.options.attribute_mapping = Some(mapping),
        }
        self
    }

    /// Attach a fallback schema source for select-field back-fill.
    pub fn named_scope_class(mut self, domain_type: Arc<DomainType>) -> Self {
        self.options.named_scope_class = Some(domain_type);
        self
    }

    /// Override default document construction during materialization.
    pub fn document_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&Value) -> Document + Send + Sync + 'static,
    {
        self.options.document_builder = Some(Arc::new(builder));
        self
    }

    // ───────────────────────────────────────────────────────────────────
    // Merging
    // ───────────────────────────────────────────────────────────────────

    /// Deep-merge another criteria into this one using the same rules as
    /// the individual setters: the merged-in criteria wins per key for
    /// scalars, maps merge by key, ordered field lists union.
    pub fn merge(mut self, other: Criteria) -> Self {
        let Criteria {
            filters, options, ..
        } = other;

        self = self.for_types(filters.classes);
        for term in filters.search {
            if !self.filters.search.contains(&term) {
                self.filters.search.push(term);
            }
        }
        for (key, value) in filters.with {
            upsert(&mut self.filters.with, key, value);
        }
        for (fld, values) in filters.without {
            for value in values {
                self = self.without(fld.clone(), value);
            }
        }
        for (fld, value) in filters.conditions {
            upsert_str(&mut self.filters.conditions, fld, value);
        }

        if let Some(order) = options.order {
            self.options.order = Some(order);
        }
        if let Some(limit) = options.limit {
            self.options.limit = Some(limit);
        }
        if let Some(group_by) = options.group_by {
            self.options.group_by = Some(group_by);
        }
        self = self.select(options.select);
        if let Some(pagination) = options.pagination {
            self = self.paginate(pagination.page, pagination.per_page);
        }
        if let Some(center) = options.geo_center {
            self.options.geo_center = Some(center);
        }
        if let Some(distance) = options.geo_distance {
            self.options.geo_distance = Some(distance);
        }
        self = self.options(options.custom);
        if let Some(mapping) = options.attribute_mapping {
            self = self.attribute_mapping(mapping);
        }
        self = self.facet_fields(options.facets);
        if let Some(domain_type) = options.named_scope_class {
            self.options.named_scope_class = Some(domain_type);
        }
        if let Some(builder) = options.document_builder {
            self.options.document_builder = Some(builder);
        }
        self
    }

    // ───────────────────────────────────────────────────────────────────
    // Pagination accessors
    // ───────────────────────────────────────────────────────────────────

    /// The requested page, defaulting to the first. Zero and unset both
    /// resolve to 1.
    pub fn current_page(&self) -> u64 {
        self.pagination_attribute_when_greater_zero(|p| p.page)
            .unwrap_or(FIRST_PAGE)
    }

    /// The requested page size. Zero and unset both resolve to the
    /// default of 25.
    pub fn per_page(&self) -> u64 {
        self.pagination_attribute_when_greater_zero(|p| p.per_page)
            .unwrap_or(DEFAULT_PER_PAGE)
    }

    fn pagination_attribute_when_greater_zero<F>(&self, read: F) -> Option<u64>
    where
        F: Fn(&Pagination) -> Option<u64>,
    {
        self.options
            .pagination
            .as_ref()
            .and_then(read)
            .filter(|value| *value > 0)
    }

    // ───────────────────────────────────────────────────────────────────
    // Execution
    // ───────────────────────────────────────────────────────────────────

    /// Compile and execute through the attached backend, exactly once.
    /// Subsequent calls return the memoized collection.
    pub async fn populate(&mut self) -> Result<&Collection> {
        let collection = match self.results.take() {
            Some(existing) => existing,
            None => {
                let backend = self.backend.clone().ok_or_else(|| {
                    EngineError::Configuration("no search backend attached".into())
                })?;
                backend.execute(&*self).await?
            }
        };
        Ok(self.results.insert(collection))
    }

    /// The materialized documents, populating on first access.
    pub async fn to_a(&mut self) -> Result<&[Document]> {
        Ok(self.populate().await?.docs())
    }

    /// Number of documents on the current page.
    pub async fn count(&mut self) -> Result<usize> {
        Ok(self.populate().await?.len())
    }

    /// Total matching entries across all pages.
    pub async fn total_entries(&mut self) -> Result<u64> {
        Ok(self.populate().await?.total_entries())
    }

    /// First document on the current page.
    pub async fn first(&mut self) -> Result<Option<Document>> {
        Ok(self.populate().await?.first().cloned())
    }

    /// The memoized collection, if this criteria has been populated.
    pub fn results(&self) -> Option<&Collection> {
        self.results.as_ref()
    }
}

fn upsert(entries: &mut Vec<(FilterKey, FilterValue)>, key: FilterKey, value: FilterValue) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some((_, slot)) => *slot = value,
        None => entries.push((key, value)),
    }
}

fn upsert_str(entries: &mut Vec<(String, FilterValue)>, key: String, value: FilterValue) {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some((_, slot)) => *slot = value,
        None => entries.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::DistanceUnit;

    #[test]
    fn test_with_upserts_by_key() {
        let criteria = Criteria::new().with("a", 1).with("b", 2).with("a", 3);
        let with = &criteria.filters().with;
        assert_eq!(with.len(), 2);
        assert_eq!(with[0], (FilterKey::from("a"), FilterValue::from(3)));
        assert_eq!(with[1], (FilterKey::from("b"), FilterValue::from(2)));
    }

    #[test]
    fn test_condition_and_plain_key_coexist() {
        let criteria = Criteria::new()
            .with("age", 1)
            .with(field("age").gt(), 2);
        assert_eq!(criteria.filters().with.len(), 2);
    }

    #[test]
    fn test_without_accumulates_set() {
        let criteria = Criteria::new()
            .without("user_id", 1)
            .without("user_id", 2)
            .without("user_id", 1);
        let without = &criteria.filters().without;
        assert_eq!(without.len(), 1);
        assert_eq!(without[0].1, vec![FilterValue::from(1), FilterValue::from(2)]);
    }

    #[test]
    fn test_select_appends_union() {
        let criteria = Criteria::new()
            .select(["id", "title"])
            .select(["title", "enabled"]);
        assert_eq!(criteria.search_options().select, vec!["id", "title", "enabled"]);
    }

    #[test]
    fn test_search_appends_terms() {
        let criteria = Criteria::new().search("hamburg").search("pizza");
        assert_eq!(criteria.filters().search, vec!["hamburg", "pizza"]);
    }

    #[test]
    fn test_pagination_defaults() {
        let criteria = Criteria::new();
        assert_eq!(criteria.current_page(), 1);
        assert_eq!(criteria.per_page(), 25);
    }

    #[test]
    fn test_pagination_zero_resolves_to_defaults() {
        let criteria = Criteria::new().paginate(0, 0);
        assert_eq!(criteria.current_page(), 1);
        assert_eq!(criteria.per_page(), 25);
    }

    #[test]
    fn test_pagination_merges_per_key() {
        let criteria = Criteria::new().paginate(2, None).paginate(None, 10);
        assert_eq!(criteria.current_page(), 2);
        assert_eq!(criteria.per_page(), 10);
    }

    #[test]
    fn test_near_with_unresolvable_input_is_silent() {
        let short: Vec<f64> = vec![47.0];
        let criteria = Criteria::new().near(short.as_slice());
        assert!(criteria.search_options().geo_center.is_none());
    }

    #[test]
    fn test_near_and_within() {
        let criteria = Criteria::new().near((47.0, 11.0)).within(49.0.km());
        assert_eq!(
            criteria.search_options().geo_center,
            Some(Coordinates::new(47.0, 11.0))
        );
        assert_eq!(
            criteria.search_options().geo_distance.unwrap().meter_bounds(),
            (0.0, 49_000.0)
        );
    }

    #[test]
    fn test_merge_scalar_merged_in_wins() {
        let a = Criteria::new().order("x");
        let b = Criteria::new().order("y");
        let merged = a.merge(b);
        assert_eq!(merged.search_options().order.as_deref(), Some("y"));
    }

    #[test]
    fn test_merge_keeps_callee_scalar_when_other_unset() {
        let a = Criteria::new().order("x");
        let b = Criteria::new().limit(10);
        let merged = a.merge(b);
        assert_eq!(merged.search_options().order.as_deref(), Some("x"));
        assert_eq!(merged.search_options().limit, Some(10));
    }

    #[test]
    fn test_merge_select_union_preserves_first_seen_order() {
        let a = Criteria::new().select(["id", "title"]);
        let b = Criteria::new().select(["title", "enabled"]);
        let merged = a.merge(b);
        assert_eq!(merged.search_options().select, vec!["id", "title", "enabled"]);
    }

    #[test]
    fn test_merge_with_filters() {
        let a = Criteria::new().with("a", 1).with("c", 8);
        let b = Criteria::new().with("a", 2);
        let merged = a.merge(b);
        let with = &merged.filters().with;
        assert_eq!(with[0], (FilterKey::from("a"), FilterValue::from(2)));
        assert_eq!(with[1], (FilterKey::from("c"), FilterValue::from(8)));
    }

    #[test]
    fn test_merge_custom_options_by_key() {
        let mut map_a = serde_json::Map::new();
        map_a.insert("star".into(), Value::from(true));
        map_a.insert("weights".into(), Value::from(1));
        let mut map_b = serde_json::Map::new();
        map_b.insert("weights".into(), Value::from(2));

        let merged = Criteria::new().options(map_a).merge(Criteria::new().options(map_b));
        assert_eq!(merged.search_options().custom.get("star"), Some(&Value::from(true)));
        assert_eq!(merged.search_options().custom.get("weights"), Some(&Value::from(2)));
    }

    #[tokio::test]
    async fn test_populate_without_backend_is_configuration_error() {
        let mut criteria = Criteria::new();
        let err = criteria.populate().await.unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
