// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Materialized search results: an ordered, paginated view over result
//! documents plus facet data.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::schema::DomainType;

/// A readonly snapshot of a typed result document.
///
/// Built when a raw backend document carries a resolvable type
/// discriminator. Attributes keep a stable shape across sparse documents:
/// every selected field is present, explicitly null where the raw
/// document had no value.
#[derive(Debug, Clone)]
pub struct Record {
    domain_type: Arc<DomainType>,
    attributes: serde_json::Map<String, Value>,
}

impl Record {
    pub fn new(domain_type: Arc<DomainType>, attributes: serde_json::Map<String, Value>) -> Self {
        Self {
            domain_type,
            attributes,
        }
    }

    pub fn type_name(&self) -> &str {
        self.domain_type.name()
    }

    pub fn domain_type(&self) -> &Arc<DomainType> {
        &self.domain_type
    }

    /// The record identifier with any `"<table>/"` prefix stripped.
    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").and_then(Value::as_str)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &serde_json::Map<String, Value> {
        &self.attributes
    }

    /// Records are snapshots: never newly-created, never writable.
    pub fn readonly(&self) -> bool {
        true
    }

    pub fn new_record(&self) -> bool {
        false
    }
}

/// One materialized result document: a typed [`Record`] when the
/// discriminator resolved, the untouched raw document otherwise.
#[derive(Debug, Clone)]
pub enum Document {
    Record(Record),
    Raw(Value),
}

impl Document {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Document::Record(record) => Some(record),
            Document::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            Document::Raw(value) => Some(value),
            Document::Record(_) => None,
        }
    }

    /// Look up an attribute on either representation.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Document::Record(record) => record.attribute(name),
            Document::Raw(value) => value.get(name),
        }
    }
}

/// Facet data: field name to value-count map.
pub type Facets = HashMap<String, HashMap<String, i64>>;

/// An ordered, paginated sequence of result documents.
///
/// Created once per executed criteria; after population only the
/// document sequence may be replaced in place.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    docs: Vec<Document>,
    current_page: u64,
    per_page: u64,
    total_entries: u64,
    facets: Option<Facets>,
    original_response: Option<Value>,
}

impl Collection {
    pub fn new(current_page: u64, per_page: u64, total_entries: u64) -> Self {
        Self {
            docs: Vec::new(),
            current_page,
            per_page,
            total_entries,
            facets: None,
            original_response: None,
        }
    }

    /// Replace the document sequence in place.
    pub fn replace(&mut self, docs: Vec<Document>) {
        self.docs = docs;
    }

    pub fn set_facets(&mut self, facets: Option<Facets>) {
        self.facets = facets;
    }

    pub fn set_original_response(&mut self, response: Value) {
        self.original_response = Some(response);
    }

    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.docs.iter()
    }

    pub fn first(&self) -> Option<&Document> {
        self.docs.first()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn total_entries(&self) -> u64 {
        self.total_entries
    }

    /// Number of pages needed for all entries, never less than one.
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 1;
        }
        std::cmp::max(1, self.total_entries.div_ceil(self.per_page))
    }

    /// Offset of the first entry on the current page.
    pub fn offset(&self) -> u64 {
        self.current_page.saturating_sub(1) * self.per_page
    }

    pub fn facets(&self) -> Option<&Facets> {
        self.facets.as_ref()
    }

    /// The raw backend response, retained for debugging.
    pub fn original_response(&self) -> Option<&Value> {
        self.original_response.as_ref()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}
