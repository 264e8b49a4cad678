// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Field-type schema, physical field-name derivation, and domain types.
//!
//! A [`FieldMapping`] resolves logical field names to the type-suffixed
//! identifiers the index engine stores ("title" of type text becomes
//! "title_t"). A [`DomainType`] bundles a discriminator name, a source
//! table binding, a field mapping, and a registry of named search scopes;
//! it is built once at startup and shared via [`TypeRegistry`].
//!
//! # Example
//!
//! ```
//! use search_criteria::schema::{DomainType, TypeRegistry};
//!
//! let offer = DomainType::builder("Offer")
//!     .table("offers")
//!     .text("title")
//!     .int("user_id")
//!     .date("created_at")
//!     .location("location")
//!     .build();
//!
//! assert_eq!(offer.mapping().physical_name("title"), "title_t");
//! assert_eq!(offer.mapping().logical_name("user_id_i"), "user_id");
//!
//! let registry = TypeRegistry::new();
//! registry.register(offer);
//! assert!(registry.resolve("Offer").is_some());
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::criteria::Criteria;
use crate::error::EngineError;

/// Logical field types and their physical suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Stored verbatim, no suffix
    Raw,
    String,
    Text,
    Int,
    /// Sortable integer
    Sint,
    Float,
    Date,
    Boolean,
    Location,
    Double,
    StringArray,
}

impl FieldType {
    /// The physical suffix appended to field names, if any.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            FieldType::Raw => None,
            FieldType::String => Some("s"),
            FieldType::Text => Some("t"),
            FieldType::Int => Some("i"),
            FieldType::Sint => Some("si"),
            FieldType::Float => Some("f"),
            FieldType::Date => Some("dt"),
            FieldType::Boolean => Some("b"),
            FieldType::Location => Some("p"),
            FieldType::Double => Some("d"),
            FieldType::StringArray => Some("ms"),
        }
    }
}

impl FromStr for FieldType {
    type Err = EngineError;

    /// Parse a logical type name as written in external schema
    /// declarations. Unknown names are a configuration error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(FieldType::Raw),
            "string" => Ok(FieldType::String),
            "text" => Ok(FieldType::Text),
            "int" | "integer" => Ok(FieldType::Int),
            "sint" => Ok(FieldType::Sint),
            "float" => Ok(FieldType::Float),
            "date" => Ok(FieldType::Date),
            "boolean" => Ok(FieldType::Boolean),
            "location" => Ok(FieldType::Location),
            "double" => Ok(FieldType::Double),
            "string_array" => Ok(FieldType::StringArray),
            other => Err(EngineError::Configuration(format!(
                "unknown field type: {other}"
            ))),
        }
    }
}

/// Per-field schema entry.
///
/// Virtual fields are excluded from generated source queries (they are
/// computed at document-build time) but still participate in physical
/// field-name derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub virtual_field: bool,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            virtual_field: false,
        }
    }

    pub fn virtual_(field_type: FieldType) -> Self {
        Self {
            field_type,
            virtual_field: true,
        }
    }
}

/// Insertion-ordered table of field name to [`FieldSpec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMapping {
    fields: Vec<(String, FieldSpec)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, preserving first-insertion order.
    pub fn insert(&mut self, name: impl Into<String>, spec: FieldSpec) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = spec;
        } else {
            self.fields.push((name, spec));
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Logical field names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Derive the physical, type-suffixed identifier for a field.
    /// Unmapped fields pass through unchanged.
    pub fn physical_name(&self, field: &str) -> String {
        match self.get(field).and_then(|spec| spec.field_type.suffix()) {
            Some(suffix) => format!("{field}_{suffix}"),
            None => field.to_string(),
        }
    }

    /// Reverse-map a physical identifier to its logical name.
    /// Unknown identifiers pass through unchanged.
    pub fn logical_name(&self, physical: &str) -> String {
        for (name, _) in &self.fields {
            if self.physical_name(name) == physical {
                return name.clone();
            }
        }
        physical.to_string()
    }

    /// Deep-merge another mapping into this one, by field name.
    pub fn merge(&mut self, other: &FieldMapping) {
        for (name, spec) in other.iter() {
            self.insert(name, *spec);
        }
    }
}

impl FromIterator<(String, FieldSpec)> for FieldMapping {
    fn from_iter<T: IntoIterator<Item = (String, FieldSpec)>>(iter: T) -> Self {
        let mut mapping = FieldMapping::new();
        for (name, spec) in iter {
            mapping.insert(name, spec);
        }
        mapping
    }
}

/// A named-scope body: receives a fresh criteria bound to the domain type
/// plus the caller's arguments, returns the criteria to merge back.
pub type ScopeFn = Arc<dyn Fn(Criteria, &[Value]) -> Criteria + Send + Sync>;

/// A registered domain type: discriminator name, source table binding,
/// field mapping, and named search scopes.
///
/// Built once at startup via [`DomainType::builder`]; downstream
/// components consume it as plain data.
pub struct DomainType {
    name: String,
    table: Option<String>,
    mapping: FieldMapping,
    scope_names: Vec<String>,
    scopes: HashMap<String, ScopeFn>,
}

impl std::fmt::Debug for DomainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainType")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("mapping", &self.mapping)
            .field("scopes", &self.scope_names)
            .finish()
    }
}

impl DomainType {
    pub fn builder(name: impl Into<String>) -> DomainTypeBuilder {
        DomainTypeBuilder {
            name: name.into(),
            table: None,
            mapping: FieldMapping::new(),
            scope_names: Vec::new(),
            scopes: HashMap::new(),
        }
    }

    /// The type discriminator as stored in indexed documents.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Declared logical field names, used to back-fill sparse documents.
    pub fn select_fields(&self) -> Vec<String> {
        self.mapping.field_names()
    }

    /// Registered scope names, in registration order.
    pub fn scope_names(&self) -> &[String] {
        &self.scope_names
    }

    pub fn scope(&self, name: &str) -> Option<&ScopeFn> {
        self.scopes.get(name)
    }
}

/// Builder for [`DomainType`], evaluated once at startup.
pub struct DomainTypeBuilder {
    name: String,
    table: Option<String>,
    mapping: FieldMapping,
    scope_names: Vec<String>,
    scopes: HashMap<String, ScopeFn>,
}

impl DomainTypeBuilder {
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add a field with an explicit spec.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.mapping.insert(name, spec);
        self
    }

    /// Add a virtual field: derived at document-build time, never
    /// selected from the source table.
    pub fn virtual_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.mapping.insert(name, FieldSpec::virtual_(field_type));
        self
    }

    pub fn raw(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Raw))
    }

    pub fn string(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::String))
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Text))
    }

    pub fn int(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Int))
    }

    pub fn sint(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Sint))
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Float))
    }

    pub fn date(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Date))
    }

    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Boolean))
    }

    pub fn location(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Location))
    }

    pub fn double(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::Double))
    }

    pub fn string_array(self, name: impl Into<String>) -> Self {
        self.field(name, FieldSpec::new(FieldType::StringArray))
    }

    /// Register a named search scope. The body runs against a fresh
    /// criteria bound to this type and its result is merged into the
    /// invoking criteria.
    pub fn scope<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Criteria, &[Value]) -> Criteria + Send + Sync + 'static,
    {
        let name = name.into();
        if !self.scope_names.contains(&name) {
            self.scope_names.push(name.clone());
        }
        self.scopes.insert(name, Arc::new(body));
        self
    }

    pub fn build(self) -> Arc<DomainType> {
        Arc::new(DomainType {
            name: self.name,
            table: self.table,
            mapping: self.mapping,
            scope_names: self.scope_names,
            scopes: self.scopes,
        })
    }
}

/// Concurrent registry resolving type discriminators to domain types.
///
/// An explicit handle, cloneable and cheap to share; there is no
/// implicit process-global registry.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: Arc<DashMap<String, Arc<DomainType>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, domain_type: Arc<DomainType>) {
        self.types
            .insert(domain_type.name().to_string(), domain_type);
    }

    /// Resolve a discriminator value to its domain type.
    pub fn resolve(&self, name: &str) -> Option<Arc<DomainType>> {
        self.types.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixes() {
        assert_eq!(FieldType::Raw.suffix(), None);
        assert_eq!(FieldType::String.suffix(), Some("s"));
        assert_eq!(FieldType::Text.suffix(), Some("t"));
        assert_eq!(FieldType::Int.suffix(), Some("i"));
        assert_eq!(FieldType::Sint.suffix(), Some("si"));
        assert_eq!(FieldType::Float.suffix(), Some("f"));
        assert_eq!(FieldType::Date.suffix(), Some("dt"));
        assert_eq!(FieldType::Boolean.suffix(), Some("b"));
        assert_eq!(FieldType::Location.suffix(), Some("p"));
        assert_eq!(FieldType::Double.suffix(), Some("d"));
        assert_eq!(FieldType::StringArray.suffix(), Some("ms"));
    }

    #[test]
    fn test_parse_unknown_type_is_configuration_error() {
        let err = "blob".parse::<FieldType>().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_parse_integer_alias() {
        assert_eq!("integer".parse::<FieldType>().unwrap(), FieldType::Int);
    }

    #[test]
    fn test_physical_name_derivation() {
        let mut mapping = FieldMapping::new();
        mapping.insert("title", FieldSpec::new(FieldType::Text));
        mapping.insert("enabled", FieldSpec::new(FieldType::Boolean));
        mapping.insert("payload", FieldSpec::new(FieldType::Raw));

        assert_eq!(mapping.physical_name("title"), "title_t");
        assert_eq!(mapping.physical_name("enabled"), "enabled_b");
        assert_eq!(mapping.physical_name("payload"), "payload");
        // unmapped fields pass through
        assert_eq!(mapping.physical_name("other"), "other");
    }

    #[test]
    fn test_reverse_lookup() {
        let mut mapping = FieldMapping::new();
        mapping.insert("title", FieldSpec::new(FieldType::Text));
        assert_eq!(mapping.logical_name("title_t"), "title");
        assert_eq!(mapping.logical_name("unknown_x"), "unknown_x");
    }

    #[test]
    fn test_virtual_fields_participate_in_derivation() {
        let mut mapping = FieldMapping::new();
        mapping.insert("popularity", FieldSpec::virtual_(FieldType::Int));
        assert_eq!(mapping.physical_name("popularity"), "popularity_i");
        assert!(mapping.get("popularity").unwrap().virtual_field);
    }

    #[test]
    fn test_mapping_insert_preserves_order_and_replaces() {
        let mut mapping = FieldMapping::new();
        mapping.insert("a", FieldSpec::new(FieldType::Text));
        mapping.insert("b", FieldSpec::new(FieldType::Int));
        mapping.insert("a", FieldSpec::new(FieldType::String));
        assert_eq!(mapping.field_names(), vec!["a", "b"]);
        assert_eq!(mapping.get("a").unwrap().field_type, FieldType::String);
    }

    #[test]
    fn test_domain_type_builder() {
        let offer = DomainType::builder("Offer")
            .table("offers")
            .text("title")
            .int("user_id")
            .scope("recent", |c, _| c.order("created_at desc"))
            .build();

        assert_eq!(offer.name(), "Offer");
        assert_eq!(offer.table(), Some("offers"));
        assert_eq!(offer.select_fields(), vec!["title", "user_id"]);
        assert_eq!(offer.scope_names(), &["recent".to_string()]);
        assert!(offer.scope("recent").is_some());
        assert!(offer.scope("missing").is_none());
    }

    #[test]
    fn test_registry_roundtrip() {
        let registry = TypeRegistry::new();
        registry.register(DomainType::builder("Offer").build());
        assert!(registry.resolve("Offer").is_some());
        assert!(registry.resolve("User").is_none());
    }
}
