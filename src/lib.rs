// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Search Criteria
//!
//! A backend-agnostic search criteria compiler with a bulk indexing
//! pipeline.
//!
//! ## Architecture
//!
//! Application code chains declarative operations onto a [`Criteria`];
//! a pluggable backend compiles the accumulated state into its wire
//! format, executes it, and materializes the response:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Application                           │
//! │  criteria.search("pizza").with(...).paginate(2, 10)         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Criteria (builder state)                   │
//! │  • filters: classes, search, with, without, conditions      │
//! │  • options: order, select, pagination, geo, facets, ...     │
//! │  • named-scope resolution, merge, memoized population       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌─────────────────────────┐    ┌─────────────────────────────┐
//! │     SolrBackend         │    │       SphinxBackend         │
//! │  q / fq[] / sort / fl   │    │  (query, options) pair      │
//! │  facets, geofilt,       │    │  crc32 attribute hashing,   │
//! │  rows/start             │    │  radian geo, @geodist       │
//! └─────────────────────────┘    └─────────────────────────────┘
//!              │                               │
//!              ▼                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Injected clients (SolrApi, SphinxApi)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │        Collection: docs + pagination + facet counts         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The companion [`SolrIndexer`] pipeline runs the other direction:
//! declared schema → generated `SELECT` → row fetch → document mapping →
//! direct or batched submission to the index engine.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use search_criteria::{
//!     Criteria, HttpSolrClient, SearchConfig, SolrBackend, field,
//! };
//! use search_criteria::geo::DistanceUnit;
//! use search_criteria::schema::{DomainType, TypeRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SearchConfig {
//!         solr_url: Some("http://localhost:8983/solr".into()),
//!         ..Default::default()
//!     };
//!
//!     // Declare domain types once at startup
//!     let offer = DomainType::builder("Offer")
//!         .table("offers")
//!         .text("title")
//!         .int("user_id")
//!         .location("location")
//!         .scope("recent", |c, _| c.order("created_at desc"))
//!         .build();
//!     let registry = TypeRegistry::new();
//!     registry.register(offer.clone());
//!
//!     let solr = HttpSolrClient::shared(&config).expect("solr url configured");
//!     let backend = Arc::new(SolrBackend::new(solr, config, registry));
//!
//!     let mut criteria = Criteria::bound(offer)
//!         .with_backend(backend)
//!         .search("pizza")
//!         .with(field("user_id").gte(), 10)
//!         .near((53.5748, 10.0347))
//!         .within(10.0.km())
//!         .paginate(1, 25);
//!
//!     let results = criteria.populate().await.expect("query failed");
//!     println!("{} of {} entries", results.len(), results.total_entries());
//! }
//! ```
//!
//! ## Features
//!
//! - **Chainable criteria**: filters and options accumulate through a
//!   uniform merge discipline (scalars overwrite, maps merge by key,
//!   field lists union)
//! - **Condition algebra**: operator-bearing field references with exact
//!   inverted-index range syntax
//! - **Two backend dialects**: inverted-index (Solr) and phrase-search
//!   (Sphinx), interchangeable behind one strategy trait
//! - **Typed materialization**: discriminator-driven record construction
//!   with stable attribute shapes across sparse documents
//! - **Named scopes**: reusable criteria fragments registered per domain
//!   type, resolved through a fixed fallback chain
//! - **Bulk indexing**: schema-driven SQL extraction, type-suffixed
//!   document mapping, and threshold-based direct/batch dispatch
//!
//! ## Modules
//!
//! - [`criteria`]: the [`Criteria`] builder, [`Condition`] algebra, and
//!   dynamic operation resolution
//! - [`backend`]: the [`SolrBackend`] and [`SphinxBackend`] compilers
//! - [`collection`]: materialized results and pagination metadata
//! - [`schema`]: field types, mappings, domain types, named scopes
//! - [`indexer`]: the bulk indexing pipeline
//! - [`client`]: collaborator traits and the default HTTP client
//! - [`geo`]: coordinates, distances, unit conversion

pub mod backend;
pub mod client;
pub mod collection;
pub mod config;
pub mod criteria;
pub mod error;
pub mod geo;
pub mod indexer;
pub mod metrics;
pub mod schema;

pub use backend::{SearchBackend, SolrBackend, SolrParams, SphinxBackend, SphinxQuery};
pub use client::{
    HttpSolrClient, InMemoryRowSource, InMemorySolrClient, InMemorySphinxClient, RowSource,
    SolrApi, SphinxApi, SphinxIds, SphinxMatches,
};
pub use collection::{Collection, Document, Facets, Record};
pub use config::SearchConfig;
pub use criteria::{field, Condition, Criteria, FieldRef, FilterKey, FilterValue, Operator, Resolved};
pub use error::{EngineError, Result};
pub use geo::{CoordinateSource, Coordinates, Distance, DistanceRange, DistanceUnit, GeoDistance};
pub use indexer::{
    BulkFile, BulkSubmit, IdScope, IndexReport, IndexSchema, IndexStrategy, SolrIndexer,
};
pub use schema::{DomainType, FieldMapping, FieldSpec, FieldType, TypeRegistry};
