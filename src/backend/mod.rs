// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backend compiler strategies.
//!
//! A backend consumes a populated [`Criteria`](crate::Criteria), compiles
//! it into its own wire format, executes it against an injected client,
//! and materializes the raw response into a
//! [`Collection`](crate::Collection). Two dialects ship with the crate:
//!
//! - [`SolrBackend`]: the inverted-index dialect (`fq` filter arrays,
//!   range syntax, geofilt)
//! - [`SphinxBackend`]: the phrase-search dialect (`(query, options)`
//!   pairs with crc32-hashed attribute filters)

pub mod solr;
pub mod sphinx;

pub use solr::{SolrBackend, SolrParams};
pub use sphinx::{SphinxBackend, SphinxQuery};

use async_trait::async_trait;

use crate::collection::Collection;
use crate::criteria::Criteria;
use crate::error::Result;

/// A pluggable search backend: compile, execute, materialize.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn execute(&self, criteria: &Criteria) -> Result<Collection>;
}
