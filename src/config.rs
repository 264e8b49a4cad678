// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the criteria engine.
//!
//! # Example
//!
//! ```
//! use search_criteria::SearchConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SearchConfig::default();
//! assert_eq!(config.direct_index_threshold, 100);
//!
//! // Full config
//! let config = SearchConfig {
//!     solr_url: Some("http://localhost:8983/solr".into()),
//!     direct_index_threshold: 500,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

/// Configuration for the criteria engine and the indexing pipeline.
///
/// All fields have sensible defaults. `solr_url` must be set before a
/// query or index run reaches the default HTTP client; leaving it unset
/// surfaces as a configuration error at that point, not at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Solr base URL (e.g., "http://localhost:8983/solr")
    #[serde(default)]
    pub solr_url: Option<String>,

    /// Path of the select handler, relative to `solr_url`
    #[serde(default = "default_select_path")]
    pub select_path: String,

    /// Path of the JSON update handler, relative to `solr_url`
    #[serde(default = "default_update_path")]
    pub update_path: String,

    /// Directory for bulk index files
    #[serde(default = "default_bulk_file_dir")]
    pub bulk_file_dir: String,

    /// Row count at or below which the indexer adds documents one by one
    /// instead of writing a bulk file
    #[serde(default = "default_direct_index_threshold")]
    pub direct_index_threshold: usize,
}

fn default_select_path() -> String { "select".to_string() }
fn default_update_path() -> String { "update/json".to_string() }
fn default_bulk_file_dir() -> String { "/tmp".to_string() }
fn default_direct_index_threshold() -> usize { 100 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            solr_url: None,
            select_path: default_select_path(),
            update_path: default_update_path(),
            bulk_file_dir: default_bulk_file_dir(),
            direct_index_threshold: default_direct_index_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.solr_url, None);
        assert_eq!(config.select_path, "select");
        assert_eq!(config.update_path, "update/json");
        assert_eq!(config.bulk_file_dir, "/tmp");
        assert_eq!(config.direct_index_threshold, 100);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"solr_url": "http://solr:8983/solr"}"#).unwrap();
        assert_eq!(config.solr_url.as_deref(), Some("http://solr:8983/solr"));
        assert_eq!(config.update_path, "update/json");
    }
}
