// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Collaborator interfaces: the index-engine clients and the relational
//! row source.
//!
//! The engine never owns the wire. Compilers and the indexer receive a
//! client handle at construction time and block on exactly one call per
//! operation; timeouts, pooling, and retries belong to the injected
//! implementation. [`HttpSolrClient`] is the default HTTP implementation;
//! a process-wide instance exists only behind the explicit
//! [`HttpSolrClient::shared`] factory. The `InMemory*` implementations
//! serve tests and examples with canned responses.

use std::collections::VecDeque;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::config::SearchConfig;
use crate::error::{EngineError, Result};

/// One page of Sphinx matches.
#[derive(Debug, Clone, Default)]
pub struct SphinxMatches {
    pub total_entries: u64,
    pub docs: Vec<Value>,
}

/// One page of Sphinx matches reduced to record ids.
#[derive(Debug, Clone, Default)]
pub struct SphinxIds {
    pub total_entries: u64,
    pub ids: Vec<i64>,
}

/// HTTP client for the inverted-index engine.
///
/// `post` submits form-encoded query parameters (repeated keys allowed,
/// Solr's `fq` is an array); `post_json` submits a raw JSON body to an
/// update handler. Both return the parsed JSON response.
#[async_trait]
pub trait SolrApi: Send + Sync {
    async fn post(&self, path: &str, params: &[(String, String)]) -> Result<Value>;
    async fn post_json(&self, path: &str, body: &str) -> Result<Value>;
}

/// Client for the phrase-search engine.
#[async_trait]
pub trait SphinxApi: Send + Sync {
    async fn search(
        &self,
        query: &str,
        options: &serde_json::Map<String, Value>,
    ) -> Result<SphinxMatches>;

    async fn search_for_ids(
        &self,
        query: &str,
        options: &serde_json::Map<String, Value>,
    ) -> Result<SphinxIds>;
}

/// Relational source the indexer extracts rows from.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Vec<serde_json::Map<String, Value>>>;
}

/// Default [`SolrApi`] implementation backed by `reqwest`.
#[derive(Debug)]
pub struct HttpSolrClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpSolrClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Build a client from configuration. An unset endpoint is a fatal
    /// configuration error at this point, not at startup.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let url = config
            .solr_url
            .as_deref()
            .ok_or_else(|| EngineError::Configuration("solr url not configured".into()))?;
        Ok(Self::new(url))
    }

    /// The process-wide instance, lazily created on first use and reused
    /// by every criteria and indexer afterwards. The first caller's
    /// configuration wins; construct instances directly for anything
    /// more dynamic.
    pub fn shared(config: &SearchConfig) -> Result<Arc<Self>> {
        static SHARED: OnceLock<Arc<HttpSolrClient>> = OnceLock::new();
        if let Some(existing) = SHARED.get() {
            return Ok(existing.clone());
        }
        let client = Arc::new(Self::from_config(config)?);
        Ok(SHARED.get_or_init(|| client).clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl SolrApi for HttpSolrClient {
    async fn post(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let url = self.url_for(path);
        debug!(%url, params = params.len(), "posting query");
        let response = self
            .http
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| EngineError::Client(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| EngineError::Client(e.to_string()))
    }

    async fn post_json(&self, path: &str, body: &str) -> Result<Value> {
        let url = self.url_for(path);
        debug!(%url, bytes = body.len(), "posting update");
        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| EngineError::Client(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| EngineError::Client(e.to_string()))
    }
}

/// A recorded [`SolrApi`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum SolrRequest {
    Post {
        path: String,
        params: Vec<(String, String)>,
    },
    PostJson {
        path: String,
        body: String,
    },
}

/// In-memory [`SolrApi`] with canned responses, for tests and examples.
///
/// Responses are handed out in FIFO order; when the queue runs dry every
/// call returns `{"responseHeader":{"status":0}}`.
#[derive(Default)]
pub struct InMemorySolrClient {
    requests: Mutex<Vec<SolrRequest>>,
    responses: Mutex<VecDeque<Value>>,
}

impl InMemorySolrClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: Value) {
        self.responses.lock().push_back(response);
    }

    pub fn requests(&self) -> Vec<SolrRequest> {
        self.requests.lock().clone()
    }

    fn next_response(&self) -> Value {
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| serde_json::json!({"responseHeader": {"status": 0}}))
    }
}

#[async_trait]
impl SolrApi for InMemorySolrClient {
    async fn post(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        self.requests.lock().push(SolrRequest::Post {
            path: path.to_string(),
            params: params.to_vec(),
        });
        Ok(self.next_response())
    }

    async fn post_json(&self, path: &str, body: &str) -> Result<Value> {
        self.requests.lock().push(SolrRequest::PostJson {
            path: path.to_string(),
            body: body.to_string(),
        });
        Ok(self.next_response())
    }
}

/// A recorded [`SphinxApi`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SphinxRequest {
    pub query: String,
    pub options: serde_json::Map<String, Value>,
    pub ids_only: bool,
}

/// In-memory [`SphinxApi`] with canned matches.
#[derive(Default)]
pub struct InMemorySphinxClient {
    requests: Mutex<Vec<SphinxRequest>>,
    matches: Mutex<VecDeque<SphinxMatches>>,
    ids: Mutex<VecDeque<SphinxIds>>,
}

impl InMemorySphinxClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_matches(&self, matches: SphinxMatches) {
        self.matches.lock().push_back(matches);
    }

    pub fn push_ids(&self, ids: SphinxIds) {
        self.ids.lock().push_back(ids);
    }

    pub fn requests(&self) -> Vec<SphinxRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SphinxApi for InMemorySphinxClient {
    async fn search(
        &self,
        query: &str,
        options: &serde_json::Map<String, Value>,
    ) -> Result<SphinxMatches> {
        self.requests.lock().push(SphinxRequest {
            query: query.to_string(),
            options: options.clone(),
            ids_only: false,
        });
        Ok(self.matches.lock().pop_front().unwrap_or_default())
    }

    async fn search_for_ids(
        &self,
        query: &str,
        options: &serde_json::Map<String, Value>,
    ) -> Result<SphinxIds> {
        self.requests.lock().push(SphinxRequest {
            query: query.to_string(),
            options: options.clone(),
            ids_only: true,
        });
        Ok(self.ids.lock().pop_front().unwrap_or_default())
    }
}

/// In-memory [`RowSource`] returning fixed rows for any statement.
#[derive(Default)]
pub struct InMemoryRowSource {
    rows: Vec<serde_json::Map<String, Value>>,
    queries: Mutex<Vec<String>>,
}

impl InMemoryRowSource {
    pub fn new(rows: Vec<serde_json::Map<String, Value>>) -> Self {
        Self {
            rows,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// The statements this source has been asked to run.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl RowSource for InMemoryRowSource {
    async fn query(&self, sql: &str) -> Result<Vec<serde_json::Map<String, Value>>> {
        self.queries.lock().push(sql.to_string());
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_config_requires_url() {
        let err = HttpSolrClient::from_config(&SearchConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_url_joining_strips_slashes() {
        let client = HttpSolrClient::new("http://localhost:8983/solr/");
        assert_eq!(
            client.url_for("/select"),
            "http://localhost:8983/solr/select"
        );
    }

    #[tokio::test]
    async fn test_in_memory_solr_records_requests() {
        let client = InMemorySolrClient::new();
        client.push_response(json!({"response": {"numFound": 1, "docs": []}}));

        let response = client
            .post("select", &[("q".to_string(), "*:*".to_string())])
            .await
            .unwrap();
        assert_eq!(response["response"]["numFound"], 1);

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(matches!(&requests[0], SolrRequest::Post { path, .. } if path == "select"));
    }

    #[tokio::test]
    async fn test_in_memory_solr_default_response_is_success() {
        let client = InMemorySolrClient::new();
        let response = client.post_json("update/json", "{}").await.unwrap();
        assert_eq!(response["responseHeader"]["status"], 0);
    }

    #[tokio::test]
    async fn test_in_memory_sphinx_roundtrip() {
        let client = InMemorySphinxClient::new();
        client.push_ids(SphinxIds {
            total_entries: 3,
            ids: vec![1, 2, 3],
        });

        let ids = client
            .search_for_ids("pizza", &serde_json::Map::new())
            .await
            .unwrap();
        assert_eq!(ids.total_entries, 3);
        assert!(client.requests()[0].ids_only);
    }

    #[tokio::test]
    async fn test_in_memory_row_source_records_sql() {
        let source = InMemoryRowSource::new(vec![serde_json::Map::new()]);
        let rows = source.query("SELECT id FROM offers").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(source.queries(), vec!["SELECT id FROM offers"]);
    }
}
