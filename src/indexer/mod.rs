// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bulk indexing pipeline: rows out of a relational source, documents
//! into the index engine.
//!
//! A run walks a fixed sequence: generate a `SELECT` from the declared
//! [`IndexSchema`], fetch rows through the injected [`RowSource`], map
//! each row into a type-suffixed document, then dispatch. Runs at or
//! below the direct-index threshold add one document per request and
//! commit once; larger runs stream every document into a single bulk
//! update file and submit it in one request. A failed bulk submission
//! keeps the file on disk for inspection.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use search_criteria::{
//!     HttpSolrClient, IndexSchema, SearchConfig, SolrIndexer,
//! };
//! use search_criteria::schema::DomainType;
//! # use search_criteria::client::InMemoryRowSource;
//!
//! # tokio_test::block_on(async {
//! let offer = DomainType::builder("Offer")
//!     .table("offers")
//!     .text("title")
//!     .int("user_id")
//!     .build();
//!
//! let config = SearchConfig {
//!     solr_url: Some("http://localhost:8983/solr".into()),
//!     ..Default::default()
//! };
//! let solr = HttpSolrClient::shared(&config).unwrap();
//! # let rows = Arc::new(InMemoryRowSource::new(vec![]));
//!
//! let indexer = SolrIndexer::new(config, IndexSchema::for_type(offer), rows, solr);
//! let report = indexer.run().await.unwrap();
//! println!("indexed {} documents", report.documents);
//! # });
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::client::{RowSource, SolrApi};
use crate::config::SearchConfig;
use crate::criteria::condition::render_scalar;
use crate::error::{EngineError, Result};
use crate::metrics;
use crate::schema::{DomainType, FieldMapping, FieldType};

/// Which rows an index run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdScope {
    #[default]
    All,
    Ids(Vec<i64>),
}

/// Declaration of one indexed type: field mapping, source table binding,
/// id scope, and the direct-index threshold override.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    mapping: FieldMapping,
    bound: Option<Arc<DomainType>>,
    table: Option<String>,
    ids: IdScope,
    threshold: Option<usize>,
}

impl IndexSchema {
    pub fn new(mapping: FieldMapping) -> Self {
        Self {
            mapping,
            bound: None,
            table: None,
            ids: IdScope::All,
            threshold: None,
        }
    }

    /// Seed the schema from a registered domain type: its field mapping,
    /// table binding, and discriminator.
    pub fn for_type(domain_type: Arc<DomainType>) -> Self {
        let mut schema = Self::new(domain_type.mapping().clone());
        schema.table = domain_type.table().map(str::to_string);
        schema.bound = Some(domain_type);
        schema
    }

    /// Override the source table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Scope the run to an explicit id set.
    pub fn ids(mut self, ids: Vec<i64>) -> Self {
        self.ids = IdScope::Ids(ids);
        self
    }

    /// Row count at or below which documents are added one by one.
    pub fn direct_index_threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn bound_type(&self) -> Option<&Arc<DomainType>> {
        self.bound.as_ref()
    }

    /// The resolvable source table: explicit, else the bound type's.
    pub fn source_table(&self) -> Option<&str> {
        self.table
            .as_deref()
            .or_else(|| self.bound.as_ref().and_then(|t| t.table()))
    }

    pub fn id_scope(&self) -> &IdScope {
        &self.ids
    }

    pub fn threshold(&self) -> Option<usize> {
        self.threshold
    }
}

/// How an index run pushed its documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStrategy {
    /// One add per document plus a single commit.
    Direct,
    /// One bulk update submission for the whole run.
    Batch,
}

impl IndexStrategy {
    fn as_str(self) -> &'static str {
        match self {
            IndexStrategy::Direct => "direct",
            IndexStrategy::Batch => "batch",
        }
    }
}

/// How a bulk payload travels to the update handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulkSubmit {
    /// Read the bulk file back and post it as the request body.
    #[default]
    Inline,
    /// Point a local index engine at the file via `stream.file`.
    StreamFile,
}

/// Outcome of a completed index run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub documents: usize,
    pub strategy: IndexStrategy,
}

/// Extension hook run on every extracted row before mapping.
pub type RowHook =
    Arc<dyn Fn(serde_json::Map<String, Value>) -> serde_json::Map<String, Value> + Send + Sync>;

/// Scoped bulk-update file: opened lazily on the first write, closed
/// before submission, removed only after the engine confirms success.
pub struct BulkFile {
    path: PathBuf,
    file: Option<tokio::fs::File>,
    documents: usize,
}

impl BulkFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            documents: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    /// Append one document as an `"add":{"doc":{...}}` entry. Fields with
    /// blank values are dropped from the document.
    pub async fn write(&mut self, doc: &serde_json::Map<String, Value>) -> Result<()> {
        let filtered: serde_json::Map<String, Value> = doc
            .iter()
            .filter(|(_, value)| !blank(value))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let entry = serde_json::to_string(&serde_json::json!({ "doc": filtered }))?;

        let prefix = if self.documents == 0 { "" } else { ",\n" };
        if self.file.is_none() {
            let mut file = tokio::fs::File::create(&self.path).await?;
            file.write_all(b"{\n").await?;
            self.file = Some(file);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(format!("{prefix}\"add\":{entry}").as_bytes())
                .await?;
        }
        self.documents += 1;
        Ok(())
    }

    /// Close the envelope and hand back the file path. Finalizing a file
    /// that never saw a document is an error.
    pub async fn finish(mut self) -> Result<PathBuf> {
        let mut file = self.file.take().ok_or(EngineError::NothingToIndex)?;
        file.write_all(b"}\n").await?;
        file.flush().await?;
        drop(file);
        Ok(self.path)
    }
}

/// The indexing pipeline for one declared schema.
pub struct SolrIndexer {
    config: SearchConfig,
    schema: IndexSchema,
    rows: Arc<dyn RowSource>,
    solr: Arc<dyn SolrApi>,
    row_hook: Option<RowHook>,
    submit: BulkSubmit,
}

impl SolrIndexer {
    pub fn new(
        config: SearchConfig,
        schema: IndexSchema,
        rows: Arc<dyn RowSource>,
        solr: Arc<dyn SolrApi>,
    ) -> Self {
        Self {
            config,
            schema,
            rows,
            solr,
            row_hook: None,
            submit: BulkSubmit::default(),
        }
    }

    /// Enrich every extracted row before document mapping, e.g. with
    /// computed values for virtual fields.
    pub fn row_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(serde_json::Map<String, Value>) -> serde_json::Map<String, Value>
            + Send
            + Sync
            + 'static,
    {
        self.row_hook = Some(Arc::new(hook));
        self
    }

    pub fn bulk_submit(mut self, submit: BulkSubmit) -> Self {
        self.submit = submit;
        self
    }

    /// Generate the extraction statement for the declared schema.
    ///
    /// Virtual fields never reach the statement; date fields render a
    /// null-safe timestamp cast instead of a bare alias.
    pub fn select_statement(&self) -> Result<String> {
        let table = self.source_table()?;
        let mut fields = vec!["id".to_string()];
        if let Some(bound) = self.schema.bound_type() {
            fields.push(format!("\"{}\" AS type", bound.name()));
        }
        for (name, spec) in self.schema.mapping().iter() {
            if spec.virtual_field {
                continue;
            }
            fields.push(match spec.field_type {
                FieldType::Date => format!(
                    "IF({name} IS NULL, NULL, CONCAT(REPLACE({name}, \" \", \"T\"), \"Z\")) AS {name}_dt"
                ),
                _ => match spec.field_type.suffix() {
                    Some(suffix) => format!("{name} AS {name}_{suffix}"),
                    None => name.to_string(),
                },
            });
        }

        let mut sql = format!("SELECT {} FROM {}", fields.join(", "), table);
        if let IdScope::Ids(ids) = self.schema.id_scope() {
            let ids = ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" WHERE id IN ({ids})"));
        }
        Ok(sql)
    }

    /// Rewrite one extracted row into an index document: run the row
    /// hook, prefix the id with the table name (keeping the bare value in
    /// `record_id_i`), stamp the index timestamp, append physical
    /// suffixes, and attach the type discriminator.
    pub fn map_row(&self, row: serde_json::Map<String, Value>) -> Result<serde_json::Map<String, Value>> {
        let table = self.source_table()?.to_string();
        let mut row = match &self.row_hook {
            Some(hook) => hook(row),
            None => row,
        };

        if let Some(id) = row.remove("id") {
            row.insert("record_id_i".to_string(), id.clone());
            row.insert(
                "id".to_string(),
                Value::String(format!("{table}/{}", render_scalar(&id))),
            );
        }
        row.insert(
            "indexed_at_dt".to_string(),
            Value::String(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        );

        for (name, spec) in self.schema.mapping().iter() {
            if let Some(suffix) = spec.field_type.suffix() {
                if let Some(value) = row.remove(name) {
                    row.insert(format!("{name}_{suffix}"), value);
                }
            }
        }

        if let Some(bound) = self.schema.bound_type() {
            if !row.contains_key("type") {
                row.insert("type".to_string(), Value::String(bound.name().to_string()));
            }
        }
        Ok(row)
    }

    /// Extract, map, and dispatch one full run.
    pub async fn run(&self) -> Result<IndexReport> {
        let sql = self.select_statement()?;
        debug!(%sql, "extracting rows");
        let rows = self.rows.query(&sql).await?;
        let docs = rows
            .into_iter()
            .map(|row| self.map_row(row))
            .collect::<Result<Vec<_>>>()?;
        self.index_documents(docs).await
    }

    /// Dispatch already-mapped documents by volume: direct adds at or
    /// below the threshold, one bulk submission above it.
    pub async fn index_documents(
        &self,
        docs: Vec<serde_json::Map<String, Value>>,
    ) -> Result<IndexReport> {
        let threshold = self
            .schema
            .threshold()
            .unwrap_or(self.config.direct_index_threshold);
        let strategy = if docs.len() <= threshold {
            IndexStrategy::Direct
        } else {
            IndexStrategy::Batch
        };
        info!(documents = docs.len(), strategy = strategy.as_str(), "dispatching index run");

        let outcome = match strategy {
            IndexStrategy::Direct => self.direct_index(&docs).await,
            IndexStrategy::Batch => self.batch_index(&docs).await,
        };
        match outcome {
            Ok(()) => {
                metrics::record_index_run(strategy.as_str(), "success");
                metrics::record_indexed_documents(strategy.as_str(), docs.len());
                Ok(IndexReport {
                    documents: docs.len(),
                    strategy,
                })
            }
            Err(err) => {
                metrics::record_index_run(strategy.as_str(), "error");
                error!(error = %err, "index run failed");
                Err(err)
            }
        }
    }

    async fn direct_index(&self, docs: &[serde_json::Map<String, Value>]) -> Result<()> {
        for doc in docs {
            let body = serde_json::to_string(&serde_json::json!({"add": {"doc": doc}}))?;
            self.solr.post_json(&self.config.update_path, &body).await?;
        }
        self.solr
            .post_json(&self.config.update_path, r#"{"commit":{}}"#)
            .await?;
        Ok(())
    }

    async fn batch_index(&self, docs: &[serde_json::Map<String, Value>]) -> Result<()> {
        let path = PathBuf::from(&self.config.bulk_file_dir).join(format!(
            "index_file_{}.json",
            Utc::now().timestamp_micros()
        ));
        let mut bulk = BulkFile::new(path);
        for doc in docs {
            bulk.write(doc).await?;
        }
        let path = bulk.finish().await?;
        self.submit_bulk(&path).await
    }

    /// Submit a finished bulk file and inspect the response for the
    /// success marker. The file survives a failed submission.
    pub async fn submit_bulk(&self, path: &Path) -> Result<()> {
        let response = match self.submit {
            BulkSubmit::Inline => {
                let body = tokio::fs::read_to_string(path).await?;
                self.solr
                    .post_json(&format!("{}?commit=true", self.config.update_path), &body)
                    .await?
            }
            BulkSubmit::StreamFile => {
                self.solr
                    .post(
                        &self.config.update_path,
                        &[
                            ("commit".to_string(), "true".to_string()),
                            ("stream.file".to_string(), path.display().to_string()),
                        ],
                    )
                    .await?
            }
        };

        if response["responseHeader"]["status"].as_i64() == Some(0) {
            tokio::fs::remove_file(path).await?;
            Ok(())
        } else {
            Err(EngineError::IndexingFailed {
                response: response.to_string(),
                preserved_file: Some(path.to_path_buf()),
            })
        }
    }

    fn source_table(&self) -> Result<&str> {
        self.schema
            .source_table()
            .ok_or_else(|| EngineError::Configuration("no source table to index".into()))
    }
}

/// Blank values (null, empty or whitespace-only strings) are dropped
/// from indexed documents.
fn blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
