// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for criteria compilation, execution, and indexing.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// All failures surfaced by the criteria engine and the indexer.
///
/// Backend-reported errors (malformed filter syntax, timeouts) propagate
/// unmodified through [`EngineError::Client`]; the engine adds no retry
/// layer on top of the injected clients.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Fatal configuration problem: endpoint unset, unrecognized logical
    /// field type, or an indexer run with no resolvable source table.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Dynamic operation resolution fell through the whole chain
    /// (core vocabulary, sequence delegation, named-scope registry).
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// A bulk submission came back without the success marker.
    /// The raw response body is retained for diagnosis and the bulk
    /// file (if any) is left on disk.
    #[error("indexing failed: {response}")]
    IndexingFailed {
        response: String,
        preserved_file: Option<std::path::PathBuf>,
    },

    /// A batch write was finalized before any document was written.
    #[error("nothing to index")]
    NothingToIndex,

    /// Error reported by an injected external client, passed through.
    #[error("client error: {0}")]
    Client(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
