//! External capability boundaries
//!
//! The memory subsystem consumes four pluggable capabilities: text
//! embedding, a persistent vector index, fact extraction, and
//! summarization. Each is an object-safe async trait; implementations are
//! injected at service construction. Failures cross these boundaries as
//! `Error` values — there are no automatic retries.

pub mod filter;
pub mod memory_index;
#[cfg(test)]
pub(crate) mod stub;

pub use filter::MetadataFilter;
pub use memory_index::InMemoryVectorIndex;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Embedding mode: the same text may legitimately embed differently when
/// stored as a document versus used as a search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    /// Optimized for document storage
    Document,
    /// Optimized for query search
    Query,
}

/// Text embedding capability
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text` into a fixed-length vector. Failures are hard errors:
    /// no embedding means no storage or retrieval for that call.
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>>;

    /// The fixed vector dimension this provider produces
    fn dimension(&self) -> usize;
}

/// A vector record for upsert
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Deterministic record id
    pub id: String,
    /// Embedding vector
    pub values: Vec<f32>,
    /// Metadata stored alongside the vector
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A ranked match returned from a similarity query
#[derive(Debug, Clone)]
pub struct VectorMatch {
    /// Record id
    pub id: String,
    /// Similarity score
    pub score: f32,
    /// Stored metadata (empty when not requested)
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Index statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of vectors in the index
    pub total_count: usize,
}

/// Persistent vector index capability
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records by id
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Similarity query, optionally restricted by a metadata filter
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>>;

    /// Delete records by id
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Describe index statistics
    async fn describe_stats(&self) -> Result<IndexStats>;
}

/// A normalized fact extracted from a user turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFact {
    /// Fact type, e.g. `user_name`, `user_location`
    pub fact_type: String,
    /// Extracted value
    pub value: String,
    /// Category label (personal/work/hobby/health/relationships/goals)
    pub category: String,
}

impl ExtractedFact {
    /// Canonical `type:value` form stored as memory content
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.fact_type, self.value)
    }
}

/// Fact-extraction oracle
///
/// Must tolerate free-form natural language in any human language, and
/// return nothing rather than inventing information not present in the
/// text.
#[async_trait]
pub trait FactExtractor: Send + Sync {
    /// Extract zero or more normalized facts from a user turn
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedFact>>;
}

/// One user/assistant exchange reconstructed from the recency buffer
#[derive(Debug, Clone)]
pub struct Exchange {
    /// User turn content
    pub user: String,
    /// Assistant reply content
    pub assistant: String,
}

/// Summarization oracle
///
/// Must preserve named entities, decisions, and technical details, with
/// bounded output length.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a batch of exchanges into one condensed text
    async fn summarize(&self, exchanges: &[Exchange]) -> Result<String>;
}
