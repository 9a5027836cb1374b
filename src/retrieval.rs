//! Retrieval merging
//!
//! A retrieval fans out to the recency buffer and the persistent index in
//! parallel, then merges the two result sets: similarity and TTL screening
//! on the persistent side, test-data screening on both, dedup by
//! normalized content, and a composite ranking of similarity first,
//! importance second. A persistent-side failure degrades to buffer-only
//! results instead of failing the retrieval.

use crate::buffer::RecencyBuffer;
use crate::item::{is_test_conversation, normalize_content, ImportanceLevel, MessageType};
use crate::provider::{MetadataFilter, VectorMatch};
use crate::store::PersistentStore;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Hard cap on the persistent over-fetch
const MAX_OVERFETCH: usize = 100;

/// Where a retrieved memory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySource {
    /// The in-process recency buffer
    Recent,
    /// The persistent vector index
    Persistent,
}

impl MemorySource {
    /// Lowercase label used in formatted context
    pub fn as_str(&self) -> &'static str {
        match self {
            MemorySource::Recent => "recent",
            MemorySource::Persistent => "persistent",
        }
    }
}

/// One merged retrieval result
#[derive(Debug, Clone)]
pub struct RetrievedMemory {
    /// Memory content
    pub content: String,
    /// Similarity score (word overlap for buffer hits, cosine for
    /// persistent hits)
    pub score: f32,
    /// Importance assigned at storage time
    pub importance: ImportanceLevel,
    /// Which side produced the hit
    pub source: MemorySource,
    /// Owning conversation
    pub conversation_id: String,
    /// Creation instant, when known
    pub timestamp: Option<DateTime<Utc>>,
    /// Role recorded at storage time (`user`/`assistant`), when known
    pub role: Option<String>,
}

/// Merges buffer and persistent retrieval results
pub struct RetrievalMerger {
    similarity_threshold: f32,
}

impl RetrievalMerger {
    /// Create a merger with the given persistent similarity threshold
    pub fn new(similarity_threshold: f32) -> Self {
        Self {
            similarity_threshold,
        }
    }

    /// Retrieve up to `limit` memories relevant to `query`.
    ///
    /// The persistent side is scoped to the given conversation plus the
    /// global scope (global scope only when no conversation is given) and
    /// over-fetched so that screening and dedup still leave enough
    /// candidates. With `include_recent` false the buffer is skipped and
    /// only persistent memories are returned.
    pub async fn retrieve(
        &self,
        buffer: &RecencyBuffer,
        store: &PersistentStore,
        query: &str,
        conversation_id: Option<&str>,
        limit: usize,
        include_recent: bool,
    ) -> Vec<RetrievedMemory> {
        if limit == 0 {
            return Vec::new();
        }

        let filter = scope_filter(conversation_id);
        let top_k = limit.saturating_mul(2).min(MAX_OVERFETCH);

        let (buffer_matches, persistent) = tokio::join!(
            async {
                if include_recent {
                    buffer.search(query, conversation_id).await
                } else {
                    Vec::new()
                }
            },
            store.query_similar(query, Some(&filter), top_k),
        );

        let mut merged: Vec<RetrievedMemory> = buffer_matches
            .into_iter()
            .filter(|m| m.item.message_type != MessageType::ChatHistory)
            .map(|m| RetrievedMemory {
                content: m.item.content.clone(),
                score: m.score,
                importance: m.item.importance,
                source: MemorySource::Recent,
                conversation_id: m.item.conversation_id.clone(),
                timestamp: Some(m.item.timestamp),
                role: m
                    .item
                    .metadata
                    .get("role")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
            .collect();

        match persistent {
            Ok(matches) => {
                let now = Utc::now();
                merged.extend(
                    matches
                        .into_iter()
                        .filter(|m| m.score >= self.similarity_threshold)
                        .filter(|m| !is_expired_match(m, now))
                        .filter(|m| !is_test_match(m))
                        .filter_map(from_vector_match),
                );
            }
            Err(error) => {
                warn!(%error, "persistent retrieval failed, returning buffer results only");
            }
        }

        // Best candidate first, so the first occurrence per normalized
        // content wins the dedup below.
        merged.sort_by(|a, b| {
            (b.score, b.importance.weight())
                .partial_cmp(&(a.score, a.importance.weight()))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut seen = HashSet::new();
        merged.retain(|m| seen.insert(normalize_content(&m.content)));
        merged.truncate(limit);
        merged
    }
}

/// Persistent scope: the conversation plus global facts, or global facts
/// only when no conversation is given
fn scope_filter(conversation_id: Option<&str>) -> MetadataFilter {
    match conversation_id {
        Some(conv) => MetadataFilter::is_in(
            "conversation_id",
            vec![conv.into(), crate::item::GLOBAL_SCOPE.into()],
        ),
        None => MetadataFilter::eq("conversation_id", crate::item::GLOBAL_SCOPE),
    }
}

fn is_expired_match(m: &VectorMatch, now: DateTime<Utc>) -> bool {
    m.metadata
        .get("ttl")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ttl| now > ttl.with_timezone(&Utc))
        .unwrap_or(false)
}

fn is_test_match(m: &VectorMatch) -> bool {
    let flagged = match m.metadata.get("test") {
        Some(Value::Bool(true)) => true,
        Some(Value::String(s)) => s == "true",
        _ => false,
    };
    flagged
        || m.metadata
            .get("conversation_id")
            .and_then(Value::as_str)
            .map(is_test_conversation)
            .unwrap_or(false)
}

/// Rebuild a retrieval result from stored wire metadata. Matches without
/// content are malformed and dropped.
fn from_vector_match(m: VectorMatch) -> Option<RetrievedMemory> {
    let content = m.metadata.get("content")?.as_str()?.to_string();
    let importance = m
        .metadata
        .get("importance")
        .and_then(Value::as_str)
        .map(ImportanceLevel::from_label)
        .unwrap_or(ImportanceLevel::Low);
    let conversation_id = m
        .metadata
        .get("conversation_id")
        .and_then(Value::as_str)
        .unwrap_or(crate::item::GLOBAL_SCOPE)
        .to_string();
    let timestamp = m
        .metadata
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));
    let role = m
        .metadata
        .get("role")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(RetrievedMemory {
        content,
        score: m.score,
        importance,
        source: MemorySource::Persistent,
        conversation_id,
        timestamp,
        role,
    })
}
