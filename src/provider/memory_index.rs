//! In-memory vector index
//!
//! A reference `VectorIndex` implementation backed by a `RwLock`-guarded
//! map. Scores are cosine similarity; filters are evaluated locally.
//! Useful for tests and single-process deployments that do not need a
//! hosted index.

use super::{IndexStats, MetadataFilter, VectorIndex, VectorMatch, VectorRecord};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of `VectorIndex`
pub struct InMemoryVectorIndex {
    entries: Arc<RwLock<HashMap<String, StoredRecord>>>,
}

struct StoredRecord {
    values: Vec<f32>,
    metadata: HashMap<String, serde_json::Value>,
}

impl InMemoryVectorIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut entries = self.entries.write().await;
        for record in records {
            entries.insert(
                record.id,
                StoredRecord {
                    values: record.values,
                    metadata: record.metadata,
                },
            );
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>> {
        let entries = self.entries.read().await;

        let mut matches: Vec<VectorMatch> = entries
            .iter()
            .filter(|(_, record)| {
                filter
                    .map(|f| f.matches(&record.metadata))
                    .unwrap_or(true)
            })
            .map(|(id, record)| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: if include_metadata {
                    record.metadata.clone()
                } else {
                    HashMap::new()
                },
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut entries = self.entries.write().await;
        for id in ids {
            entries.remove(id);
        }
        Ok(())
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            total_count: self.entries.read().await.len(),
        })
    }
}

/// Cosine similarity between two vectors; 0.0 for mismatched or zero vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, values: Vec<f32>, conversation: &str) -> VectorRecord {
        let mut metadata = HashMap::new();
        metadata.insert(
            "conversation_id".to_string(),
            serde_json::Value::String(conversation.to_string()),
        );
        VectorRecord {
            id: id.to_string(),
            values,
            metadata,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_query() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                record("a", vec![1.0, 0.0], "conv-1"),
                record("b", vec![0.0, 1.0], "conv-1"),
            ])
            .await
            .unwrap();

        let matches = index.query(&[1.0, 0.0], 10, None, true).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "a");
        assert!((matches[0].score - 1.0).abs() < 0.001);
        assert!(matches[1].score.abs() < 0.001);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_id() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![record("a", vec![1.0, 0.0], "conv-1")])
            .await
            .unwrap();
        index
            .upsert(vec![record("a", vec![0.0, 1.0], "conv-2")])
            .await
            .unwrap();

        let stats = index.describe_stats().await.unwrap();
        assert_eq!(stats.total_count, 1);

        let matches = index.query(&[0.0, 1.0], 1, None, true).await.unwrap();
        assert_eq!(matches[0].metadata.get("conversation_id").unwrap(), "conv-2");
    }

    #[tokio::test]
    async fn test_query_with_filter() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                record("a", vec![1.0, 0.0], "conv-1"),
                record("b", vec![1.0, 0.0], "global"),
                record("c", vec![1.0, 0.0], "conv-2"),
            ])
            .await
            .unwrap();

        let filter = MetadataFilter::is_in(
            "conversation_id",
            vec!["conv-1".into(), "global".into()],
        );
        let matches = index
            .query(&[1.0, 0.0], 10, Some(&filter), true)
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| m.id != "c"));
    }

    #[tokio::test]
    async fn test_query_top_k_truncation() {
        let index = InMemoryVectorIndex::new();
        for i in 0..10 {
            index
                .upsert(vec![record(&format!("r{}", i), vec![1.0, i as f32], "c")])
                .await
                .unwrap();
        }
        let matches = index.query(&[1.0, 0.0], 3, None, false).await.unwrap();
        assert_eq!(matches.len(), 3);
        assert!(matches[0].metadata.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                record("a", vec![1.0], "c"),
                record("b", vec![1.0], "c"),
            ])
            .await
            .unwrap();

        index.delete(&["a".to_string()]).await.unwrap();
        let stats = index.describe_stats().await.unwrap();
        assert_eq!(stats.total_count, 1);
    }

    #[tokio::test]
    async fn test_zero_vector_query_returns_all_ids() {
        // Used by clear-all: a zero vector scores 0 everywhere but still
        // enumerates every record.
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                record("a", vec![1.0, 2.0], "c"),
                record("b", vec![3.0, 4.0], "c"),
            ])
            .await
            .unwrap();

        let matches = index.query(&[0.0, 0.0], 100, None, false).await.unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
