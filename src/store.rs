//! Persistent store adapter
//!
//! Binds the embedding provider to the vector index: items are embedded in
//! document mode and upserted under their deterministic id, queries are
//! embedded in query mode. The adapter knows nothing about tiers or ranking;
//! routing and merging live above it.

use crate::error::{Error, Result};
use crate::item::MemoryItem;
use crate::provider::{
    EmbeddingMode, EmbeddingProvider, IndexStats, MetadataFilter, VectorIndex, VectorMatch,
    VectorRecord,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Adapter in front of the embedding provider and vector index
pub struct PersistentStore {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    provider_timeout: Duration,
}

impl PersistentStore {
    /// Create an adapter over the given providers. Every provider call is
    /// bounded by `provider_timeout`.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            provider_timeout,
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T>>,
        on_timeout: impl FnOnce() -> Error,
    ) -> Result<T> {
        match tokio::time::timeout(self.provider_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout()),
        }
    }

    /// Embed and upsert one item, returning its deterministic id.
    ///
    /// Identical content under the same tier and scope produces the same
    /// id, so repeated stores overwrite instead of duplicating. The TTL,
    /// when present, travels in the record metadata.
    pub async fn store(&self, item: &MemoryItem) -> Result<String> {
        let id = item.memory_id();
        let values = self
            .bounded(
                self.embedder.embed(&item.content, EmbeddingMode::Document),
                || Error::Embedding("document embedding timed out".to_string()),
            )
            .await?;

        self.bounded(
            self.index.upsert(vec![VectorRecord {
                id: id.clone(),
                values,
                metadata: item.wire_metadata(),
            }]),
            || Error::VectorStore("upsert timed out".to_string()),
        )
        .await?;

        debug!(
            memory_id = %id,
            tier = item.storage_tier.as_str(),
            conversation_id = %item.conversation_id,
            "stored memory"
        );
        Ok(id)
    }

    /// Embed the query text and run a similarity search.
    ///
    /// Metadata is always requested: callers need it for TTL and
    /// test-data screening.
    pub async fn query_similar(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>> {
        let vector = self
            .bounded(self.embedder.embed(query, EmbeddingMode::Query), || {
                Error::Embedding("query embedding timed out".to_string())
            })
            .await?;
        self.bounded(self.index.query(&vector, top_k, filter, true), || {
            Error::VectorStore("query timed out".to_string())
        })
        .await
    }

    /// Delete every record in the index, returning how many were removed.
    ///
    /// The index trait has no truncate operation, so ids are enumerated
    /// with a zero-vector query (which matches everything at score zero)
    /// and deleted in one batch.
    pub async fn clear_all(&self) -> Result<usize> {
        let total = self.stats().await?.total_count;
        if total == 0 {
            return Ok(0);
        }

        let zero = vec![0.0f32; self.embedder.dimension()];
        let matches = self
            .bounded(self.index.query(&zero, total, None, false), || {
                Error::VectorStore("query timed out".to_string())
            })
            .await?;
        let ids: Vec<String> = matches.into_iter().map(|m| m.id).collect();
        let removed = ids.len();

        self.bounded(self.index.delete(&ids), || {
            Error::VectorStore("delete timed out".to_string())
        })
        .await?;
        debug!(removed, "cleared persistent store");
        Ok(removed)
    }

    /// Index statistics
    pub async fn stats(&self) -> Result<IndexStats> {
        self.bounded(self.index.describe_stats(), || {
            Error::VectorStore("stats call timed out".to_string())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ImportanceLevel, MemoryItemBuilder, StorageTier};
    use crate::provider::stub::{FailingEmbedder, SlowEmbedder, StubEmbedder};
    use crate::provider::InMemoryVectorIndex;
    use chrono::Utc;

    fn store_with_stub() -> PersistentStore {
        PersistentStore::new(
            Arc::new(StubEmbedder),
            Arc::new(InMemoryVectorIndex::new()),
            Duration::from_secs(5),
        )
    }

    fn fact(content: &str) -> MemoryItem {
        MemoryItemBuilder::new(StorageTier::Global)
            .content(content)
            .importance(ImportanceLevel::High)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_and_query() {
        let store = store_with_stub();
        store.store(&fact("user_name:Sara")).await.unwrap();
        store.store(&fact("user_location:Milan")).await.unwrap();

        let matches = store
            .query_similar("user_name:Sara", None, 10)
            .await
            .unwrap();
        assert!(!matches.is_empty());
        assert_eq!(matches[0].metadata.get("content").unwrap(), "user_name:Sara");
    }

    #[tokio::test]
    async fn test_store_is_idempotent() {
        let store = store_with_stub();
        let first = store.store(&fact("user_name:Sara")).await.unwrap();
        let second = store.store(&fact("  USER_NAME:SARA  ")).await.unwrap();
        assert_eq!(first, second);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_count, 1);
    }

    #[tokio::test]
    async fn test_store_carries_ttl_metadata() {
        let store = store_with_stub();
        let item = MemoryItemBuilder::new(StorageTier::MediumTerm)
            .content("a passing remark")
            .conversation_id("conv-1")
            .ttl(Utc::now() + chrono::Duration::days(30))
            .build()
            .unwrap();
        store.store(&item).await.unwrap();

        let matches = store
            .query_similar("a passing remark", None, 1)
            .await
            .unwrap();
        assert!(matches[0].metadata.contains_key("ttl"));
        assert_eq!(matches[0].metadata.get("storage_tier").unwrap(), "medium_term");
    }

    #[tokio::test]
    async fn test_query_applies_filter() {
        let store = store_with_stub();
        store.store(&fact("user_name:Sara")).await.unwrap();

        let item = MemoryItemBuilder::new(StorageTier::Important)
            .content("remember the deadline")
            .conversation_id("conv-1")
            .build()
            .unwrap();
        store.store(&item).await.unwrap();

        let filter = MetadataFilter::eq("conversation_id", "conv-1");
        let matches = store
            .query_similar("deadline", Some(&filter), 10)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].metadata.get("conversation_id").unwrap(),
            "conv-1"
        );
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = store_with_stub();
        store.store(&fact("user_name:Sara")).await.unwrap();
        store.store(&fact("user_location:Milan")).await.unwrap();
        store.store(&fact("user_pet:cat")).await.unwrap();

        assert_eq!(store.clear_all().await.unwrap(), 3);
        assert_eq!(store.stats().await.unwrap().total_count, 0);
        // Clearing an empty store is a no-op.
        assert_eq!(store.clear_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let store = PersistentStore::new(
            Arc::new(FailingEmbedder),
            Arc::new(InMemoryVectorIndex::new()),
            Duration::from_secs(5),
        );
        assert!(store.store(&fact("user_name:Sara")).await.is_err());
        assert!(store.query_similar("anything", None, 5).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout() {
        let store = PersistentStore::new(
            Arc::new(SlowEmbedder),
            Arc::new(InMemoryVectorIndex::new()),
            Duration::from_secs(5),
        );
        let result = store.store(&fact("user_name:Sara")).await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }
}
