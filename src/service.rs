//! Memory service facade
//!
//! `MemoryService` wires the classifier, recency buffer, tier router,
//! compactor, retrieval merger, and persistent store behind one small
//! surface. The conversational operations (`store_turn`,
//! `save_assistant_turn`, `retrieve_context`, `clear_all`) never fail the
//! caller: provider errors are logged and reported as degraded results,
//! because losing a memory must not break the conversation itself.

use crate::buffer::RecencyBuffer;
use crate::classifier::ImportanceClassifier;
use crate::compactor::Compactor;
use crate::config::MemoryConfig;
use crate::error::{Error, Result};
use crate::item::{ImportanceLevel, MemoryItemBuilder, MessageType, StorageTier};
use crate::provider::{EmbeddingProvider, FactExtractor, Summarizer, VectorIndex};
use crate::retrieval::{RetrievalMerger, RetrievedMemory};
use crate::router::TierRouter;
use crate::store::PersistentStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Operational counters exposed by `MemoryService::stats`
#[derive(Debug, Clone, Copy)]
pub struct MemoryStats {
    /// Items currently in the recency buffer
    pub buffer_items: usize,
    /// Recency buffer capacity
    pub buffer_capacity: usize,
    /// Total records in the persistent index (0 when unreachable)
    pub persistent_items: usize,
    /// High-importance items persisted since service construction
    pub stored_high: usize,
    /// Medium-importance items persisted since service construction
    pub stored_medium: usize,
    /// Low-importance items persisted since service construction
    pub stored_low: usize,
    /// Summaries persisted by compaction since service construction
    pub summaries: usize,
    /// Compaction runs since service construction
    pub compactions: usize,
}

#[derive(Default)]
struct Counters {
    stored_high: AtomicUsize,
    stored_medium: AtomicUsize,
    stored_low: AtomicUsize,
    summaries: AtomicUsize,
    compactions: AtomicUsize,
}

impl Counters {
    fn record_stored(&self, importance: ImportanceLevel) {
        let counter = match importance {
            ImportanceLevel::High => &self.stored_high,
            ImportanceLevel::Medium => &self.stored_medium,
            ImportanceLevel::Low => &self.stored_low,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// The tiered memory subsystem
#[derive(Clone)]
pub struct MemoryService {
    config: MemoryConfig,
    classifier: Arc<ImportanceClassifier>,
    buffer: Arc<RecencyBuffer>,
    store: Arc<PersistentStore>,
    router: Arc<TierRouter>,
    compactor: Arc<Compactor>,
    merger: Arc<RetrievalMerger>,
    counters: Arc<Counters>,
}

impl MemoryService {
    /// Start building a service
    pub fn builder() -> MemoryServiceBuilder {
        MemoryServiceBuilder::default()
    }

    /// Record one conversational turn.
    ///
    /// The user text is classified, buffered, and routed to the
    /// persistent tiers; the assistant reply, when present, is buffered
    /// only (it is never persisted on this path). When the buffer fills,
    /// this conversation is compacted. Returns `true` when every
    /// persistence step succeeded.
    pub async fn store_turn(
        &self,
        user_text: &str,
        assistant_text: Option<&str>,
        conversation_id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> bool {
        let classification = self.classifier.classify(user_text);
        debug!(
            %conversation_id,
            score = classification.score,
            level = classification.level.as_str(),
            "classified user turn"
        );

        let mut ok = true;
        let mut just_filled = false;

        match MemoryItemBuilder::new(StorageTier::Recent)
            .content(user_text)
            .conversation_id(conversation_id)
            .importance(classification.level)
            .metadata_map(metadata.clone())
            .metadata("role", "user".into())
            .build()
        {
            Ok(item) => just_filled |= self.buffer.push(item).await.just_filled,
            Err(e) => {
                error!(error = %e, %conversation_id, "failed to buffer user turn");
                ok = false;
            }
        }

        if let Some(reply) = assistant_text {
            match MemoryItemBuilder::new(StorageTier::Recent)
                .content(reply)
                .conversation_id(conversation_id)
                .message_type(MessageType::ChatHistory)
                .metadata("role", "assistant".into())
                .build()
            {
                Ok(item) => just_filled |= self.buffer.push(item).await.just_filled,
                Err(e) => {
                    error!(error = %e, %conversation_id, "failed to buffer assistant reply");
                    ok = false;
                }
            }
        }

        ok &= self
            .persist_user_turn(user_text, conversation_id, classification.level, &metadata)
            .await;

        if just_filled {
            ok &= self.run_compaction(conversation_id).await;
        }
        ok
    }

    /// Fire-and-forget variant of `store_turn` for callers on a latency
    /// budget; failures are logged from the spawned task.
    pub fn store_turn_detached(
        &self,
        user_text: String,
        assistant_text: Option<String>,
        conversation_id: String,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        let service = self.clone();
        tokio::spawn(async move {
            let stored = service
                .store_turn(
                    &user_text,
                    assistant_text.as_deref(),
                    &conversation_id,
                    metadata,
                )
                .await;
            if !stored {
                error!(%conversation_id, "detached store_turn completed with failures");
            }
        });
    }

    /// Explicitly persist an assistant reply into the important tier
    pub async fn save_assistant_turn(
        &self,
        text: &str,
        conversation_id: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> bool {
        let item = match self
            .router
            .save_assistant_reply(text, conversation_id, &metadata)
        {
            Ok(item) => item,
            Err(e) => {
                error!(error = %e, %conversation_id, "invalid assistant save");
                return false;
            }
        };

        match self.store.store(&item).await {
            Ok(id) => {
                self.counters.record_stored(item.importance);
                info!(%conversation_id, memory_id = %id, "assistant reply saved");
                true
            }
            Err(e) => {
                error!(error = %e, %conversation_id, "failed to save assistant reply");
                false
            }
        }
    }

    /// Retrieve raw merged memories. With `include_recent` false the
    /// recency buffer is skipped and only persistent memories are
    /// consulted.
    pub async fn retrieve(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        limit: usize,
        include_recent: bool,
    ) -> Vec<RetrievedMemory> {
        self.merger
            .retrieve(
                &self.buffer,
                &self.store,
                query,
                conversation_id,
                limit,
                include_recent,
            )
            .await
    }

    /// Retrieve memories formatted as a context block for prompt
    /// injection. Returns an empty string when nothing relevant is found.
    pub async fn retrieve_context(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        limit: usize,
    ) -> String {
        let memories = self.retrieve(query, conversation_id, limit, true).await;
        if memories.is_empty() {
            return String::new();
        }

        let mut out = String::from("## Context from memory:\n");
        for memory in &memories {
            let role = memory.role.as_deref().unwrap_or("memory");
            out.push_str(&format!(
                "- [{} | {}{}] {}: {}\n",
                memory.source.as_str(),
                memory.importance.as_str(),
                memory
                    .timestamp
                    .map(|t| format!(" | {}", t.format("%Y-%m-%d")))
                    .unwrap_or_default(),
                role,
                memory.content,
            ));
        }
        out
    }

    /// Drop the recency buffer and every persistent record, returning the
    /// number of persistent records removed
    pub async fn clear_all(&self) -> usize {
        self.buffer.clear().await;
        match self.store.clear_all().await {
            Ok(removed) => {
                info!(removed, "cleared all memories");
                removed
            }
            Err(e) => {
                error!(error = %e, "failed to clear persistent store");
                0
            }
        }
    }

    /// Current operational counters
    pub async fn stats(&self) -> MemoryStats {
        let persistent_items = match self.store.stats().await {
            Ok(stats) => stats.total_count,
            Err(e) => {
                error!(error = %e, "failed to read index stats");
                0
            }
        };
        MemoryStats {
            buffer_items: self.buffer.len().await,
            buffer_capacity: self.config.recent_buffer_size,
            persistent_items,
            stored_high: self.counters.stored_high.load(Ordering::Relaxed),
            stored_medium: self.counters.stored_medium.load(Ordering::Relaxed),
            stored_low: self.counters.stored_low.load(Ordering::Relaxed),
            summaries: self.counters.summaries.load(Ordering::Relaxed),
            compactions: self.counters.compactions.load(Ordering::Relaxed),
        }
    }

    async fn persist_user_turn(
        &self,
        text: &str,
        conversation_id: &str,
        importance: ImportanceLevel,
        metadata: &HashMap<String, serde_json::Value>,
    ) -> bool {
        let routed = match self
            .router
            .route_user_turn(text, conversation_id, importance, metadata)
            .await
        {
            Ok(routed) => routed,
            Err(e) => {
                error!(error = %e, %conversation_id, "routing failed");
                return false;
            }
        };

        let mut ok = true;
        for item in &routed.items {
            match self.store.store(item).await {
                Ok(_) => self.counters.record_stored(item.importance),
                Err(e) => {
                    error!(
                        error = %e,
                        %conversation_id,
                        tier = item.storage_tier.as_str(),
                        "failed to persist memory"
                    );
                    ok = false;
                }
            }
        }
        ok
    }

    async fn run_compaction(&self, conversation_id: &str) -> bool {
        let snapshot = self.buffer.snapshot().await;
        match self.compactor.compact(&snapshot, conversation_id).await {
            Ok(Some(summary)) => {
                self.counters.compactions.fetch_add(1, Ordering::Relaxed);
                match self.store.store(&summary).await {
                    Ok(id) => {
                        self.counters.summaries.fetch_add(1, Ordering::Relaxed);
                        self.counters.record_stored(summary.importance);
                        info!(%conversation_id, memory_id = %id, "conversation compacted");
                        true
                    }
                    Err(e) => {
                        error!(error = %e, %conversation_id, "failed to persist summary");
                        false
                    }
                }
            }
            Ok(None) => true,
            Err(e) => {
                error!(error = %e, %conversation_id, "compaction failed");
                false
            }
        }
    }
}

/// Builder for `MemoryService`
#[derive(Default)]
pub struct MemoryServiceBuilder {
    config: Option<MemoryConfig>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    extractor: Option<Arc<dyn FactExtractor>>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl MemoryServiceBuilder {
    /// Override the default configuration
    pub fn config(mut self, config: MemoryConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider (required)
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the persistent vector index (required)
    pub fn index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the fact-extraction oracle (required)
    pub fn extractor(mut self, extractor: Arc<dyn FactExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Set the summarization oracle (required)
    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    /// Build the service, compiling the classifier rules
    pub fn build(self) -> Result<MemoryService> {
        let config = self.config.unwrap_or_default();
        let embedder = self
            .embedder
            .ok_or_else(|| Error::Config("embedding provider is required".to_string()))?;
        let index = self
            .index
            .ok_or_else(|| Error::Config("vector index is required".to_string()))?;
        let extractor = self
            .extractor
            .ok_or_else(|| Error::Config("fact extractor is required".to_string()))?;
        let summarizer = self
            .summarizer
            .ok_or_else(|| Error::Config("summarizer is required".to_string()))?;

        let classifier = ImportanceClassifier::new(config.classifier.clone())?;
        let provider_timeout = Duration::from_secs(config.provider_timeout_secs);

        Ok(MemoryService {
            classifier: Arc::new(classifier),
            buffer: Arc::new(RecencyBuffer::new(config.recent_buffer_size)),
            store: Arc::new(PersistentStore::new(embedder, index, provider_timeout)),
            router: Arc::new(TierRouter::new(
                extractor,
                config.medium_term_ttl_days,
                provider_timeout,
            )),
            compactor: Arc::new(Compactor::new(
                summarizer,
                config.min_exchanges_to_compact,
                provider_timeout,
            )),
            merger: Arc::new(RetrievalMerger::new(config.similarity_threshold)),
            counters: Arc::new(Counters::default()),
            config,
        })
    }
}
