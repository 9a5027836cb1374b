//! Recall - Tiered Conversational Memory
//!
//! Recall gives a conversational assistant durable memory across sessions.
//! Each turn flows through an importance classifier and a tier router:
//! personal facts become permanent cross-conversation memories, ordinary
//! turns get a TTL-bounded medium-term memory, and everything passes
//! through a bounded recency buffer that is compacted into summaries when
//! it fills.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌───────────────────────────────┐
//!   turn ────────▶│         MemoryService         │◀──────── query
//!                 └──────┬──────────────┬─────────┘
//!                        │              │
//!          ┌─────────────▼──┐    ┌──────▼──────────┐
//!          │   Classifier   │    │ RetrievalMerger │
//!          │  + TierRouter  │    │ (buffer ∥ index)│
//!          └──────┬─────────┘    └──────┬──────────┘
//!                 │                     │
//!      ┌──────────▼─────────┐   ┌───────▼─────────┐
//!      │   RecencyBuffer    │   │ PersistentStore │
//!      │ (FIFO, compaction) │   │ (embed + index) │
//!      └────────────────────┘   └─────────────────┘
//! ```
//!
//! External capabilities (embedding, vector index, fact extraction,
//! summarization) are injected as trait objects; see [`provider`].
//!
//! ## Quick start
//!
//! ```no_run
//! use recall::provider::InMemoryVectorIndex;
//! use recall::{MemoryConfig, MemoryService};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     embedder: Arc<dyn recall::provider::EmbeddingProvider>,
//! #     extractor: Arc<dyn recall::provider::FactExtractor>,
//! #     summarizer: Arc<dyn recall::provider::Summarizer>,
//! # ) -> recall::Result<()> {
//! let service = MemoryService::builder()
//!     .config(MemoryConfig::default())
//!     .embedder(embedder)
//!     .index(Arc::new(InMemoryVectorIndex::new()))
//!     .extractor(extractor)
//!     .summarizer(summarizer)
//!     .build()?;
//!
//! service
//!     .store_turn("my name is Sara", Some("hi Sara!"), "conv-1", HashMap::new())
//!     .await;
//! let context = service.retrieve_context("what is my name?", Some("conv-1"), 5).await;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod classifier;
pub mod compactor;
pub mod config;
pub mod error;
pub mod item;
pub mod provider;
pub mod retrieval;
pub mod router;
pub mod service;
pub mod store;

pub use buffer::RecencyBuffer;
pub use classifier::{Classification, ImportanceClassifier};
pub use compactor::Compactor;
pub use config::{ClassifierConfig, MemoryConfig, SignalGroup, SignalRule};
pub use error::{Error, Result};
pub use item::{
    ImportanceLevel, MemoryItem, MemoryItemBuilder, MessageType, StorageTier, GLOBAL_SCOPE,
};
pub use retrieval::{MemorySource, RetrievalMerger, RetrievedMemory};
pub use router::{Route, RoutedTurn, TierRouter};
pub use service::{MemoryService, MemoryServiceBuilder, MemoryStats};
pub use store::PersistentStore;
