//! Tier routing for incoming turns
//!
//! Decides where a user turn lands in the persistent store. Fact
//! extraction runs on every user turn regardless of classified importance:
//! extracted facts become permanent global items, and turns yielding no
//! facts fall back to a TTL-bounded medium-term memory. Extraction failure
//! degrades to the same fallback rather than dropping the turn.
//!
//! Assistant replies are never persisted on this path; only an explicit
//! save request stores them, into the important tier.

use crate::error::Result;
use crate::item::{ImportanceLevel, MemoryItem, MemoryItemBuilder, MessageType, StorageTier};
use crate::provider::FactExtractor;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Which persistence path a user turn took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Facts were extracted and stored as global items
    GlobalFacts,
    /// No facts (or extraction failed): the raw turn goes to medium-term
    MediumTerm,
}

/// A routed user turn: the items to persist and the path taken
#[derive(Debug)]
pub struct RoutedTurn {
    /// Items ready for the persistent store
    pub items: Vec<MemoryItem>,
    /// Path taken
    pub route: Route,
}

/// Routes turns into storage tiers
pub struct TierRouter {
    extractor: Arc<dyn FactExtractor>,
    medium_term_ttl_days: i64,
    provider_timeout: Duration,
}

impl TierRouter {
    /// Create a router with the given extractor and medium-term TTL.
    /// Extraction calls are bounded by `provider_timeout`.
    pub fn new(
        extractor: Arc<dyn FactExtractor>,
        medium_term_ttl_days: i64,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            medium_term_ttl_days,
            provider_timeout,
        }
    }

    /// Route a user turn.
    ///
    /// Every extracted fact becomes one high-importance global item in
    /// canonical `type:value` form. When nothing is extracted, the raw
    /// turn is kept as a medium-term memory under the classified
    /// importance, expiring after the configured TTL.
    pub async fn route_user_turn(
        &self,
        text: &str,
        conversation_id: &str,
        importance: ImportanceLevel,
        extra_metadata: &HashMap<String, serde_json::Value>,
    ) -> Result<RoutedTurn> {
        let facts = match tokio::time::timeout(self.provider_timeout, self.extractor.extract(text))
            .await
        {
            Ok(Ok(facts)) => facts,
            Ok(Err(error)) => {
                warn!(%error, %conversation_id, "fact extraction failed, falling back to medium-term");
                Vec::new()
            }
            Err(_) => {
                warn!(%conversation_id, "fact extraction timed out, falling back to medium-term");
                Vec::new()
            }
        };

        if facts.is_empty() {
            let item = self.medium_term_item(text, conversation_id, importance, extra_metadata)?;
            return Ok(RoutedTurn {
                items: vec![item],
                route: Route::MediumTerm,
            });
        }

        let mut items = Vec::with_capacity(facts.len());
        for fact in &facts {
            let item = MemoryItemBuilder::new(StorageTier::Global)
                .content(fact.canonical())
                .message_type(MessageType::Personal)
                .importance(ImportanceLevel::High)
                .metadata_map(extra_metadata.clone())
                .metadata("role", "user".into())
                .metadata("type", "personal_info".into())
                .metadata("fact_type", fact.fact_type.clone().into())
                .metadata("category", fact.category.clone().into())
                .build()?;
            items.push(item);
        }

        debug!(
            %conversation_id,
            facts = items.len(),
            "routed user turn to global facts"
        );
        Ok(RoutedTurn {
            items,
            route: Route::GlobalFacts,
        })
    }

    /// Build the item for an explicit assistant-reply save.
    ///
    /// Saved replies are treated as critical: important tier, high
    /// importance, flagged as manually saved.
    pub fn save_assistant_reply(
        &self,
        text: &str,
        conversation_id: &str,
        extra_metadata: &HashMap<String, serde_json::Value>,
    ) -> Result<MemoryItem> {
        MemoryItemBuilder::new(StorageTier::Important)
            .content(text)
            .conversation_id(conversation_id)
            .message_type(MessageType::Chat)
            .importance(ImportanceLevel::High)
            .metadata_map(extra_metadata.clone())
            .metadata("role", "assistant".into())
            .metadata("manually_saved", true.into())
            .build()
    }

    fn medium_term_item(
        &self,
        text: &str,
        conversation_id: &str,
        importance: ImportanceLevel,
        extra_metadata: &HashMap<String, serde_json::Value>,
    ) -> Result<MemoryItem> {
        MemoryItemBuilder::new(StorageTier::MediumTerm)
            .content(text)
            .conversation_id(conversation_id)
            .message_type(MessageType::Chat)
            .importance(importance)
            .ttl(Utc::now() + chrono::Duration::days(self.medium_term_ttl_days))
            .metadata_map(extra_metadata.clone())
            .metadata("role", "user".into())
            .build()
    }
}
