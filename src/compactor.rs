//! Conversation compaction
//!
//! When the recency buffer fills, the conversation that triggered the fill
//! gets compacted: its buffered user turns are paired with the assistant
//! replies that followed them, the paired exchanges are summarized, and the
//! summary is kept as one permanent compressed memory. Summarization
//! failure degrades to a lexical digest of the most salient exchanges, so
//! compaction never loses the batch outright.

use crate::error::Result;
use crate::item::{
    ImportanceLevel, MemoryItem, MemoryItemBuilder, MessageType, StorageTier,
};
use crate::provider::{Exchange, Summarizer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// User-turn markers that make an exchange worth keeping in the
/// fallback digest
const SALIENT_MARKERS: &[&str] = &[
    "my name", "i live", "i work", "i love", "i like", "i hate", "i prefer",
    "i decided", "i want", "i need", "remember", "important", "plan",
    "deadline", "?",
];

/// Most exchanges quoted in a fallback digest
const FALLBACK_EXCHANGE_CAP: usize = 5;

/// Compacts buffered exchanges into summary memories
pub struct Compactor {
    summarizer: Arc<dyn Summarizer>,
    min_exchanges: usize,
    provider_timeout: Duration,
}

impl Compactor {
    /// Create a compactor requiring at least `min_exchanges` paired
    /// exchanges before it produces a summary. Summarization calls are
    /// bounded by `provider_timeout`.
    pub fn new(
        summarizer: Arc<dyn Summarizer>,
        min_exchanges: usize,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            summarizer,
            min_exchanges,
            provider_timeout,
        }
    }

    /// Compact one conversation out of a buffer snapshot.
    ///
    /// Returns `None` when the conversation has too few paired exchanges
    /// to be worth summarizing. The returned item is ready for the
    /// persistent store; the caller decides when to persist it.
    pub async fn compact(
        &self,
        snapshot: &[MemoryItem],
        conversation_id: &str,
    ) -> Result<Option<MemoryItem>> {
        let exchanges = pair_exchanges(snapshot, conversation_id);
        if exchanges.len() < self.min_exchanges {
            debug!(
                %conversation_id,
                exchanges = exchanges.len(),
                min = self.min_exchanges,
                "too few exchanges, skipping compaction"
            );
            return Ok(None);
        }

        let summary =
            match tokio::time::timeout(self.provider_timeout, self.summarizer.summarize(&exchanges))
                .await
            {
                Ok(Ok(summary)) if !summary.trim().is_empty() => summary,
                Ok(Ok(_)) => fallback_digest(&exchanges),
                Ok(Err(error)) => {
                    warn!(%error, %conversation_id, "summarization failed, using lexical digest");
                    fallback_digest(&exchanges)
                }
                Err(_) => {
                    warn!(%conversation_id, "summarization timed out, using lexical digest");
                    fallback_digest(&exchanges)
                }
            };

        let item = MemoryItemBuilder::new(StorageTier::Compressed)
            .content(summary)
            .conversation_id(conversation_id)
            .message_type(MessageType::Summary)
            .importance(ImportanceLevel::Medium)
            .metadata("type", "conversation_summary".into())
            .metadata("original_turns", exchanges.len().into())
            .build()?;

        debug!(
            %conversation_id,
            exchanges = exchanges.len(),
            "compacted conversation"
        );
        Ok(Some(item))
    }
}

/// Pair each buffered user turn with the nearest assistant reply that
/// followed it.
///
/// The snapshot is in insertion order; every user turn pairs with the
/// next later reply, so back-to-back user turns share the reply that
/// eventually answered them. A user turn with no later reply stays
/// unpaired and is excluded. Cached assistant replies are the only
/// `ChatHistory` items in the buffer.
fn pair_exchanges(snapshot: &[MemoryItem], conversation_id: &str) -> Vec<Exchange> {
    let mut exchanges = Vec::new();

    for (position, item) in snapshot.iter().enumerate() {
        if item.conversation_id != conversation_id
            || item.message_type != MessageType::Chat
        {
            continue;
        }

        let reply = snapshot[position + 1..].iter().find(|later| {
            later.conversation_id == conversation_id
                && later.message_type == MessageType::ChatHistory
        });
        if let Some(reply) = reply {
            exchanges.push(Exchange {
                user: item.content.clone(),
                assistant: reply.content.clone(),
            });
        }
    }
    exchanges
}

/// Lexical digest used when the summarization oracle is unavailable:
/// quotes the user side of the most salient exchanges, capped.
fn fallback_digest(exchanges: &[Exchange]) -> String {
    let mut salient: Vec<&str> = exchanges
        .iter()
        .filter(|e| {
            let lower = e.user.to_lowercase();
            SALIENT_MARKERS.iter().any(|m| lower.contains(m))
        })
        .map(|e| e.user.as_str())
        .collect();

    if salient.is_empty() {
        salient = exchanges.iter().map(|e| e.user.as_str()).collect();
    }
    salient.truncate(FALLBACK_EXCHANGE_CAP);

    format!("Conversation covered: {}", salient.join("; "))
}
