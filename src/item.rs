//! Memory item data types
//!
//! A `MemoryItem` is the atomic unit of memory: a raw turn, an extracted
//! fact, or a compacted summary. Items destined for the persistent index
//! get a deterministic identifier derived from their tier, scope, and
//! normalized content, so re-storing identical content overwrites instead
//! of duplicating.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Reserved conversation scope for facts valid across all conversations
pub const GLOBAL_SCOPE: &str = "global";

/// Message importance levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportanceLevel {
    /// Small talk, confirmations
    Low,
    /// Useful info, questions
    Medium,
    /// Critical info, personal data, decisions
    High,
}

impl ImportanceLevel {
    /// Lowercase label used in wire metadata and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportanceLevel::Low => "low",
            ImportanceLevel::Medium => "medium",
            ImportanceLevel::High => "high",
        }
    }

    /// Weight used as the secondary ranking key during retrieval merging
    pub fn weight(&self) -> f32 {
        match self {
            ImportanceLevel::High => 1.0,
            ImportanceLevel::Medium => 0.5,
            ImportanceLevel::Low => 0.0,
        }
    }

    /// Parse a wire metadata label, defaulting to `Low` for unknown values
    pub fn from_label(label: &str) -> Self {
        match label {
            "high" => ImportanceLevel::High,
            "medium" => ImportanceLevel::Medium,
            _ => ImportanceLevel::Low,
        }
    }
}

/// Storage tiers with different retention policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageTier {
    /// Recency buffer only, evicted FIFO, never persisted
    Recent,
    /// Explicitly saved content, permanent
    Important,
    /// Conversation memory with a TTL
    MediumTerm,
    /// Compacted summaries, permanent
    Compressed,
    /// Cross-conversation personal facts, permanent
    Global,
}

impl StorageTier {
    /// Lowercase label used in wire metadata, ids, and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTier::Recent => "recent",
            StorageTier::Important => "important",
            StorageTier::MediumTerm => "medium_term",
            StorageTier::Compressed => "compressed",
            StorageTier::Global => "global",
        }
    }
}

/// Message types determining default retrieval eligibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// A regular conversational turn
    Chat,
    /// An extracted personal fact
    Personal,
    /// A compacted conversation summary
    Summary,
    /// Assistant reply cached for exchange pairing, never persisted
    ChatHistory,
}

impl MessageType {
    /// Lowercase label used in wire metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Chat => "chat",
            MessageType::Personal => "personal",
            MessageType::Summary => "summary",
            MessageType::ChatHistory => "chat_history",
        }
    }
}

/// The atomic unit of memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Text payload: raw turn, extracted fact, or summary
    pub content: String,
    /// Open metadata mapping (role, category, provenance flags)
    pub metadata: HashMap<String, serde_json::Value>,
    /// Creation instant, immutable
    pub timestamp: DateTime<Utc>,
    /// Owning conversation, or `GLOBAL_SCOPE`
    pub conversation_id: String,
    /// Message type
    pub message_type: MessageType,
    /// Importance, assigned once at creation
    pub importance: ImportanceLevel,
    /// Storage tier
    pub storage_tier: StorageTier,
    /// Absolute expiry instant, present only for `MediumTerm` items
    pub ttl: Option<DateTime<Utc>>,
}

impl MemoryItem {
    /// Deterministic identifier derived from `(tier, scope, normalized content)`.
    ///
    /// Re-submitting identical content under the same tier and scope yields
    /// the same id, making persistence idempotent (overwrite, not duplicate).
    pub fn memory_id(&self) -> String {
        memory_id(
            self.storage_tier.as_str(),
            &self.conversation_id,
            &self.content,
        )
    }

    /// True if the item carries a TTL that has already passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.ttl, Some(ttl) if now > ttl)
    }

    /// True if the item is explicitly marked as test/dummy data.
    ///
    /// Matches the `test` metadata flag (boolean or `"true"`) and the
    /// reserved test conversation id forms.
    pub fn is_test_data(&self) -> bool {
        let flagged = match self.metadata.get("test") {
            Some(serde_json::Value::Bool(true)) => true,
            Some(serde_json::Value::String(s)) => s == "true",
            _ => false,
        };
        flagged || is_test_conversation(&self.conversation_id)
    }

    /// Flatten the item into the metadata mapping stored alongside its
    /// vector. Null-valued custom entries are dropped.
    pub fn wire_metadata(&self) -> HashMap<String, serde_json::Value> {
        let mut meta: HashMap<String, serde_json::Value> = self
            .metadata
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        meta.insert("content".into(), self.content.clone().into());
        meta.insert("timestamp".into(), self.timestamp.to_rfc3339().into());
        meta.insert(
            "conversation_id".into(),
            self.conversation_id.clone().into(),
        );
        meta.insert("message_type".into(), self.message_type.as_str().into());
        meta.insert("importance".into(), self.importance.as_str().into());
        meta.insert("storage_tier".into(), self.storage_tier.as_str().into());
        if let Some(ttl) = self.ttl {
            meta.insert("ttl".into(), ttl.to_rfc3339().into());
        }
        meta
    }
}

/// True for conversation ids reserved for test/dummy data
pub fn is_test_conversation(conversation_id: &str) -> bool {
    matches!(conversation_id, "test" | "test_data" | "dummy" | "example")
        || conversation_id.starts_with("test-")
        || conversation_id.starts_with("dummy-")
}

/// Normalize text for consistent hashing: trimmed and lowercased
pub fn normalize_content(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Deterministic memory identifier: sha-256 of `kind|scope|normalized content`
pub fn memory_id(kind: &str, scope: &str, content: &str) -> String {
    let base = format!("{}|{}|{}", kind, scope, normalize_content(content));
    let digest = Sha256::digest(base.as_bytes());
    format!("{:x}", digest)
}

/// Builder for constructing `MemoryItem` instances
pub struct MemoryItemBuilder {
    content: Option<String>,
    metadata: HashMap<String, serde_json::Value>,
    conversation_id: Option<String>,
    message_type: MessageType,
    importance: ImportanceLevel,
    storage_tier: StorageTier,
    ttl: Option<DateTime<Utc>>,
}

impl MemoryItemBuilder {
    /// Create a new builder with the required storage tier
    pub fn new(storage_tier: StorageTier) -> Self {
        Self {
            content: None,
            metadata: HashMap::new(),
            conversation_id: None,
            message_type: MessageType::Chat,
            importance: ImportanceLevel::Low,
            storage_tier,
            ttl: None,
        }
    }

    /// Set the text payload
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the owning conversation
    pub fn conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    /// Set the message type
    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Set the importance level
    pub fn importance(mut self, importance: ImportanceLevel) -> Self {
        self.importance = importance;
        self
    }

    /// Set the expiry instant (valid only for `MediumTerm` items)
    pub fn ttl(mut self, ttl: DateTime<Utc>) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Add a metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Extend metadata from an existing mapping
    pub fn metadata_map(mut self, map: HashMap<String, serde_json::Value>) -> Self {
        self.metadata.extend(map);
        self
    }

    /// Build the item, enforcing the tier invariants:
    /// `ttl` iff `MediumTerm`, and `Global` items always live in the
    /// global scope.
    pub fn build(self) -> Result<MemoryItem> {
        let content = self
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Memory("memory item content is required".to_string()))?;

        match (self.storage_tier, self.ttl.is_some()) {
            (StorageTier::MediumTerm, false) => {
                return Err(Error::Memory(
                    "medium_term items require a ttl".to_string(),
                ));
            }
            (StorageTier::MediumTerm, true) => {}
            (_, true) => {
                return Err(Error::Memory(format!(
                    "ttl is not allowed on {} items",
                    self.storage_tier.as_str()
                )));
            }
            (_, false) => {}
        }

        let conversation_id = if self.storage_tier == StorageTier::Global {
            GLOBAL_SCOPE.to_string()
        } else {
            self.conversation_id
                .ok_or_else(|| Error::Memory("conversation_id is required".to_string()))?
        };

        Ok(MemoryItem {
            content,
            metadata: self.metadata,
            timestamp: Utc::now(),
            conversation_id,
            message_type: self.message_type,
            importance: self.importance,
            storage_tier: self.storage_tier,
            ttl: self.ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_builder_basic() {
        let item = MemoryItemBuilder::new(StorageTier::Important)
            .content("remember this answer")
            .conversation_id("conv-1")
            .message_type(MessageType::Chat)
            .importance(ImportanceLevel::High)
            .metadata("role", "assistant".into())
            .build()
            .unwrap();

        assert_eq!(item.content, "remember this answer");
        assert_eq!(item.conversation_id, "conv-1");
        assert_eq!(item.storage_tier, StorageTier::Important);
        assert_eq!(item.importance, ImportanceLevel::High);
        assert!(item.ttl.is_none());
    }

    #[test]
    fn test_builder_rejects_empty_content() {
        assert!(MemoryItemBuilder::new(StorageTier::Recent)
            .conversation_id("conv-1")
            .build()
            .is_err());
        assert!(MemoryItemBuilder::new(StorageTier::Recent)
            .content("   ")
            .conversation_id("conv-1")
            .build()
            .is_err());
    }

    #[test]
    fn test_medium_term_requires_ttl() {
        let result = MemoryItemBuilder::new(StorageTier::MediumTerm)
            .content("a passing remark")
            .conversation_id("conv-1")
            .build();
        assert!(result.is_err());

        let item = MemoryItemBuilder::new(StorageTier::MediumTerm)
            .content("a passing remark")
            .conversation_id("conv-1")
            .ttl(Utc::now() + Duration::days(30))
            .build()
            .unwrap();
        assert!(item.ttl.is_some());
    }

    #[test]
    fn test_ttl_rejected_on_other_tiers() {
        let result = MemoryItemBuilder::new(StorageTier::Important)
            .content("permanent")
            .conversation_id("conv-1")
            .ttl(Utc::now())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_global_tier_forces_global_scope() {
        let item = MemoryItemBuilder::new(StorageTier::Global)
            .content("user_name:Sara")
            .conversation_id("conv-1")
            .build()
            .unwrap();
        assert_eq!(item.conversation_id, GLOBAL_SCOPE);
    }

    #[test]
    fn test_memory_id_deterministic() {
        let a = memory_id("global", "global", "user_name:Sara");
        let b = memory_id("global", "global", "  User_Name:Sara ");
        assert_eq!(a, b, "normalization should make ids identical");

        let c = memory_id("global", "global", "user_name:Marco");
        assert_ne!(a, c);

        let d = memory_id("important", "global", "user_name:Sara");
        assert_ne!(a, d, "kind participates in the id");
    }

    #[test]
    fn test_is_expired() {
        let mut item = MemoryItemBuilder::new(StorageTier::MediumTerm)
            .content("short lived")
            .conversation_id("conv-1")
            .ttl(Utc::now() + Duration::days(1))
            .build()
            .unwrap();

        assert!(!item.is_expired(Utc::now()));
        item.ttl = Some(Utc::now() - Duration::seconds(1));
        assert!(item.is_expired(Utc::now()));
    }

    #[test]
    fn test_is_test_data() {
        let flagged = MemoryItemBuilder::new(StorageTier::Recent)
            .content("fixture")
            .conversation_id("conv-1")
            .metadata("test", serde_json::Value::Bool(true))
            .build()
            .unwrap();
        assert!(flagged.is_test_data());

        let by_conversation = MemoryItemBuilder::new(StorageTier::Recent)
            .content("fixture")
            .conversation_id("test-123")
            .build()
            .unwrap();
        assert!(by_conversation.is_test_data());

        let normal = MemoryItemBuilder::new(StorageTier::Recent)
            .content("real content")
            .conversation_id("conv-1")
            .build()
            .unwrap();
        assert!(!normal.is_test_data());
    }

    #[test]
    fn test_wire_metadata() {
        let item = MemoryItemBuilder::new(StorageTier::Global)
            .content("user_location:Milan")
            .metadata("category", "personal".into())
            .metadata("dropped", serde_json::Value::Null)
            .build()
            .unwrap();

        let meta = item.wire_metadata();
        assert_eq!(meta.get("content").unwrap(), "user_location:Milan");
        assert_eq!(meta.get("storage_tier").unwrap(), "global");
        assert_eq!(meta.get("importance").unwrap(), "low");
        assert_eq!(meta.get("conversation_id").unwrap(), GLOBAL_SCOPE);
        assert_eq!(meta.get("category").unwrap(), "personal");
        assert!(!meta.contains_key("dropped"), "null values are filtered");
        assert!(!meta.contains_key("ttl"));
    }

    #[test]
    fn test_importance_ordering_and_weight() {
        assert!(ImportanceLevel::High > ImportanceLevel::Medium);
        assert!(ImportanceLevel::Medium > ImportanceLevel::Low);
        assert!(ImportanceLevel::High.weight() > ImportanceLevel::Medium.weight());
        assert_eq!(ImportanceLevel::from_label("high"), ImportanceLevel::High);
        assert_eq!(ImportanceLevel::from_label("bogus"), ImportanceLevel::Low);
    }
}
