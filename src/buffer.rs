//! Bounded recency buffer with FIFO eviction
//!
//! A capacity-limited, most-recent-first store of turns shared process-wide.
//! All mutation goes through one `RwLock`, so concurrent turns across
//! conversations serialize their appends. The buffer is a cache, never the
//! source of truth: evicted items are simply dropped, and anything that must
//! survive is persisted independently.

use crate::item::MemoryItem;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of a buffer push
#[derive(Debug)]
pub struct PushOutcome {
    /// The evicted oldest item, if the buffer was already full
    pub evicted: Option<MemoryItem>,
    /// True only on the push that fills the buffer to capacity.
    ///
    /// Edge-triggered: subsequent pushes against a full buffer do not set
    /// this again until the buffer has been emptied and refilled.
    pub just_filled: bool,
}

/// A lexical match from the buffer
#[derive(Debug, Clone)]
pub struct BufferMatch {
    /// The matched item
    pub item: MemoryItem,
    /// Normalized word-overlap score in `(0, 1]`
    pub score: f32,
}

/// Bounded, in-process, most-recent-first store of turns
pub struct RecencyBuffer {
    inner: Arc<RwLock<BufferInner>>,
}

struct BufferInner {
    /// front = oldest, back = newest
    items: VecDeque<MemoryItem>,
    capacity: usize,
}

impl RecencyBuffer {
    /// Create a buffer holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(BufferInner {
                items: VecDeque::with_capacity(capacity),
                capacity,
            })),
        }
    }

    /// Append an item, evicting the oldest if at capacity
    pub async fn push(&self, item: MemoryItem) -> PushOutcome {
        let mut inner = self.inner.write().await;

        let evicted = if inner.items.len() >= inner.capacity {
            inner.items.pop_front()
        } else {
            None
        };

        inner.items.push_back(item);
        let just_filled = evicted.is_none() && inner.items.len() == inner.capacity;

        PushOutcome {
            evicted,
            just_filled,
        }
    }

    /// Score buffered items by lexical word overlap with the query.
    ///
    /// The score is the intersection size over the query word-set size;
    /// zero-overlap items are excluded, test data is skipped, and ties
    /// break toward the most recent item.
    pub async fn search(
        &self,
        query: &str,
        conversation_id: Option<&str>,
    ) -> Vec<BufferMatch> {
        let query_words: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if query_words.is_empty() {
            return Vec::new();
        }

        let inner = self.inner.read().await;
        let mut results = Vec::new();

        // Most recent first, so equal scores keep recency order after the
        // stable sort below.
        for item in inner.items.iter().rev() {
            if let Some(conv) = conversation_id {
                if item.conversation_id != conv {
                    continue;
                }
            }
            if item.is_test_data() {
                continue;
            }

            let content_words: HashSet<String> = item
                .content
                .to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            let overlap = query_words.intersection(&content_words).count();
            if overlap == 0 {
                continue;
            }

            results.push(BufferMatch {
                item: item.clone(),
                score: overlap as f32 / query_words.len() as f32,
            });
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    /// Clone the current contents, oldest first.
    ///
    /// The compactor works from this snapshot so it never iterates the
    /// buffer while other turns mutate it.
    pub async fn snapshot(&self) -> Vec<MemoryItem> {
        self.inner.read().await.items.iter().cloned().collect()
    }

    /// Current number of buffered items
    pub async fn len(&self) -> usize {
        self.inner.read().await.items.len()
    }

    /// True if no items are buffered
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.items.is_empty()
    }

    /// Configured capacity
    pub async fn capacity(&self) -> usize {
        self.inner.read().await.capacity
    }

    /// Drop all buffered items
    pub async fn clear(&self) {
        self.inner.write().await.items.clear();
    }
}
