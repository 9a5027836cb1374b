//! Deterministic provider stubs shared by unit tests

use super::{
    EmbeddingMode, EmbeddingProvider, Exchange, ExtractedFact, FactExtractor, Summarizer,
};
use crate::error::{Error, Result};
use async_trait::async_trait;

const DIM: usize = 64;

/// Bag-of-words embedder: texts sharing words produce similar vectors.
/// Deterministic and mode-insensitive.
pub struct StubEmbedder;

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIM];
        for word in text.to_lowercase().split_whitespace() {
            let mut hash: u64 = 1469598103934665603;
            for byte in word.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            vector[(hash % DIM as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Embedder that never completes in time, for timeout paths
pub struct SlowEmbedder;

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(vec![0.0; DIM])
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Embedder that always fails, for provider-unavailable paths
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str, _mode: EmbeddingMode) -> Result<Vec<f32>> {
        Err(Error::Embedding("embedding provider unreachable".into()))
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Extractor scripted with `(needle, facts)` pairs: the first needle found
/// in the message yields its facts, otherwise nothing is extracted.
pub struct ScriptedExtractor {
    pub scripts: Vec<(String, Vec<ExtractedFact>)>,
}

impl ScriptedExtractor {
    pub fn empty() -> Self {
        Self { scripts: vec![] }
    }

    pub fn with(needle: &str, facts: Vec<(&str, &str, &str)>) -> Self {
        Self {
            scripts: vec![(
                needle.to_string(),
                facts
                    .into_iter()
                    .map(|(fact_type, value, category)| ExtractedFact {
                        fact_type: fact_type.to_string(),
                        value: value.to_string(),
                        category: category.to_string(),
                    })
                    .collect(),
            )],
        }
    }
}

#[async_trait]
impl FactExtractor for ScriptedExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<ExtractedFact>> {
        for (needle, facts) in &self.scripts {
            if text.contains(needle.as_str()) {
                return Ok(facts.clone());
            }
        }
        Ok(vec![])
    }
}

/// Extractor that never completes in time, for timeout paths
pub struct SlowExtractor;

#[async_trait]
impl FactExtractor for SlowExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<ExtractedFact>> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(vec![])
    }
}

/// Extractor that always fails, exercising the medium-term fallback
pub struct FailingExtractor;

#[async_trait]
impl FactExtractor for FailingExtractor {
    async fn extract(&self, _text: &str) -> Result<Vec<ExtractedFact>> {
        Err(Error::Oracle("extraction oracle unreachable".into()))
    }
}

/// Summarizer that produces a short deterministic digest
pub struct StubSummarizer;

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize(&self, exchanges: &[Exchange]) -> Result<String> {
        let first = exchanges
            .first()
            .map(|e| e.user.as_str())
            .unwrap_or_default();
        Ok(format!(
            "Summary of {} exchanges, starting with: {}",
            exchanges.len(),
            first
        ))
    }
}

/// Summarizer that never completes in time, for timeout paths
pub struct SlowSummarizer;

#[async_trait]
impl Summarizer for SlowSummarizer {
    async fn summarize(&self, _exchanges: &[Exchange]) -> Result<String> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

/// Summarizer that always fails, exercising the heuristic fallback
pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _exchanges: &[Exchange]) -> Result<String> {
        Err(Error::Oracle("summarization oracle unreachable".into()))
    }
}
