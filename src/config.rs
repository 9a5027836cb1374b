//! Recall configuration management
//!
//! All tuning constants of the memory subsystem live here, including the
//! importance signal tables. Rules are plain data so deployments can tune
//! scoring without code changes.

use serde::{Deserialize, Serialize};

/// Main recall configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum number of items held in the recency buffer
    pub recent_buffer_size: usize,

    /// Minimum similarity score for persistent matches to be returned
    pub similarity_threshold: f32,

    /// Days a medium-term memory survives before expiring
    pub medium_term_ttl_days: i64,

    /// Minimum number of paired exchanges required before compaction runs
    pub min_exchanges_to_compact: usize,

    /// Timeout for external provider calls, in seconds
    pub provider_timeout_secs: u64,

    /// Importance classifier configuration
    pub classifier: ClassifierConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recent_buffer_size: 50,
            similarity_threshold: 0.25,
            medium_term_ttl_days: 30,
            min_exchanges_to_compact: 5,
            provider_timeout_secs: 5,
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Importance classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Signal rules, grouped by `SignalGroup`
    pub rules: Vec<SignalRule>,

    /// Score at or above which a message is `High` importance
    pub high_threshold: f32,

    /// Score at or above which a message is `Medium` importance
    pub medium_threshold: f32,

    /// Word count above which a message earns the long-message bonus
    pub long_message_words: usize,

    /// Additive bonus for long messages
    pub long_message_bonus: f32,

    /// Word count below which a message takes the short-message penalty
    pub short_message_words: usize,

    /// Multiplicative penalty for very short messages
    pub short_message_penalty: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_signal_rules(),
            high_threshold: 0.7,
            medium_threshold: 0.4,
            long_message_words: 20,
            long_message_bonus: 0.2,
            short_message_words: 5,
            short_message_penalty: 0.8,
        }
    }
}

/// A single lexical signal rule
///
/// Rules in the same group contribute their weight once per message: the
/// group fires if any of its patterns match, and the maximum weight among
/// the matched rules is added to the score. For the `Filler` group the
/// weight is instead a dampening multiplier applied to short messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRule {
    /// Rule name, recorded in classification evidence
    pub name: String,
    /// Regex pattern, matched case-insensitively against the message
    pub pattern: String,
    /// Signal group this rule belongs to
    pub group: SignalGroup,
    /// Group weight (or dampening factor for `Filler`)
    pub weight: f32,
}

impl SignalRule {
    fn new(name: &str, pattern: &str, group: SignalGroup, weight: f32) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            group,
            weight,
        }
    }
}

/// Signal groups recognized by the importance classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalGroup {
    /// Personal disclosures (name, home, preferences, health)
    Personal,
    /// Decisions, commitments, things to remember
    Decision,
    /// Technical or project content
    Technical,
    /// Questions
    Question,
    /// Greetings, acknowledgements, small talk
    Filler,
}

impl SignalGroup {
    /// Lowercase label used in evidence and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalGroup::Personal => "personal",
            SignalGroup::Decision => "decision",
            SignalGroup::Technical => "technical",
            SignalGroup::Question => "question",
            SignalGroup::Filler => "filler",
        }
    }
}

/// Default signal rules for the importance classifier
pub fn default_signal_rules() -> Vec<SignalRule> {
    use SignalGroup::*;

    vec![
        // Personal disclosures
        SignalRule::new("name_disclosure", r"\bmy name\b", Personal, 0.8),
        SignalRule::new("occupation", r"\bi work (as|at|in)\b", Personal, 0.8),
        SignalRule::new("residence", r"\bi live (in|at)\b", Personal, 0.8),
        SignalRule::new("age", r"\bi('| a)m \d+ years old\b", Personal, 0.8),
        SignalRule::new("birth", r"\bi was born\b", Personal, 0.8),
        SignalRule::new("study", r"\bi study\b", Personal, 0.8),
        SignalRule::new("preference", r"\bi (love|like|hate|prefer|enjoy)\b", Personal, 0.8),
        SignalRule::new("hobby", r"\bmy (hobby|passion)\b", Personal, 0.8),
        SignalRule::new("allergy", r"\bi('m| am) allergic\b", Personal, 0.8),
        SignalRule::new("diet", r"\bi can('|no)t eat\b", Personal, 0.8),
        // Decisions and commitments
        SignalRule::new("decision_verb", r"\bi (decided?|choose|chose|want|need|must)\b", Decision, 0.6),
        SignalRule::new("remember_me", r"\bremember\b", Decision, 0.6),
        SignalRule::new("important", r"\bimportant\b", Decision, 0.6),
        SignalRule::new("dont_forget", r"\bdon('|no)t forget\b", Decision, 0.6),
        SignalRule::new("plan", r"\b(plan|goal|strategy|deadline)\b", Decision, 0.6),
        // Technical content
        SignalRule::new("tech_nouns", r"\b(project|code|api|database|function|algorithm|architecture)\b", Technical, 0.4),
        SignalRule::new("tech_trouble", r"\b(error|bug|problem|solution|crash)\b", Technical, 0.4),
        // Questions
        SignalRule::new("how_question", r"\bhow\b.*\?", Question, 0.3),
        SignalRule::new("why_question", r"\bwhy\b.*\?", Question, 0.3),
        SignalRule::new("where_question", r"\bwhere\b.*\?", Question, 0.3),
        SignalRule::new("when_question", r"\bwhen\b.*\?", Question, 0.3),
        SignalRule::new("what_question", r"\bwhat\b.*\?", Question, 0.3),
        SignalRule::new("which_question", r"\bwhich\b.*\?", Question, 0.3),
        // Filler: weight is a dampening multiplier for short messages
        SignalRule::new("greeting", r"\b(hello|hi|hey|bye|goodbye)\b", Filler, 0.3),
        SignalRule::new("acknowledgement", r"\b(thanks|thank you|ok|okay|yes|no|sure|perfect|got it)\b", Filler, 0.3),
    ]
}
