//! Importance classifier for scoring retention priority
//!
//! Deterministic, pure scoring over lexical signal groups. Each group that
//! matches contributes its weight once; filler matches dampen very short
//! messages; length adjustments and clamping produce the final score in
//! `[0, 1]`, mapped to an `ImportanceLevel` by the configured thresholds.

use crate::config::{ClassifierConfig, SignalGroup, SignalRule};
use crate::error::{Error, Result};
use crate::item::ImportanceLevel;
use regex::Regex;
use std::collections::BTreeSet;

/// Classification result for a message
#[derive(Debug, Clone)]
pub struct Classification {
    /// Importance level derived from the score
    pub level: ImportanceLevel,
    /// Final score in `[0, 1]`
    pub score: f32,
    /// Evidence of which signals fired, for explainability and testing
    pub evidence: Evidence,
}

/// Which signals fired during classification
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    /// Names of the individual rules that matched
    pub rules_matched: Vec<String>,
    /// Groups that contributed to the score (ordered, deduplicated)
    pub groups: BTreeSet<SignalGroup>,
    /// Length adjustments applied (`long_message` / `short_message`)
    pub length_factors: Vec<&'static str>,
}

impl Evidence {
    /// True if the given group fired
    pub fn has_group(&self, group: SignalGroup) -> bool {
        self.groups.contains(&group)
    }
}

struct CompiledRule {
    name: String,
    pattern: Regex,
    group: SignalGroup,
    weight: f32,
}

/// Rule-based importance classifier
pub struct ImportanceClassifier {
    rules: Vec<CompiledRule>,
    config: ClassifierConfig,
}

impl ImportanceClassifier {
    /// Compile the configured signal rules. Fails on an invalid pattern.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .map(|rule: &SignalRule| {
                let pattern = Regex::new(&rule.pattern).map_err(|e| {
                    Error::Config(format!(
                        "Invalid regex pattern for rule '{}': {}",
                        rule.name, e
                    ))
                })?;
                Ok(CompiledRule {
                    name: rule.name.clone(),
                    pattern,
                    group: rule.group,
                    weight: rule.weight,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules, config })
    }

    /// Classify a message for retention priority.
    ///
    /// Pure and deterministic: only which groups match affects the score,
    /// never the order of the rules. Multiple groups are additive before
    /// clamping.
    pub fn classify(&self, message: &str) -> Classification {
        let text = message.to_lowercase();
        let word_count = message.split_whitespace().count();

        let mut evidence = Evidence::default();
        let mut score = 0.0f32;
        let mut filler_dampening: Option<f32> = None;

        // Per-group contribution: the max weight among matched rules, once.
        for group in [
            SignalGroup::Personal,
            SignalGroup::Decision,
            SignalGroup::Technical,
            SignalGroup::Question,
            SignalGroup::Filler,
        ] {
            let mut group_weight: Option<f32> = None;
            for rule in self.rules.iter().filter(|r| r.group == group) {
                if rule.pattern.is_match(&text) {
                    evidence.rules_matched.push(rule.name.clone());
                    group_weight = Some(match group_weight {
                        Some(w) => w.max(rule.weight),
                        None => rule.weight,
                    });
                }
            }

            if let Some(weight) = group_weight {
                evidence.groups.insert(group);
                if group == SignalGroup::Filler {
                    filler_dampening = Some(weight);
                } else {
                    score += weight;
                }
            }
        }

        // Filler only drags down genuinely short messages.
        if let Some(dampening) = filler_dampening {
            if word_count <= 3 {
                score *= dampening;
            }
        }

        if word_count > self.config.long_message_words {
            score += self.config.long_message_bonus;
            evidence.length_factors.push("long_message");
        } else if word_count < self.config.short_message_words {
            score *= self.config.short_message_penalty;
            evidence.length_factors.push("short_message");
        }

        let score = score.clamp(0.0, 1.0);

        let level = if score >= self.config.high_threshold {
            ImportanceLevel::High
        } else if score >= self.config.medium_threshold {
            ImportanceLevel::Medium
        } else {
            ImportanceLevel::Low
        };

        Classification {
            level,
            score,
            evidence,
        }
    }
}
