//! Keyword-scored deterministic fallback classifier.
//!
//! Always available — used whenever no trained model exists. Scores a
//! normalized text by keyword presence and maps the score to a tier:
//! score ≥ 3 → HIGH, 1 ≤ score < 3 → MEDIUM, otherwise LOW.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::triage::types::PriorityTier;

/// Score at or above which a text is HIGH priority.
const HIGH_THRESHOLD: i32 = 3;

/// Score at or above which a text is at least MEDIUM priority.
const MEDIUM_THRESHOLD: i32 = 1;

/// Keyword vocabulary and weights for the rule engine.
///
/// This is configuration, not domain truth: a substituted vocabulary needs
/// no code change. Each keyword scores at most once per text — presence
/// test, not occurrence count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Keywords that push a message toward HIGH.
    pub urgent: Vec<String>,
    /// Keywords for service/transactional mail.
    pub service: Vec<String>,
    /// Keywords for promotional mail.
    pub promotional: Vec<String>,
    /// Score added when an urgent keyword is present.
    pub urgent_weight: i32,
    /// Score added when a service keyword is present.
    pub service_weight: i32,
    /// Score added when a promotional keyword is present.
    pub promotional_weight: i32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            urgent: ["urgent", "asap", "deadline", "action required"]
                .map(String::from)
                .to_vec(),
            service: ["invoice", "meeting", "support", "request"]
                .map(String::from)
                .to_vec(),
            promotional: ["offer", "sale", "newsletter", "unsubscribe"]
                .map(String::from)
                .to_vec(),
            urgent_weight: 3,
            service_weight: 2,
            promotional_weight: -3,
        }
    }
}

impl RuleConfig {
    /// Reject blank keywords — an empty string is a substring of everything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for keyword in self
            .urgent
            .iter()
            .chain(&self.service)
            .chain(&self.promotional)
        {
            if keyword.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "keywords".into(),
                    message: "keyword entries must be non-empty".into(),
                });
            }
        }
        Ok(())
    }
}

/// Deterministic keyword-scoring classifier. Pure function of its config.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: RuleConfig,
}

impl RuleEngine {
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    /// Classify a normalized text. Never fails, never suspends.
    pub fn classify(&self, normalized: &str) -> PriorityTier {
        let score = self.score(normalized);
        let tier = if score >= HIGH_THRESHOLD {
            PriorityTier::High
        } else if score >= MEDIUM_THRESHOLD {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        };
        debug!(score, tier = %tier, "Rule engine classified text");
        tier
    }

    /// Keyword score: each present keyword contributes its set's weight once.
    pub(crate) fn score(&self, text: &str) -> i32 {
        let hits = |words: &[String], weight: i32| -> i32 {
            words.iter().filter(|w| text.contains(w.as_str())).count() as i32 * weight
        };
        hits(&self.config.urgent, self.config.urgent_weight)
            + hits(&self.config.service, self.config.service_weight)
            + hits(&self.config.promotional, self.config.promotional_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_urgent_keyword_is_high() {
        let engine = RuleEngine::default();
        assert_eq!(engine.classify("please reply asap"), PriorityTier::High);
    }

    #[test]
    fn multi_word_urgent_keyword_matches_as_substring() {
        let engine = RuleEngine::default();
        assert_eq!(
            engine.classify("action required before friday"),
            PriorityTier::High
        );
    }

    #[test]
    fn single_service_keyword_is_medium() {
        let engine = RuleEngine::default();
        assert_eq!(engine.classify("agenda for the meeting"), PriorityTier::Medium);
    }

    #[test]
    fn promotional_keyword_is_low() {
        let engine = RuleEngine::default();
        assert_eq!(engine.classify("weekly newsletter"), PriorityTier::Low);
    }

    #[test]
    fn neutral_text_is_low() {
        let engine = RuleEngine::default();
        assert_eq!(engine.classify("hello there"), PriorityTier::Low);
    }

    #[test]
    fn urgent_and_promotional_cancel_out() {
        let engine = RuleEngine::default();
        // +3 urgent, -3 promotional → 0 → LOW
        assert_eq!(engine.classify("urgent sale today"), PriorityTier::Low);
    }

    #[test]
    fn keyword_counts_once_per_text() {
        let engine = RuleEngine::default();
        // If "urgent" scored per occurrence this would be 6 - 3 = 3 → HIGH;
        // presence scoring gives 3 - 3 = 0 → LOW.
        assert_eq!(engine.score("urgent urgent sale"), 0);
        assert_eq!(engine.classify("urgent urgent sale"), PriorityTier::Low);
    }

    #[test]
    fn two_service_keywords_reach_high() {
        let engine = RuleEngine::default();
        // invoice + support = 4 → HIGH
        assert_eq!(
            engine.classify("invoice attached, contact support"),
            PriorityTier::High
        );
    }

    #[test]
    fn urgent_without_promotional_scores_at_least_high_threshold() {
        let engine = RuleEngine::default();
        for text in ["urgent", "deadline tomorrow", "asap please", "action required now"] {
            assert!(engine.score(text) >= 3, "score for {text:?}");
            assert_eq!(engine.classify(text), PriorityTier::High);
        }
    }

    #[test]
    fn classification_is_pure() {
        let engine = RuleEngine::default();
        let text = "urgent invoice for the meeting";
        let first = engine.classify(text);
        for _ in 0..10 {
            assert_eq!(engine.classify(text), first);
        }
    }

    #[test]
    fn substituted_vocabulary_needs_no_code_change() {
        let config = RuleConfig {
            urgent: vec!["emergencia".into()],
            service: vec!["factura".into()],
            promotional: vec!["boletín".into()],
            ..RuleConfig::default()
        };
        let engine = RuleEngine::new(config);
        assert_eq!(engine.classify("emergencia en producción"), PriorityTier::High);
        assert_eq!(engine.classify("factura adjunta"), PriorityTier::Medium);
        assert_eq!(engine.classify("urgent"), PriorityTier::Low);
    }

    #[test]
    fn config_rejects_blank_keyword() {
        let config = RuleConfig {
            urgent: vec!["urgent".into(), "  ".into()],
            ..RuleConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(RuleConfig::default().validate().is_ok());
    }
}
