//! Shared types for the triage pipeline.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Priority tier ───────────────────────────────────────────────────

/// Priority tier — the triage outcome.
///
/// Exactly three tiers exist; classifier output is closed over this enum
/// by construction, so no fourth label can leak in from training data.
/// Ordered by severity for reporting: `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityTier {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "LOW")]
    Low,
}

impl PriorityTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    /// Severity rank used for ordering. Reporting only — never interpolated.
    fn severity(self) -> u8 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }
}

impl PartialOrd for PriorityTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a label that names none of the three tiers.
#[derive(Debug, thiserror::Error)]
#[error("invalid priority tier: {0}")]
pub struct InvalidTier(pub String);

impl FromStr for PriorityTier {
    type Err = InvalidTier;

    /// Case-insensitive; anything but the three tier names is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            other => Err(InvalidTier(other.to_string())),
        }
    }
}

// ── Tier counters ───────────────────────────────────────────────────

/// Per-tier counters for a processing run. Always reports all three tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    #[serde(rename = "HIGH")]
    pub high: usize,
    #[serde(rename = "MEDIUM")]
    pub medium: usize,
    #[serde(rename = "LOW")]
    pub low: usize,
}

impl TierCounts {
    pub fn bump(&mut self, tier: PriorityTier) {
        match tier {
            PriorityTier::High => self.high += 1,
            PriorityTier::Medium => self.medium += 1,
            PriorityTier::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

// ── Lifecycle mode ──────────────────────────────────────────────────

/// Operating mode of the model lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No fitted model — the rule engine decides.
    Untrained,
    /// A fitted model exists — the statistical classifier decides.
    Trained,
}

impl Mode {
    pub fn is_trained(self) -> bool {
        matches!(self, Self::Trained)
    }
}

// ── Samples ─────────────────────────────────────────────────────────

/// A candidate message offered for human labeling. Held in transit only,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    pub email_id: String,
    pub subject: String,
    pub summary: String,
}

/// A training sample plus its human-assigned label.
///
/// The label arrives as free text; anything that does not parse to a
/// [`PriorityTier`] is dropped before training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSample {
    pub email_id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub summary: String,
    pub label: String,
}

impl LabeledSample {
    /// Parsed tier, if the label names one of the three recognized tiers.
    pub fn tier(&self) -> Option<PriorityTier> {
        self.label.parse().ok()
    }

    /// Text used for fitting: normalized subject + summary.
    pub fn training_text(&self) -> String {
        crate::text::normalize(&format!("{} {}", self.subject, self.summary))
    }
}

// ── Triage outcome ──────────────────────────────────────────────────

/// Outcome of triaging a single message.
#[derive(Debug, Clone)]
pub struct Triage {
    pub tier: PriorityTier,
    pub summary: String,
    /// Which mode made the decision.
    pub mode: Mode,
}
