//! Triage engine — the pure per-message decision function.
//!
//! No side effects: folder moves happen in the service layer. Two engines
//! observing the same classifier state return identical tiers for
//! identical input.

use std::sync::Arc;

use tracing::debug;

use crate::text;
use crate::triage::lifecycle::ModelLifecycle;
use crate::triage::types::{Mode, Triage};

/// Orchestrates one message end-to-end: normalize, summarize, classify.
#[derive(Clone)]
pub struct TriageEngine {
    lifecycle: Arc<ModelLifecycle>,
}

impl TriageEngine {
    pub fn new(lifecycle: Arc<ModelLifecycle>) -> Self {
        Self { lifecycle }
    }

    /// Decide the tier for a message given its subject and body.
    pub fn evaluate(&self, subject: &str, body: &str) -> Triage {
        let normalized = text::normalize(&format!("{subject} {body}"));
        let summary = text::summarize(&normalized, text::SUMMARY_SENTENCES);
        let (tier, mode) = self.lifecycle.classify_with_mode(&normalized);
        debug!(tier = %tier, mode = ?mode, "Triaged message");
        Triage { tier, summary, mode }
    }

    /// Current lifecycle mode.
    pub fn mode(&self) -> Mode {
        self.lifecycle.mode()
    }
}
