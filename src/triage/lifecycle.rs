//! Model lifecycle — the trained/untrained mode switch.
//!
//! Two states, one transition: a successful retrain moves (or keeps) the
//! machine in trained mode. The only way back to untrained is deleting the
//! persisted state externally and restarting the process.
//!
//! The in-memory state is an immutable snapshot behind a `RwLock`; classify
//! clones the `Arc` out and works outside the lock, so a retrain in flight
//! is invisible until its single swap — no reader can observe a partially
//! updated vectorizer+classifier pair.

use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::{ModelStoreError, ServiceError};
use crate::model_store::ModelStore;
use crate::triage::classifier::{self, ClassifierState};
use crate::triage::rules::RuleEngine;
use crate::triage::types::{LabeledSample, Mode, PriorityTier};

pub struct ModelLifecycle {
    rules: RuleEngine,
    store: Arc<dyn ModelStore>,
    state: RwLock<Option<Arc<ClassifierState>>>,
}

impl ModelLifecycle {
    /// Start the lifecycle, loading any previously persisted state.
    ///
    /// A persisted state means starting directly in trained mode.
    pub async fn start(
        rules: RuleEngine,
        store: Arc<dyn ModelStore>,
    ) -> Result<Self, ModelStoreError> {
        let loaded = store.load().await?;
        match &loaded {
            Some(_) => info!("Loaded persisted classifier state — starting in trained mode"),
            None => info!("No persisted classifier state — starting in untrained mode"),
        }
        Ok(Self {
            rules,
            store,
            state: RwLock::new(loaded.map(Arc::new)),
        })
    }

    /// Current operating mode.
    pub fn mode(&self) -> Mode {
        if self.snapshot().is_some() {
            Mode::Trained
        } else {
            Mode::Untrained
        }
    }

    /// Classify a normalized text, dispatching on the current mode.
    pub fn classify(&self, normalized: &str) -> PriorityTier {
        self.classify_with_mode(normalized).0
    }

    /// Classify and report which mode made the decision, from one snapshot.
    pub fn classify_with_mode(&self, normalized: &str) -> (PriorityTier, Mode) {
        match self.snapshot() {
            Some(state) => (classifier::predict(normalized, &state), Mode::Trained),
            None => (self.rules.classify(normalized), Mode::Untrained),
        }
    }

    /// Refit from scratch on exactly the supplied samples and swap the state.
    ///
    /// Items whose label is not one of the three tiers are dropped; zero
    /// survivors fail with `NoValidLabels` and leave the state untouched.
    /// The new state is persisted before it replaces the old one, so a
    /// failure at any step keeps the previous state intact. Replacement is
    /// total — nothing from the previous fit is merged in.
    pub async fn retrain(&self, items: &[LabeledSample]) -> Result<(), ServiceError> {
        let mut texts = Vec::new();
        let mut labels = Vec::new();
        for item in items {
            let Some(tier) = item.tier() else {
                debug!(
                    email_id = %item.email_id,
                    label = %item.label,
                    "Dropping sample with unrecognized label"
                );
                continue;
            };
            texts.push(item.training_text());
            labels.push(tier);
        }

        if texts.is_empty() {
            return Err(ServiceError::NoValidLabels);
        }

        let state = classifier::fit(&texts, &labels)?;
        self.store.save(&state).await?;

        *self.state.write().unwrap() = Some(Arc::new(state));
        info!(samples = texts.len(), "Retrained classifier and swapped state");
        Ok(())
    }

    fn snapshot(&self) -> Option<Arc<ClassifierState>> {
        self.state.read().unwrap().clone()
    }
}
