//! Triage service — the five mailbox-facing operations.
//!
//! Wires the decision engine to the mail store: sample collection, label
//! submission, inbox processing, recovery listing, and manual promotion.
//! Batch iteration is all-or-nothing: the first mail-store failure aborts
//! the remaining batch.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::FolderAssignment;
use crate::error::ServiceError;
use crate::mail::parse::{parse_mail, permalink};
use crate::mail::store::MailStore;
use crate::text;
use crate::triage::engine::TriageEngine;
use crate::triage::lifecycle::ModelLifecycle;
use crate::triage::types::{LabeledSample, Mode, PriorityTier, TierCounts, TrainingSample};

// ── Reports ─────────────────────────────────────────────────────────

/// A processed inbox item as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedItem {
    pub subject: String,
    pub summary: String,
    pub priority: PriorityTier,
    pub permalink: String,
}

/// A recovery-folder listing entry.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryItem {
    pub email_id: String,
    pub subject: String,
    pub summary: String,
    pub permalink: String,
}

/// Result of a [`TriageService::process_inbox`] run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub mode: Mode,
    pub moved_counts: TierCounts,
    pub items: Vec<ProcessedItem>,
}

/// Result of a [`TriageService::collect_samples`] run.
#[derive(Debug, Clone, Serialize)]
pub struct SamplePage {
    pub mode: Mode,
    pub samples: Vec<TrainingSample>,
}

// ── Service ─────────────────────────────────────────────────────────

pub struct TriageService {
    engine: TriageEngine,
    lifecycle: Arc<ModelLifecycle>,
    mail: Arc<dyn MailStore>,
    folders: FolderAssignment,
    inbox: String,
}

impl TriageService {
    pub fn new(
        lifecycle: Arc<ModelLifecycle>,
        mail: Arc<dyn MailStore>,
        folders: FolderAssignment,
        inbox: String,
    ) -> Self {
        Self {
            engine: TriageEngine::new(Arc::clone(&lifecycle)),
            lifecycle,
            mail,
            folders,
            inbox,
        }
    }

    /// Create the three tier folders if missing. Idempotent.
    pub async fn bootstrap_folders(&self) -> Result<(), ServiceError> {
        self.mail.ensure_folders(&self.folders.all()).await?;
        Ok(())
    }

    /// Fetch up to `limit` inbox messages since `start` as labeling
    /// candidates. Mutates nothing — messages stay where they are.
    pub async fn collect_samples(
        &self,
        start: NaiveDate,
        limit: usize,
    ) -> Result<SamplePage, ServiceError> {
        if limit == 0 {
            return Err(ServiceError::InvalidInput("limit must be positive".into()));
        }

        let ids = self.mail.search_since(&self.inbox, start).await?;
        let mut samples = Vec::new();
        for id in ids.iter().take(limit) {
            let raw = self.mail.fetch(&self.inbox, id).await?;
            let mail = parse_mail(id, &raw)?;
            let normalized = text::normalize(&format!("{} {}", mail.subject, mail.body));
            samples.push(TrainingSample {
                email_id: id.clone(),
                subject: mail.subject,
                summary: text::summarize(&normalized, text::SUMMARY_SENTENCES),
            });
        }

        info!(count = samples.len(), "Collected samples for labeling");
        Ok(SamplePage {
            mode: self.lifecycle.mode(),
            samples,
        })
    }

    /// Retrain from labeled samples. Invalid labels are dropped; zero valid
    /// entries fail with `NoValidLabels`.
    pub async fn submit_labels(&self, items: &[LabeledSample]) -> Result<(), ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::InvalidInput("no items provided".into()));
        }
        self.lifecycle.retrain(items).await
    }

    /// Classify every inbox message since `start` and copy it to its tier's
    /// folder, marking it seen. An empty search touches nothing; a failure
    /// on any message aborts the remaining batch.
    pub async fn process_inbox(&self, start: NaiveDate) -> Result<ProcessReport, ServiceError> {
        let mode = self.lifecycle.mode();
        let ids = self.mail.search_since(&self.inbox, start).await?;

        let mut counts = TierCounts::default();
        let mut items = Vec::with_capacity(ids.len());

        for id in &ids {
            let raw = self.mail.fetch(&self.inbox, id).await?;
            let mail = parse_mail(id, &raw)?;
            let triage = self.engine.evaluate(&mail.subject, &mail.body);

            let dest = self.folders.folder_for(triage.tier);
            self.mail.copy(&self.inbox, id, dest).await?;
            self.mail.mark_seen(&self.inbox, id).await?;

            counts.bump(triage.tier);
            items.push(ProcessedItem {
                subject: mail.subject,
                summary: triage.summary,
                priority: triage.tier,
                permalink: permalink(mail.message_id.as_deref()),
            });
        }

        if !ids.is_empty() {
            self.mail.expunge(&self.inbox).await?;
        }

        info!(
            total = items.len(),
            high = counts.high,
            medium = counts.medium,
            low = counts.low,
            "Processed inbox"
        );
        Ok(ProcessReport {
            mode,
            moved_counts: counts,
            items,
        })
    }

    /// List recovery-folder messages since `start` without touching them.
    pub async fn list_recovery(&self, start: NaiveDate) -> Result<Vec<RecoveryItem>, ServiceError> {
        let recovery = &self.folders.low;
        let ids = self.mail.search_since(recovery, start).await?;

        let mut items = Vec::with_capacity(ids.len());
        for id in &ids {
            let raw = self.mail.fetch(recovery, id).await?;
            let mail = parse_mail(id, &raw)?;
            let normalized = text::normalize(&format!("{} {}", mail.subject, mail.body));
            items.push(RecoveryItem {
                email_id: id.clone(),
                subject: mail.subject,
                summary: text::summarize(&normalized, text::SUMMARY_SENTENCES),
                permalink: permalink(mail.message_id.as_deref()),
            });
        }

        Ok(items)
    }

    /// Move a message out of the recovery folder into HIGH or MEDIUM:
    /// copy, mark the original deleted, expunge. Any mail-store failure in
    /// that sequence surfaces as `PromotionFailed` with the cause.
    pub async fn promote(&self, id: &str, new_tier: PriorityTier) -> Result<(), ServiceError> {
        if new_tier == PriorityTier::Low {
            return Err(ServiceError::InvalidInput(
                "promotion target must be HIGH or MEDIUM".into(),
            ));
        }

        let recovery = self.folders.low.clone();
        let dest = self.folders.folder_for(new_tier);

        let sequence = async {
            self.mail.copy(&recovery, id, dest).await?;
            self.mail.mark_deleted(&recovery, id).await?;
            self.mail.expunge(&recovery).await
        };
        sequence.await.map_err(|source| {
            warn!(id, error = %source, "Promotion failed");
            ServiceError::PromotionFailed {
                id: id.to_string(),
                source,
            }
        })?;

        info!(id, tier = %new_tier, "Promoted message from recovery");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{MailStoreError, ModelStoreError};
    use crate::model_store::ModelStore;
    use crate::triage::classifier::ClassifierState;
    use crate::triage::rules::RuleEngine;

    // ── In-memory collaborators ─────────────────────────────────────

    #[derive(Clone)]
    struct StoredMail {
        id: String,
        raw: Vec<u8>,
        deleted: bool,
    }

    /// In-memory mail store: folders of messages plus a mutation log.
    #[derive(Default)]
    struct MemoryMailStore {
        folders: Mutex<HashMap<String, Vec<StoredMail>>>,
        mutations: Mutex<Vec<String>>,
    }

    impl MemoryMailStore {
        fn seed(&self, folder: &str, id: &str, raw: Vec<u8>) {
            self.folders
                .lock()
                .unwrap()
                .entry(folder.to_string())
                .or_default()
                .push(StoredMail {
                    id: id.to_string(),
                    raw,
                    deleted: false,
                });
        }

        fn ids_in(&self, folder: &str) -> Vec<String> {
            self.folders
                .lock()
                .unwrap()
                .get(folder)
                .map(|msgs| msgs.iter().map(|m| m.id.clone()).collect())
                .unwrap_or_default()
        }

        fn mutation_count(&self) -> usize {
            self.mutations.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MailStore for MemoryMailStore {
        async fn search_since(
            &self,
            mailbox: &str,
            _since: NaiveDate,
        ) -> Result<Vec<String>, MailStoreError> {
            Ok(self.ids_in(mailbox))
        }

        async fn fetch(&self, mailbox: &str, id: &str) -> Result<Vec<u8>, MailStoreError> {
            self.folders
                .lock()
                .unwrap()
                .get(mailbox)
                .and_then(|msgs| msgs.iter().find(|m| m.id == id))
                .map(|m| m.raw.clone())
                .ok_or_else(|| MailStoreError::NotFound {
                    mailbox: mailbox.to_string(),
                    id: id.to_string(),
                })
        }

        async fn copy(&self, mailbox: &str, id: &str, dest: &str) -> Result<(), MailStoreError> {
            let mut folders = self.folders.lock().unwrap();
            let mail = folders
                .get(mailbox)
                .and_then(|msgs| msgs.iter().find(|m| m.id == id))
                .cloned()
                .ok_or_else(|| MailStoreError::NotFound {
                    mailbox: mailbox.to_string(),
                    id: id.to_string(),
                })?;
            folders.entry(dest.to_string()).or_default().push(StoredMail {
                deleted: false,
                ..mail
            });
            self.mutations
                .lock()
                .unwrap()
                .push(format!("copy {mailbox}/{id} -> {dest}"));
            Ok(())
        }

        async fn mark_seen(&self, mailbox: &str, id: &str) -> Result<(), MailStoreError> {
            self.mutations
                .lock()
                .unwrap()
                .push(format!("seen {mailbox}/{id}"));
            Ok(())
        }

        async fn mark_deleted(&self, mailbox: &str, id: &str) -> Result<(), MailStoreError> {
            let mut folders = self.folders.lock().unwrap();
            let mail = folders
                .get_mut(mailbox)
                .and_then(|msgs| msgs.iter_mut().find(|m| m.id == id))
                .ok_or_else(|| MailStoreError::NotFound {
                    mailbox: mailbox.to_string(),
                    id: id.to_string(),
                })?;
            mail.deleted = true;
            self.mutations
                .lock()
                .unwrap()
                .push(format!("delete {mailbox}/{id}"));
            Ok(())
        }

        async fn expunge(&self, mailbox: &str) -> Result<(), MailStoreError> {
            if let Some(msgs) = self.folders.lock().unwrap().get_mut(mailbox) {
                msgs.retain(|m| !m.deleted);
            }
            self.mutations
                .lock()
                .unwrap()
                .push(format!("expunge {mailbox}"));
            Ok(())
        }

        async fn ensure_folders(&self, folders: &[String]) -> Result<(), MailStoreError> {
            let mut map = self.folders.lock().unwrap();
            for folder in folders {
                map.entry(folder.clone()).or_default();
            }
            Ok(())
        }
    }

    struct NullModelStore;

    #[async_trait]
    impl ModelStore for NullModelStore {
        async fn load(&self) -> Result<Option<ClassifierState>, ModelStoreError> {
            Ok(None)
        }
        async fn save(&self, _state: &ClassifierState) -> Result<(), ModelStoreError> {
            Ok(())
        }
    }

    // ── Fixtures ────────────────────────────────────────────────────

    fn raw_mail(message_id: &str, subject: &str, body: &str) -> Vec<u8> {
        format!(
            "Message-ID: <{message_id}>\r\nFrom: sender@example.com\r\nSubject: {subject}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n"
        )
        .into_bytes()
    }

    async fn service() -> (Arc<MemoryMailStore>, TriageService) {
        let mail = Arc::new(MemoryMailStore::default());
        let lifecycle = Arc::new(
            ModelLifecycle::start(RuleEngine::default(), Arc::new(NullModelStore))
                .await
                .unwrap(),
        );
        let service = TriageService::new(
            lifecycle,
            Arc::clone(&mail) as _,
            FolderAssignment::default(),
            "INBOX".into(),
        );
        (mail, service)
    }

    fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    // ── process_inbox ───────────────────────────────────────────────

    #[tokio::test]
    async fn process_empty_inbox_touches_nothing() {
        let (mail, service) = service().await;

        let report = service.process_inbox(start_date()).await.unwrap();
        assert_eq!(report.moved_counts, TierCounts::default());
        assert!(report.items.is_empty());
        assert_eq!(mail.mutation_count(), 0);
    }

    #[tokio::test]
    async fn process_routes_messages_to_tier_folders() {
        let (mail, service) = service().await;
        mail.seed("INBOX", "1", raw_mail("m1@x", "URGENT: outage", "fix asap please"));
        mail.seed("INBOX", "2", raw_mail("m2@x", "Spring sale", "newsletter content"));

        let report = service.process_inbox(start_date()).await.unwrap();

        assert_eq!(report.mode, Mode::Untrained);
        assert_eq!(report.moved_counts.high, 1);
        assert_eq!(report.moved_counts.medium, 0);
        assert_eq!(report.moved_counts.low, 1);
        assert_eq!(report.items.len(), 2);

        assert_eq!(mail.ids_in("AI_HIGH_PRIORITY"), vec!["1"]);
        assert_eq!(mail.ids_in("AI_LOW_PRIORITY_RECOVERY"), vec!["2"]);
        assert_eq!(report.items[0].permalink, permalink(Some("m1@x")));
    }

    #[tokio::test]
    async fn process_marks_each_message_seen() {
        let (mail, service) = service().await;
        mail.seed("INBOX", "1", raw_mail("m1@x", "Meeting", "agenda attached"));

        service.process_inbox(start_date()).await.unwrap();

        let log = mail.mutations.lock().unwrap().clone();
        assert!(log.iter().any(|m| m == "seen INBOX/1"));
    }

    #[tokio::test]
    async fn process_reports_summary_from_normalized_text() {
        let (mail, service) = service().await;
        mail.seed(
            "INBOX",
            "1",
            raw_mail("m1@x", "Status", "First point. Second point. Third point."),
        );

        let report = service.process_inbox(start_date()).await.unwrap();
        assert_eq!(report.items[0].summary, "status first point. second point");
    }

    // ── collect_samples ─────────────────────────────────────────────

    #[tokio::test]
    async fn collect_respects_limit_and_mutates_nothing() {
        let (mail, service) = service().await;
        for i in 0..5 {
            mail.seed("INBOX", &i.to_string(), raw_mail("m@x", "Subject", "Body text."));
        }

        let page = service.collect_samples(start_date(), 3).await.unwrap();
        assert_eq!(page.samples.len(), 3);
        assert_eq!(page.mode, Mode::Untrained);
        assert_eq!(mail.mutation_count(), 0);
    }

    #[tokio::test]
    async fn collect_rejects_zero_limit() {
        let (_, service) = service().await;
        let err = service.collect_samples(start_date(), 0).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn collected_samples_are_normalized_and_summarized() {
        let (mail, service) = service().await;
        mail.seed(
            "INBOX",
            "1",
            raw_mail("m@x", "RE:  Hello", "One sentence. Two sentence. Three."),
        );

        let page = service.collect_samples(start_date(), 10).await.unwrap();
        let sample = &page.samples[0];
        assert_eq!(sample.email_id, "1");
        assert_eq!(sample.subject, "RE:  Hello");
        assert_eq!(sample.summary, "re: hello one sentence. two sentence");
    }

    // ── submit_labels ───────────────────────────────────────────────

    #[tokio::test]
    async fn submit_empty_items_is_invalid_input() {
        let (_, service) = service().await;
        let err = service.submit_labels(&[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn submit_then_process_uses_trained_model() {
        let (mail, service) = service().await;

        service
            .submit_labels(&[
                LabeledSample {
                    email_id: "a".into(),
                    subject: "URGENT: respond now".into(),
                    summary: "asap deadline".into(),
                    label: "HIGH".into(),
                },
                LabeledSample {
                    email_id: "b".into(),
                    subject: "50% off sale".into(),
                    summary: "newsletter unsubscribe".into(),
                    label: "LOW".into(),
                },
            ])
            .await
            .unwrap();

        mail.seed("INBOX", "1", raw_mail("m1@x", "urgent", "asap"));
        mail.seed("INBOX", "2", raw_mail("m2@x", "sale", "newsletter"));

        let report = service.process_inbox(start_date()).await.unwrap();
        assert_eq!(report.mode, Mode::Trained);
        assert_eq!(report.moved_counts.high, 1);
        assert_eq!(report.moved_counts.low, 1);
        assert_eq!(report.items[0].priority, PriorityTier::High);
        assert_eq!(report.items[1].priority, PriorityTier::Low);
    }

    // ── list_recovery ───────────────────────────────────────────────

    #[tokio::test]
    async fn list_recovery_reads_without_mutation() {
        let (mail, service) = service().await;
        mail.seed(
            "AI_LOW_PRIORITY_RECOVERY",
            "7",
            raw_mail("m7@x", "Old newsletter", "Content here."),
        );

        let items = service.list_recovery(start_date()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].email_id, "7");
        assert_eq!(items[0].subject, "Old newsletter");
        assert_eq!(mail.mutation_count(), 0);
    }

    // ── promote ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn promote_moves_message_out_of_recovery() {
        let (mail, service) = service().await;
        mail.seed(
            "AI_LOW_PRIORITY_RECOVERY",
            "7",
            raw_mail("m7@x", "Actually important", "please read"),
        );

        service.promote("7", PriorityTier::High).await.unwrap();

        assert_eq!(mail.ids_in("AI_HIGH_PRIORITY"), vec!["7"]);
        assert!(mail.ids_in("AI_LOW_PRIORITY_RECOVERY").is_empty());
    }

    #[tokio::test]
    async fn promote_missing_id_fails_and_leaves_recovery_intact() {
        let (mail, service) = service().await;
        mail.seed(
            "AI_LOW_PRIORITY_RECOVERY",
            "7",
            raw_mail("m7@x", "Still here", "content"),
        );

        let err = service.promote("999", PriorityTier::Medium).await.unwrap_err();
        assert!(matches!(err, ServiceError::PromotionFailed { .. }));
        assert_eq!(mail.ids_in("AI_LOW_PRIORITY_RECOVERY"), vec!["7"]);
        assert!(mail.ids_in("AI_MEDIUM_PRIORITY").is_empty());
    }

    #[tokio::test]
    async fn promote_to_low_is_invalid_input() {
        let (_, service) = service().await;
        let err = service.promote("1", PriorityTier::Low).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    // ── bootstrap ───────────────────────────────────────────────────

    #[tokio::test]
    async fn bootstrap_creates_tier_folders() {
        let (mail, service) = service().await;
        service.bootstrap_folders().await.unwrap();
        let folders = mail.folders.lock().unwrap();
        assert!(folders.contains_key("AI_HIGH_PRIORITY"));
        assert!(folders.contains_key("AI_MEDIUM_PRIORITY"));
        assert!(folders.contains_key("AI_LOW_PRIORITY_RECOVERY"));
    }
}
