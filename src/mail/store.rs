//! Mail store boundary — the narrow async contract the service consumes.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::MailStoreError;

/// Abstract mailbox operations. Pure I/O, no triage logic.
///
/// Folder creation is idempotent by contract: `ensure_folders` on an
/// already-existing folder is a no-op, not an error.
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Ids of messages in `mailbox` received on or after `since`.
    async fn search_since(
        &self,
        mailbox: &str,
        since: NaiveDate,
    ) -> Result<Vec<String>, MailStoreError>;

    /// Raw RFC 822 bytes of one message.
    async fn fetch(&self, mailbox: &str, id: &str) -> Result<Vec<u8>, MailStoreError>;

    /// Copy a message into another folder.
    async fn copy(&self, mailbox: &str, id: &str, dest: &str) -> Result<(), MailStoreError>;

    /// Set the `\Seen` flag.
    async fn mark_seen(&self, mailbox: &str, id: &str) -> Result<(), MailStoreError>;

    /// Set the `\Deleted` flag.
    async fn mark_deleted(&self, mailbox: &str, id: &str) -> Result<(), MailStoreError>;

    /// Permanently remove `\Deleted` messages from `mailbox`.
    async fn expunge(&self, mailbox: &str) -> Result<(), MailStoreError>;

    /// Create any missing folders; existing ones are left untouched.
    async fn ensure_folders(&self, folders: &[String]) -> Result<(), MailStoreError>;
}
