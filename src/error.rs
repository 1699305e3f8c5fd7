//! Error types for mail-triage.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mail store error: {0}")]
    MailStore(#[from] MailStoreError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Model store error: {0}")]
    ModelStore(#[from] ModelStoreError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail store errors (IMAP transport and protocol).
#[derive(Debug, thiserror::Error)]
pub enum MailStoreError {
    #[error("Connection to {host} failed: {reason}")]
    Connect { host: String, reason: String },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("Authentication failed for {username}")]
    AuthFailed { username: String },

    #[error("Could not select mailbox {mailbox}: {reason}")]
    SelectFailed { mailbox: String, reason: String },

    #[error("IMAP {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Message {id} not found in {mailbox}")]
    NotFound { mailbox: String, id: String },

    #[error("Malformed message {id}: {reason}")]
    Malformed { id: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    TaskJoin(String),
}

/// Statistical classifier errors.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Training failed: {0}")]
    Training(String),
}

/// Model persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum ModelStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the triage service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No valid labels in submission")]
    NoValidLabels,

    #[error("Promotion of {id} failed: {source}")]
    PromotionFailed {
        id: String,
        #[source]
        source: MailStoreError,
    },

    #[error("Mail store error: {0}")]
    MailStore(#[from] MailStoreError),

    #[error("Model store error: {0}")]
    ModelStore(#[from] ModelStoreError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
