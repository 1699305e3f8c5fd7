//! Environment-derived configuration, validated at startup.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::triage::rules::RuleConfig;
use crate::triage::types::PriorityTier;

/// IMAP connection settings.
#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Tier → folder mapping, fixed for the process lifetime.
///
/// The LOW folder doubles as the recovery folder browsable for manual
/// promotion.
#[derive(Debug, Clone)]
pub struct FolderAssignment {
    pub high: String,
    pub medium: String,
    pub low: String,
}

impl Default for FolderAssignment {
    fn default() -> Self {
        Self {
            high: "AI_HIGH_PRIORITY".into(),
            medium: "AI_MEDIUM_PRIORITY".into(),
            low: "AI_LOW_PRIORITY_RECOVERY".into(),
        }
    }
}

impl FolderAssignment {
    /// Destination folder for a tier. Total — every tier has a folder.
    pub fn folder_for(&self, tier: PriorityTier) -> &str {
        match tier {
            PriorityTier::High => &self.high,
            PriorityTier::Medium => &self.medium,
            PriorityTier::Low => &self.low,
        }
    }

    pub fn all(&self) -> [String; 3] {
        [self.high.clone(), self.medium.clone(), self.low.clone()]
    }

    /// Folder names must be non-empty and pairwise distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [&self.high, &self.medium, &self.low];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "folders".into(),
                message: "folder names must be non-empty".into(),
            });
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(ConfigError::InvalidValue {
                key: "folders".into(),
                message: "folder names must be distinct".into(),
            });
        }
        Ok(())
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub imap: ImapConfig,
    pub folders: FolderAssignment,
    pub rules: RuleConfig,
    pub model_path: PathBuf,
    /// Source mailbox processed by triage runs.
    pub inbox: String,
    pub port: u16,
}

impl AppConfig {
    /// Build from environment variables. Missing credentials and malformed
    /// values are rejected here, before anything connects.
    pub fn from_env() -> Result<Self, ConfigError> {
        let username = std::env::var("EMAIL_USER")
            .map_err(|_| ConfigError::MissingEnvVar("EMAIL_USER".into()))?;
        let password = std::env::var("EMAIL_PASS")
            .map_err(|_| ConfigError::MissingEnvVar("EMAIL_PASS".into()))?;

        let imap = ImapConfig {
            host: env_or("IMAP_SERVER", "imap.gmail.com"),
            port: parse_env("IMAP_PORT", 993)?,
            username,
            password: SecretString::from(password),
        };

        let folders = FolderAssignment {
            high: env_or("FOLDER_HIGH", "AI_HIGH_PRIORITY"),
            medium: env_or("FOLDER_MEDIUM", "AI_MEDIUM_PRIORITY"),
            low: env_or("FOLDER_LOW", "AI_LOW_PRIORITY_RECOVERY"),
        };
        folders.validate()?;

        // Optional substituted rule vocabulary, as a JSON file.
        let rules = match std::env::var("RULES_FILE") {
            Ok(path) => load_rules(&path)?,
            Err(_) => RuleConfig::default(),
        };
        rules.validate()?;

        Ok(Self {
            imap,
            folders,
            rules,
            model_path: PathBuf::from(env_or("MODEL_FILE", "triage_model.json")),
            inbox: env_or("INBOX_FOLDER", "INBOX"),
            port: parse_env("PORT", 5000)?,
        })
    }
}

fn load_rules(path: &str) -> Result<RuleConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
        key: "RULES_FILE".into(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidValue {
        key: "RULES_FILE".into(),
        message: e.to_string(),
    })
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}
