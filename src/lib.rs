//! Mail triage — priority classification and folder routing for a mailbox.
//!
//! A trainable TF-IDF + logistic-regression classifier with a deterministic
//! keyword-rule fallback decides whether each message is HIGH, MEDIUM, or
//! LOW priority; the service layer enacts the decision by copying messages
//! into per-tier IMAP folders.

pub mod api;
pub mod config;
pub mod error;
pub mod mail;
pub mod model_store;
pub mod service;
pub mod text;
pub mod triage;
