use std::sync::Arc;

use mail_triage::api::{ApiState, api_routes};
use mail_triage::config::AppConfig;
use mail_triage::mail::imap::ImapMailStore;
use mail_triage::model_store::FsModelStore;
use mail_triage::service::TriageService;
use mail_triage::triage::lifecycle::ModelLifecycle;
use mail_triage::triage::rules::RuleEngine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    let model_store = Arc::new(FsModelStore::new(config.model_path.clone()));
    let lifecycle = Arc::new(
        ModelLifecycle::start(RuleEngine::new(config.rules.clone()), model_store).await?,
    );

    eprintln!("📬 mail-triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   IMAP: {}:{}", config.imap.host, config.imap.port);
    eprintln!(
        "   Folders: {} / {} / {}",
        config.folders.high, config.folders.medium, config.folders.low
    );
    eprintln!("   Model: {} ({:?})", config.model_path.display(), lifecycle.mode());
    eprintln!("   API: http://0.0.0.0:{}/api\n", config.port);

    let mail = Arc::new(ImapMailStore::new(config.imap.clone()));
    let service = Arc::new(TriageService::new(
        Arc::clone(&lifecycle),
        mail,
        config.folders.clone(),
        config.inbox.clone(),
    ));

    // Tier folders are created up front; creating an existing folder is a
    // no-op. A failure here is not fatal — the first processing request
    // will surface the underlying mail-store problem.
    if let Err(e) = service.bootstrap_folders().await {
        tracing::warn!(error = %e, "Could not ensure tier folders at startup");
    }

    let app = api_routes(ApiState { service });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "mail-triage API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
