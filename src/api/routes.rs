//! REST endpoints for the triage operations.
//!
//! Payload validation happens here, before any mail-store or classifier
//! call: malformed dates, missing fields, and invalid tiers are client
//! errors with no side effects.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::ServiceError;
use crate::service::TriageService;
use crate::triage::types::{LabeledSample, PriorityTier};

/// Shared state for API routes.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<TriageService>,
}

/// Build the API router.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/api/train", post(collect_samples))
        .route("/api/label", post(submit_labels))
        .route("/api/process", post(process_inbox))
        .route("/api/recovery", post(list_recovery))
        .route("/api/promote", post(promote))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Error mapping ───────────────────────────────────────────────────

/// Maps service errors onto HTTP statuses: client errors are 400, mail
/// store failures 502, everything else 500.
struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ServiceError::InvalidInput(_)
            | ServiceError::NoValidLabels
            | ServiceError::Classifier(_) => StatusCode::BAD_REQUEST,
            ServiceError::MailStore(_) => StatusCode::BAD_GATEWAY,
            ServiceError::PromotionFailed { .. } | ServiceError::ModelStore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError(ServiceError::InvalidInput(format!(
            "invalid start_date '{raw}', expected YYYY-MM-DD"
        )))
    })
}

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CollectRequest {
    start_date: String,
    #[serde(default)]
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct LabelRequest {
    #[serde(default)]
    items: Vec<LabeledSample>,
}

#[derive(Debug, Deserialize)]
struct DateRequest {
    start_date: String,
}

#[derive(Debug, Deserialize)]
struct PromoteRequest {
    email_id: String,
    new_priority: String,
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /api/train — collect labeling candidates since a date.
async fn collect_samples(
    State(state): State<ApiState>,
    Json(req): Json<CollectRequest>,
) -> Result<Response, ApiError> {
    let start = parse_date(&req.start_date)?;
    let page = state.service.collect_samples(start, req.limit).await?;
    Ok(Json(json!({
        "ml_ready": page.mode.is_trained(),
        "samples": page.samples,
        "message": format!("Collected {} samples for labeling", page.samples.len()),
    }))
    .into_response())
}

/// POST /api/label — submit labeled samples and retrain.
async fn submit_labels(
    State(state): State<ApiState>,
    Json(req): Json<LabelRequest>,
) -> Result<Response, ApiError> {
    state.service.submit_labels(&req.items).await?;
    Ok(Json(json!({
        "ml_ready": true,
        "message": "Model trained and saved",
    }))
    .into_response())
}

/// POST /api/process — triage and move every inbox message since a date.
async fn process_inbox(
    State(state): State<ApiState>,
    Json(req): Json<DateRequest>,
) -> Result<Response, ApiError> {
    let start = parse_date(&req.start_date)?;
    let report = state.service.process_inbox(start).await?;
    Ok(Json(json!({
        "ml_ready": report.mode.is_trained(),
        "moved_counts": report.moved_counts,
        "items": report.items,
    }))
    .into_response())
}

/// POST /api/recovery — list recovery-folder messages since a date.
async fn list_recovery(
    State(state): State<ApiState>,
    Json(req): Json<DateRequest>,
) -> Result<Response, ApiError> {
    let start = parse_date(&req.start_date)?;
    let items = state.service.list_recovery(start).await?;
    Ok(Json(json!({ "items": items })).into_response())
}

/// POST /api/promote — move a recovery message to HIGH or MEDIUM.
async fn promote(
    State(state): State<ApiState>,
    Json(req): Json<PromoteRequest>,
) -> Result<Response, ApiError> {
    if req.email_id.trim().is_empty() {
        return Err(ApiError(ServiceError::InvalidInput(
            "email_id is required".into(),
        )));
    }
    let tier: PriorityTier = req.new_priority.parse().map_err(|_| {
        ApiError(ServiceError::InvalidInput(format!(
            "new_priority must be HIGH or MEDIUM, got '{}'",
            req.new_priority
        )))
    })?;
    if tier == PriorityTier::Low {
        return Err(ApiError(ServiceError::InvalidInput(
            "new_priority must be HIGH or MEDIUM".into(),
        )));
    }

    state.service.promote(&req.email_id, tier).await?;
    Ok(Json(json!({
        "message": format!("Email promoted to {tier}"),
    }))
    .into_response())
}
