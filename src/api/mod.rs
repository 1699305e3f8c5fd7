//! HTTP surface — axum routes over the triage service.

mod routes;

pub use routes::{ApiState, api_routes};
