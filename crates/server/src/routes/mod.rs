//! API route handlers
//!
//! - `health`: liveness, readiness, metrics and metadata
//! - `search`: streaming search and cancellation

pub mod health;
pub mod search;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// # Response
///
/// ```json
/// {
///   "name": "fitscan",
///   "version": "0.1.0",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "fitscan",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /api/search/stream",
            "POST /api/search/cancel",
            "GET /api/metadata",
            "GET /health",
            "GET /ready",
            "GET /metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
