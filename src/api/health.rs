use axum::{Json, extract::Query, extract::State as AxumState, response::IntoResponse};
use serde_json::json;
use std::collections::HashMap;

use crate::SharedState;

/// Root health check endpoint
/// Supports ?format=json for detailed JSON response
pub async fn root(
    AxumState(state): AxumState<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if params.get("format").map(String::as_str) == Some("json") {
        Json(json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "total_repositories": state.dispatcher.config().repository.len(),
            "status": "healthy"
        }))
        .into_response()
    } else {
        "push_deploy - healthy".into_response()
    }
}
