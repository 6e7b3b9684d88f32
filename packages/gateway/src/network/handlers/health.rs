//! Health endpoint handler.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns registered service names and uptime as JSON.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let services = state.gateway.registry().names();
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "state": "ready",
        "services": services,
        "uptime_secs": uptime_secs,
    }))
}
