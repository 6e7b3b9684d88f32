//! Envelope endpoint: decode, run through the hosting pipeline, encode.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tracing::{error, warn};

use super::AppState;

/// Handles `POST` requests carrying one encoded request envelope.
///
/// Per-message failures travel inside the reply envelope with status 200.
/// Transport-level problems map to HTTP statuses:
/// - undecodable body: 400
/// - over the concurrency limit: 503
/// - envelope deadline exceeded: 504
/// - aborted envelope task or encode failure: 500
pub async fn gateway_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let envelope = match state.codec.decode(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "rejecting undecodable envelope");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let reply = match state.pipeline.clone().oneshot(envelope).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "envelope not processed");
            return (e.status_code(), e.to_string()).into_response();
        }
    };

    match state.codec.encode(&reply) {
        Ok(bytes) => ([(CONTENT_TYPE, state.codec.content_type())], bytes).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode reply envelope");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
