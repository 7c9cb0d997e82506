//! HTTP ingest endpoint
//!
//! Accepts one batch per POST on any path. The body is a gzip stream of
//! newline-delimited JSON log lines; the response is the JSON array of
//! reconciliation actions.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Request, State},
    http::{Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use devdns_core::{BatchOrchestrator, ingest};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared handler state
pub struct AppState {
    pub orchestrator: BatchOrchestrator,
    pub max_decoded_bytes: usize,
}

/// Build the ingest router
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", any(ingest_batch))
        .route("/*path", any(ingest_batch))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// POST <any path> - decode a batch and reconcile it
///
/// The method is checked before the body is read, so a non-POST is always
/// 405 whatever its body size.
async fn ingest_batch(
    method: Method,
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Response {
    if method != Method::POST {
        warn!("Rejected {} request", method);
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "POST")],
            "Method Not Allowed",
        )
            .into_response();
    }

    let body = match Bytes::from_request(request, &state).await {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected batch body: {}", rejection.body_text());
            return rejection.into_response();
        }
    };

    let observations = match ingest::decode_batch(&body, state.max_decoded_bytes) {
        Ok(observations) => observations,
        Err(e) => {
            error!("Rejected batch: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                e.to_string(),
            )
                .into_response();
        }
    };

    let report = state.orchestrator.run(observations).await;
    info!(
        "Batch reconciled: {} action(s), {} unresolved, {} failed",
        report.actions.len(),
        report.unresolved,
        report.failed
    );

    Json(report.actions).into_response()
}
