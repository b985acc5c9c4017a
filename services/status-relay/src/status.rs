//! Stream status endpoint logic
//!
//! Runs the aggregator for the configured logins and renders the presence
//! map as JSON. Any failure, auth or query, becomes a flat 500 with a fixed
//! message; the detail goes to the log, not to the browser.

use std::time::Instant;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stream_presence::StatusAggregator;
use tracing::{error, info, instrument};

use crate::metrics;

pub const STATUS_ROUTE: &str = "/stream-status";

/// User-facing message for every `/stream-status` failure
pub const STATUS_ERROR_MESSAGE: &str = "failed to fetch stream status";

/// JSON error response: `{"error":"..."}`
fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Build the presence response for the configured logins.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn stream_status(aggregator: &StatusAggregator, request_id: String) -> Response {
    let started = Instant::now();

    let response = match aggregator.check_configured().await {
        Ok(presence) => {
            let live = presence.values().filter(|live| **live).count();
            info!(live, total = presence.len(), "stream status served");
            (StatusCode::OK, Json(presence)).into_response()
        }
        Err(e) => {
            metrics::record_upstream_error(e.kind());
            error!(error = %e, kind = e.kind(), "stream status lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, STATUS_ERROR_MESSAGE)
        }
    };

    metrics::record_request(
        STATUS_ROUTE,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
