//! Analytics flush trigger (cron or admin only).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::FlushResponse;
use crate::api::extract::Authorized;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST|GET /analytics/flush`: Move buffered events to the analytics store.
///
/// Per-session failures are reported in the body; the request itself
/// succeeds.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] without valid credentials and
/// [`GatewayError::FlushInProgress`] while another flush runs.
#[utoipa::path(
    method(get, post),
    path = "/api/v1/analytics/flush",
    tag = "Analytics",
    summary = "Flush buffered analytics events",
    description = "Moves every pending session's buffered events into the analytics store. A failing session keeps its events for the next run.",
    responses(
        (status = 200, description = "Flush report", body = FlushResponse),
        (status = 401, description = "Missing or wrong credentials", body = ErrorResponse),
        (status = 409, description = "A flush is already running", body = ErrorResponse),
    )
)]
pub async fn flush_analytics(
    Authorized(caller): Authorized,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let report = state.analytics.flush().await?;
    tracing::info!(
        triggered_by = caller.as_str(),
        sessions_flushed = report.sessions_flushed,
        events_flushed = report.events_flushed,
        failed = report.errors.len(),
        "analytics flush completed"
    );
    Ok(Json(FlushResponse::from(report)))
}

/// Analytics routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/analytics/flush", get(flush_analytics).post(flush_analytics))
}
