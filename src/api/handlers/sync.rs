//! Pricing sync trigger and status handlers (cron or admin only).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{SyncRequest, SyncResponse, SyncStatusResponse};
use crate::api::extract::Authorized;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /pricing/sync`: Pull the spreadsheet into a new snapshot.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] without valid credentials,
/// [`GatewayError::SyncInProgress`] while another sync runs and
/// [`GatewayError::SourceUnavailable`] if the spreadsheet is unreachable.
#[utoipa::path(
    post,
    path = "/api/v1/pricing/sync",
    tag = "Pricing",
    summary = "Trigger a pricing sync",
    description = "Reads every pricing sheet, diffs it against the active snapshot and writes a new version if anything changed (or `forceRefresh` is set). Requires the cron secret (`Authorization: Bearer`) or the admin password (`x-admin-password`).",
    request_body(content = SyncRequest, description = "Optional; an empty body syncs without `forceRefresh`"),
    responses(
        (status = 200, description = "Sync report", body = SyncResponse),
        (status = 401, description = "Missing or wrong credentials", body = ErrorResponse),
        (status = 409, description = "A sync is already running", body = ErrorResponse),
        (status = 502, description = "Spreadsheet unreachable", body = ErrorResponse),
    )
)]
pub async fn trigger_sync(
    Authorized(caller): Authorized,
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> Result<impl IntoResponse, GatewayError> {
    let Json(req) = body.unwrap_or_default();
    let report = state
        .sync
        .sync_pricing(req.force_refresh, caller.as_str())
        .await?;
    Ok(Json(SyncResponse::from(report)))
}

/// `GET /pricing/sync/status`: Last sync run.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] without valid credentials.
#[utoipa::path(
    get,
    path = "/api/v1/pricing/sync/status",
    tag = "Pricing",
    summary = "Last sync run",
    description = "Returns the most recent entry of the sync log, including failed runs.",
    responses(
        (status = 200, description = "Last sync log entry", body = SyncStatusResponse),
        (status = 401, description = "Missing or wrong credentials", body = ErrorResponse),
    )
)]
pub async fn sync_status(
    _auth: Authorized,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    let last_sync = state.sync.last_sync().await?;
    Ok(Json(SyncStatusResponse {
        success: true,
        last_sync,
    }))
}

/// Sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pricing/sync", post(trigger_sync))
        .route("/pricing/sync/status", get(sync_status))
}
