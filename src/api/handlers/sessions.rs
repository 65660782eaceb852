//! Configurator session handlers: event intake and lifecycle.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{EventAcceptedResponse, EventRequest, SessionResponse, StatusRequest};
use crate::api::extract::{Authorized, ClientHeaders};
use crate::app_state::AppState;
use crate::domain::SessionStatus;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /sessions/{id}/events`: Buffer one interaction event.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for a malformed session id or
/// event and [`GatewayError::BufferError`] if the buffer is unreachable.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/events",
    tag = "Sessions",
    summary = "Record an interaction event",
    description = "Appends the event to the session's buffer. Events reach the analytics store with the next flush.",
    params(
        ("id" = String, Path, description = "Client session id"),
    ),
    request_body = EventRequest,
    responses(
        (status = 202, description = "Event buffered", body = EventAcceptedResponse),
        (status = 400, description = "Invalid session id or event", body = ErrorResponse),
        (status = 500, description = "Buffer unavailable", body = ErrorResponse),
    )
)]
pub async fn record_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<EventRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let event = state.analytics.record_event(&session_id, req.into()).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EventAcceptedResponse {
            success: true,
            event_id: event.id,
        }),
    ))
}

/// `PATCH /sessions/{id}/status`: Move a session through its lifecycle.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for an unknown status and
/// [`GatewayError::InvalidTransition`] if the lifecycle forbids the change.
#[utoipa::path(
    patch,
    path = "/api/v1/sessions/{id}/status",
    tag = "Sessions",
    summary = "Update session status",
    description = "Applies a lifecycle transition (ACTIVE, IN_CART, COMPLETED, ABANDONED, CONVERTED). Creates the session record if it has not been flushed yet.",
    params(
        ("id" = String, Path, description = "Client session id"),
    ),
    request_body = StatusRequest,
    responses(
        (status = 200, description = "Updated session", body = SessionResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 422, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let status = SessionStatus::from_str(req.status.trim()).map_err(GatewayError::InvalidRequest)?;
    let client = ClientHeaders::from_headers(&headers);
    let session = state
        .analytics
        .update_status(&session_id, status, client.as_client_info())
        .await?;
    Ok(Json(SessionResponse::from(session)))
}

/// `GET /sessions/{id}`: Stored session with its event count.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] without valid credentials and
/// [`GatewayError::SessionNotFound`] for a session that was never stored.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    tag = "Sessions",
    summary = "Get a stored session",
    description = "Returns the session as persisted by the last flush or status update. Buffered events that have not been flushed are not counted.",
    params(
        ("id" = String, Path, description = "Client session id"),
    ),
    responses(
        (status = 200, description = "Session", body = SessionResponse),
        (status = 401, description = "Missing or wrong credentials", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
    )
)]
pub async fn get_session(
    _auth: Authorized,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, GatewayError> {
    let summary = state.analytics.session(&session_id).await?;
    Ok(Json(SessionResponse::from(summary)))
}

/// Session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/events", post(record_event))
        .route("/sessions/{id}/status", patch(update_status))
}
