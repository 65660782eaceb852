//! Customer inquiry handlers.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{CreateInquiryRequest, CreateInquiryResponse, InquiryDetailResponse};
use crate::api::extract::{Authorized, ClientHeaders};
use crate::app_state::AppState;
use crate::domain::InquiryId;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /inquiries`: Submit an inquiry with a quoted configuration.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for missing contact fields,
/// [`GatewayError::Pricing`] if the configuration cannot be priced and
/// [`GatewayError::PricingNotAvailable`] before the first sync.
#[utoipa::path(
    post,
    path = "/api/v1/inquiries",
    tag = "Inquiries",
    summary = "Submit an inquiry",
    description = "Prices the configuration against the active snapshot and stores the inquiry with that price. The stored price never changes afterwards.",
    request_body = CreateInquiryRequest,
    responses(
        (status = 201, description = "Inquiry stored", body = CreateInquiryResponse),
        (status = 400, description = "Invalid contact data", body = ErrorResponse),
        (status = 404, description = "No sync has run yet", body = ErrorResponse),
        (status = 422, description = "Configuration cannot be priced", body = ErrorResponse),
    )
)]
pub async fn create_inquiry(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateInquiryRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let client = ClientHeaders::from_headers(&headers);
    let inquiry = state
        .inquiries
        .submit(req.into(), client.as_client_info())
        .await?;
    Ok((StatusCode::CREATED, Json(CreateInquiryResponse::from(&inquiry))))
}

/// `GET /inquiries/{id}`: Stored inquiry.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] without valid credentials and
/// [`GatewayError::InquiryNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/inquiries/{id}",
    tag = "Inquiries",
    summary = "Get an inquiry",
    description = "Returns the inquiry exactly as stored, including the breakdown frozen at submission.",
    params(
        ("id" = uuid::Uuid, Path, description = "Inquiry UUID"),
    ),
    responses(
        (status = 200, description = "Inquiry", body = InquiryDetailResponse),
        (status = 401, description = "Missing or wrong credentials", body = ErrorResponse),
        (status = 404, description = "Inquiry not found", body = ErrorResponse),
    )
)]
pub async fn get_inquiry(
    _auth: Authorized,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    let inquiry = state.inquiries.get(InquiryId::from_uuid(id)).await?;
    Ok(Json(InquiryDetailResponse {
        success: true,
        inquiry,
    }))
}

/// Inquiry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/inquiries", post(create_inquiry))
        .route("/inquiries/{id}", get(get_inquiry))
}
