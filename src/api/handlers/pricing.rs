//! Pricing read and quote handlers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{PricingResponse, QuoteRequest, QuoteResponse};
use crate::app_state::AppState;
use crate::domain::Configuration;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::PricingLookup;

/// `GET /pricing`: Active pricing snapshot.
///
/// # Errors
///
/// Returns [`GatewayError::PricingNotAvailable`] before the first sync.
#[utoipa::path(
    get,
    path = "/api/v1/pricing",
    tag = "Pricing",
    summary = "Get current pricing",
    description = "Returns the active pricing snapshot, served from the in-memory cache while it is fresh. Never reads the spreadsheet.",
    responses(
        (status = 200, description = "Active snapshot", body = PricingResponse),
        (status = 404, description = "No sync has run yet", body = ErrorResponse),
    )
)]
pub async fn get_pricing(State(state): State<AppState>) -> Result<impl IntoResponse, GatewayError> {
    match state.pricing.current().await? {
        PricingLookup::Available { snapshot, cached } => {
            Ok(Json(PricingResponse::from_snapshot(&snapshot, cached)))
        }
        PricingLookup::NotSynced => Err(GatewayError::PricingNotAvailable),
    }
}

/// `POST /pricing/quote`: Price a configuration.
///
/// # Errors
///
/// Returns [`GatewayError::Pricing`] if the configuration cannot be priced
/// and [`GatewayError::PricingNotAvailable`] before the first sync.
#[utoipa::path(
    post,
    path = "/api/v1/pricing/quote",
    tag = "Pricing",
    summary = "Quote a configuration",
    description = "Runs the price calculator against the active snapshot and reports the snapshot version used.",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Price breakdown", body = QuoteResponse),
        (status = 404, description = "No sync has run yet", body = ErrorResponse),
        (status = 422, description = "Configuration cannot be priced", body = ErrorResponse),
    )
)]
pub async fn quote(
    State(state): State<AppState>,
    Json(req): Json<QuoteRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let configuration = Configuration::from(req.configuration);
    let quote = state.pricing.quote(&configuration).await?;
    Ok(Json(QuoteResponse::new(&quote.breakdown, quote.pricing_version)))
}

/// Pricing routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pricing", get(get_pricing))
        .route("/pricing/quote", post(quote))
}
