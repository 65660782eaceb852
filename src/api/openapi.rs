//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use super::dto;
use super::handlers::{analytics, inquiries, pricing, sessions, sync, system};
use crate::error::ErrorResponse;

/// OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "nest-pricing-gateway",
        description = "Pricing sync, price calculation, analytics buffering and inquiries for the Nest configurator."
    ),
    paths(
        pricing::get_pricing,
        pricing::quote,
        sync::trigger_sync,
        sync::sync_status,
        sessions::record_event,
        sessions::update_status,
        sessions::get_session,
        analytics::flush_analytics,
        inquiries::create_inquiry,
        inquiries::get_inquiry,
        system::health_handler,
    ),
    components(schemas(
        ErrorResponse,
        dto::SelectionDto,
        dto::ConfigurationDto,
        dto::PricingResponse,
        dto::QuoteRequest,
        dto::QuoteResponse,
        dto::LineItemDto,
        dto::SyncRequest,
        dto::SyncResponse,
        dto::SyncStatusResponse,
        dto::EventRequest,
        dto::EventAcceptedResponse,
        dto::StatusRequest,
        dto::SessionResponse,
        dto::FlushResponse,
        dto::CreateInquiryRequest,
        dto::CreateInquiryResponse,
        dto::InquiryDetailResponse,
    )),
    tags(
        (name = "Pricing", description = "Pricing snapshot, quotes and sync"),
        (name = "Sessions", description = "Configurator session tracking"),
        (name = "Analytics", description = "Event buffer flush"),
        (name = "Inquiries", description = "Customer inquiries"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;
