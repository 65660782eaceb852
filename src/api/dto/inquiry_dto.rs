//! Customer inquiry DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common_dto::ConfigurationDto;
use crate::domain::CustomerInquiry;
use crate::service::NewInquiry;

/// Request body for `POST /inquiries`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryRequest {
    /// Configurator session the inquiry came from.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Customer name.
    pub name: String,
    /// Customer e-mail address.
    pub email: String,
    /// Free-text message.
    #[serde(default)]
    pub message: Option<String>,
    /// Configuration to quote.
    pub configuration: ConfigurationDto,
}

impl From<CreateInquiryRequest> for NewInquiry {
    fn from(req: CreateInquiryRequest) -> Self {
        Self {
            session_id: req.session_id,
            name: req.name,
            email: req.email,
            message: req.message,
            configuration: req.configuration.into(),
        }
    }
}

/// Response body for `POST /inquiries` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInquiryResponse {
    /// Always `true`.
    pub success: bool,
    /// Id of the stored inquiry.
    pub inquiry_id: Uuid,
    /// Quoted total in cents.
    pub total_price: i64,
    /// Snapshot version the quote was computed with.
    pub pricing_version: i64,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl From<&CustomerInquiry> for CreateInquiryResponse {
    fn from(inquiry: &CustomerInquiry) -> Self {
        Self {
            success: true,
            inquiry_id: *inquiry.id.as_uuid(),
            total_price: inquiry.total_price.get(),
            pricing_version: inquiry.pricing_version,
            created_at: inquiry.created_at,
        }
    }
}

/// Response body for `GET /inquiries/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct InquiryDetailResponse {
    /// Always `true`.
    pub success: bool,
    /// The record as stored, including the frozen breakdown.
    #[schema(value_type = Object)]
    pub inquiry: CustomerInquiry,
}
