//! Customer inquiries with the quoted price frozen at submission.

use std::sync::Arc;

use super::pricing_service::PricingService;
use crate::domain::inquiry::looks_like_email;
use crate::domain::session::validate_session_id;
use crate::domain::{Clock, Configuration, CustomerInquiry, InquiryId};
use crate::error::GatewayError;
use crate::persistence::{AnalyticsStore, ClientInfo, InquiryStore};

/// Maximum length of the free-text message.
pub const MAX_MESSAGE_LEN: usize = 5_000;

/// Fields of a new inquiry as submitted by the customer.
#[derive(Debug, Clone)]
pub struct NewInquiry {
    /// Configurator session the inquiry came from.
    pub session_id: Option<String>,
    /// Customer name.
    pub name: String,
    /// Customer e-mail address.
    pub email: String,
    /// Optional message.
    pub message: Option<String>,
    /// The house configuration to quote.
    pub configuration: Configuration,
}

/// Creates and loads inquiries.
#[derive(Debug, Clone)]
pub struct InquiryService {
    pricing: Arc<PricingService>,
    inquiries: Arc<dyn InquiryStore>,
    analytics: Arc<dyn AnalyticsStore>,
    clock: Arc<dyn Clock>,
}

impl InquiryService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        pricing: Arc<PricingService>,
        inquiries: Arc<dyn InquiryStore>,
        analytics: Arc<dyn AnalyticsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pricing,
            inquiries,
            analytics,
            clock,
        }
    }

    /// Prices the configuration against the active snapshot and stores the
    /// inquiry with that price and snapshot version.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::InvalidRequest`] for missing or malformed fields.
    /// - [`GatewayError::PricingNotAvailable`] before the first sync.
    /// - [`GatewayError::Pricing`] if the configuration cannot be priced.
    /// - [`GatewayError::PersistenceError`] on storage failure.
    pub async fn submit(
        &self,
        inquiry: NewInquiry,
        client: ClientInfo<'_>,
    ) -> Result<CustomerInquiry, GatewayError> {
        let name = inquiry.name.trim();
        if name.is_empty() {
            return Err(GatewayError::InvalidRequest("name must not be empty".to_string()));
        }
        let email = inquiry.email.trim();
        if !looks_like_email(email) {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid e-mail address '{email}'"
            )));
        }
        let message = inquiry
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        if message.as_ref().is_some_and(|m| m.chars().count() > MAX_MESSAGE_LEN) {
            return Err(GatewayError::InvalidRequest(format!(
                "message longer than {MAX_MESSAGE_LEN} characters"
            )));
        }
        if let Some(session_id) = inquiry.session_id.as_deref() {
            validate_session_id(session_id).map_err(GatewayError::InvalidRequest)?;
        }

        let quote = self.pricing.quote(&inquiry.configuration).await?;
        let now = self.clock.now();

        if let Some(session_id) = inquiry.session_id.as_deref() {
            self.analytics.ensure_session(session_id, client, now).await?;
        }

        let record = CustomerInquiry {
            id: InquiryId::new(),
            session_id: inquiry.session_id,
            name: name.to_string(),
            email: email.to_string(),
            message,
            configuration: inquiry.configuration,
            total_price: quote.breakdown.total_price,
            breakdown: quote.breakdown,
            pricing_version: quote.pricing_version,
            created_at: now,
        };
        self.inquiries.insert(&record).await?;

        if let Some(session_id) = record.session_id.as_deref() {
            self.analytics
                .set_total_price(session_id, record.total_price, now)
                .await?;
        }

        tracing::info!(
            inquiry_id = %record.id,
            total_price = record.total_price.get(),
            pricing_version = record.pricing_version,
            "inquiry stored"
        );
        Ok(record)
    }

    /// Loads a stored inquiry exactly as it was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InquiryNotFound`] for an unknown id.
    pub async fn get(&self, id: InquiryId) -> Result<CustomerInquiry, GatewayError> {
        self.inquiries
            .get(id)
            .await?
            .ok_or(GatewayError::InquiryNotFound(*id.as_uuid()))
    }
}
