//! Customer inquiry records with the price frozen at submission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;
use super::calculator::PriceBreakdown;
use super::configuration::Configuration;

/// Type-safe inquiry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InquiryId(Uuid);

impl InquiryId {
    /// Creates a new random id (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing [`Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InquiryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InquiryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A submitted inquiry or order.
///
/// Immutable once stored: the breakdown and total are never recalculated,
/// even when pricing changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInquiry {
    /// Inquiry id.
    pub id: InquiryId,
    /// Analytics session the inquiry came from, if known.
    pub session_id: Option<String>,
    /// Customer name.
    pub name: String,
    /// Customer e-mail address.
    pub email: String,
    /// Free-text message.
    pub message: Option<String>,
    /// Configuration as submitted.
    pub configuration: Configuration,
    /// Price derivation at submission time.
    pub breakdown: PriceBreakdown,
    /// Total price at submission time.
    pub total_price: Cents,
    /// Pricing snapshot version the price was computed from.
    pub pricing_version: i64,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Minimal e-mail sanity check: one `@` with a dotted domain part.
#[must_use]
pub fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
