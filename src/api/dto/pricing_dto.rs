//! Pricing read and quote DTOs.
//!
//! Money is sent as integer cents; `formatted*` fields carry the display
//! string the configurator shows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::ConfigurationDto;
use crate::domain::calculator::LineItem;
use crate::domain::money::{FINANCING_MONTHS, format_eur, monthly_payment};
use crate::domain::{PriceBreakdown, PricingData, PricingSnapshot};

/// Response body for `GET /pricing`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricingResponse {
    /// Always `true`.
    pub success: bool,
    /// `category → itemKey → { name, price, onRequest?, squareMeters?, maxQuantity? }`.
    #[schema(value_type = Object)]
    pub data: PricingData,
    /// Served from the in-memory cache.
    pub cached: bool,
    /// Snapshot version.
    pub version: i64,
    /// When the snapshot was written.
    pub synced_at: DateTime<Utc>,
}

impl PricingResponse {
    /// Builds the response from the active snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &PricingSnapshot, cached: bool) -> Self {
        Self {
            success: true,
            data: snapshot.data.clone(),
            cached,
            version: snapshot.version,
            synced_at: snapshot.synced_at,
        }
    }
}

/// Request body for `POST /pricing/quote`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Configuration to price.
    pub configuration: ConfigurationDto,
}

/// One priced line.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDto {
    /// Pricing category.
    pub category: String,
    /// Item key.
    pub item_key: String,
    /// Display name.
    pub name: String,
    /// Price of one unit in cents.
    pub unit_price: i64,
    /// Units priced.
    pub quantity: u32,
    /// Line total in cents.
    pub price: i64,
}

impl From<&LineItem> for LineItemDto {
    fn from(item: &LineItem) -> Self {
        Self {
            category: item.category.clone(),
            item_key: item.item_key.clone(),
            name: item.name.clone(),
            unit_price: item.unit_price.get(),
            quantity: item.quantity,
            price: item.price.get(),
        }
    }
}

/// Response body for `POST /pricing/quote`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    /// Always `true`.
    pub success: bool,
    /// Snapshot version the quote was computed with.
    pub pricing_version: i64,
    /// Nest module price in cents.
    pub base_price: i64,
    /// Option lines.
    pub options: Vec<LineItemDto>,
    /// Total in cents.
    pub total_price: i64,
    /// Floor area of the nest module.
    pub square_meters: u32,
    /// Total per square meter in cents.
    pub price_per_square_meter: i64,
    /// Total as displayed, e.g. `"177.000 €"`.
    pub formatted_total: String,
    /// Indicative monthly financing payment in cents.
    pub monthly_payment: i64,
}

impl QuoteResponse {
    /// Builds the response from a breakdown.
    #[must_use]
    pub fn new(breakdown: &PriceBreakdown, pricing_version: i64) -> Self {
        Self {
            success: true,
            pricing_version,
            base_price: breakdown.base_price().get(),
            options: breakdown.options.iter().map(LineItemDto::from).collect(),
            total_price: breakdown.total_price.get(),
            square_meters: breakdown.square_meters,
            price_per_square_meter: breakdown.price_per_square_meter.get(),
            formatted_total: format_eur(breakdown.total_price),
            monthly_payment: monthly_payment(breakdown.total_price, FINANCING_MONTHS).get(),
        }
    }
}
