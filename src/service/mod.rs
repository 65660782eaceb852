//! Service layer: business logic orchestration.
//!
//! - [`PricingSyncService`] pulls the spreadsheet into versioned snapshots.
//! - [`PricingService`] serves the active snapshot through [`PricingCache`]
//!   and prices configurations.
//! - [`AnalyticsService`] buffers client events and flushes them to the
//!   analytics store.
//! - [`InquiryService`] records customer inquiries with a frozen quote.

pub mod analytics;
pub mod background;
pub mod inquiry_service;
pub mod pricing_cache;
pub mod pricing_service;
pub mod pricing_sync;

pub use analytics::{AnalyticsService, FlushReport, NewEvent, SessionSummary};
pub use inquiry_service::{InquiryService, NewInquiry};
pub use pricing_cache::PricingCache;
pub use pricing_service::{PricingLookup, PricingService, Quote};
pub use pricing_sync::{PricingSyncService, SyncReport};
