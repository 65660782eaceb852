//! # nest-pricing-gateway
//!
//! HTTP backend for the Nest modular-house configurator.
//!
//! The service owns two data pipelines and one record type:
//!
//! - **Pricing**: a spreadsheet is synced into versioned snapshots in
//!   PostgreSQL, served through an in-memory cache and consumed by a pure
//!   price calculator.
//! - **Analytics**: configurator events are buffered in Redis and flushed
//!   periodically into PostgreSQL.
//! - **Inquiries**: a configuration stored together with the price quoted
//!   for it at submission time.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── PricingSyncService / PricingService / AnalyticsService /
//!     │   InquiryService (service/)
//!     ├── Calculator, pricing data, sessions (domain/)
//!     │
//!     ├── SheetSource (sheets/)       ── Google Sheets
//!     ├── EventBuffer (buffer/)       ── Redis
//!     └── *Store traits (persistence/) ── PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod buffer;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod sheets;
