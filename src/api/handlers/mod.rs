//! REST endpoint handlers organized by resource.

pub mod analytics;
pub mod inquiries;
pub mod pricing;
pub mod sessions;
pub mod sync;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(pricing::routes())
        .merge(sync::routes())
        .merge(sessions::routes())
        .merge(analytics::routes())
        .merge(inquiries::routes())
}
