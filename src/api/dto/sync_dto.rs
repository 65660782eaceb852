//! Pricing sync trigger and status DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::pricing::PricingChange;
use crate::persistence::SyncLog;
use crate::service::SyncReport;

/// Optional request body for `POST /pricing/sync`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Write a new snapshot even if nothing changed.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Response body for `POST /pricing/sync`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// `false` when any sheet or row error was recorded.
    pub success: bool,
    /// Items whose price, name or on-request flag changed.
    pub items_updated: u32,
    /// Items new in this run.
    pub items_added: u32,
    /// Items gone in this run.
    pub items_removed: u32,
    /// Items identical to the previous snapshot.
    pub items_unchanged: u32,
    /// Sheet and row errors.
    pub errors: Vec<String>,
    /// Item-level changes.
    #[schema(value_type = Vec<Object>)]
    pub changes: Vec<PricingChange>,
    /// Active snapshot version after the run.
    pub version: i64,
    /// Whether a new snapshot was written.
    pub written: bool,
    /// Run time in milliseconds.
    pub duration: u64,
}

impl From<SyncReport> for SyncResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            success: report.errors.is_empty(),
            items_updated: report.items_updated,
            items_added: report.items_added,
            items_removed: report.items_removed,
            items_unchanged: report.items_unchanged,
            errors: report.errors,
            changes: report.changes,
            version: report.version,
            written: report.written,
            duration: report.duration_ms,
        }
    }
}

/// Response body for `GET /pricing/sync/status`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    /// Always `true`.
    pub success: bool,
    /// Most recent sync run, `null` before the first one.
    #[schema(value_type = Option<Object>)]
    pub last_sync: Option<SyncLog>,
}
