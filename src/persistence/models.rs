//! Database models for sync runs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::pricing::PricingChange;

/// Outcome of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Every sheet parsed cleanly.
    Success,
    /// A snapshot was produced but rows or sheets were skipped.
    Partial,
    /// Nothing was written.
    Failed,
}

impl SyncStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown sync status: {other}")),
        }
    }
}

/// A row of the `pricing_sync_log` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    /// When the run started.
    pub synced_at: DateTime<Utc>,
    /// Who triggered it.
    pub triggered_by: String,
    /// Outcome.
    pub status: SyncStatus,
    /// Items added by the run.
    pub items_added: u32,
    /// Items updated by the run.
    pub items_updated: u32,
    /// Items removed by the run.
    pub items_removed: u32,
    /// Items left unchanged.
    pub items_unchanged: u32,
    /// Row, sheet and fatal errors.
    pub errors: Vec<String>,
    /// Item-level changes.
    pub changes: Vec<PricingChange>,
    /// Snapshot version written, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    /// Wall time of the run in milliseconds.
    pub duration_ms: u64,
}
