//! Spreadsheet → snapshot synchronisation.
//!
//! A run fetches every mapped sheet, parses rows into a fresh dataset,
//! diffs it against the active snapshot and, if anything changed (or a
//! refresh is forced), writes the dataset as the next snapshot version.
//! Every run is appended to the sync log, failed ones included.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use super::pricing_cache::PricingCache;
use crate::domain::pricing::{ChangeAction, PricingChange, diff};
use crate::domain::{Clock, PricingData};
use crate::error::GatewayError;
use crate::persistence::{SnapshotStore, SyncLog, SyncStatus};
use crate::sheets::{SheetMapping, SheetSource, SourceError, default_mappings, parse_sheet};

/// Result of a successful sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Items whose price, name or flags changed.
    pub items_updated: u32,
    /// New items.
    pub items_added: u32,
    /// Items no longer in the source.
    pub items_removed: u32,
    /// Items identical to the active snapshot.
    pub items_unchanged: u32,
    /// Skipped rows and unreadable sheets.
    pub errors: Vec<String>,
    /// Item-level changes.
    pub changes: Vec<PricingChange>,
    /// Active snapshot version after the run.
    pub version: i64,
    /// `true` if the run wrote a new snapshot.
    pub written: bool,
    /// Wall time of the run in milliseconds.
    pub duration_ms: u64,
}

/// Runs pricing syncs, one at a time per process.
#[derive(Debug)]
pub struct PricingSyncService {
    source: Arc<dyn SheetSource>,
    store: Arc<dyn SnapshotStore>,
    cache: Arc<PricingCache>,
    clock: Arc<dyn Clock>,
    mappings: Vec<SheetMapping>,
    running: Mutex<()>,
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl PricingSyncService {
    /// Creates the service with the default sheet layout.
    #[must_use]
    pub fn new(
        source: Arc<dyn SheetSource>,
        store: Arc<dyn SnapshotStore>,
        cache: Arc<PricingCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            cache,
            clock,
            mappings: default_mappings(),
            running: Mutex::new(()),
        }
    }

    /// Replaces the sheet layout.
    #[must_use]
    pub fn with_mappings(mut self, mappings: Vec<SheetMapping>) -> Self {
        self.mappings = mappings;
        self
    }

    /// Most recent sync run, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    pub async fn last_sync(&self) -> Result<Option<SyncLog>, GatewayError> {
        self.store.last_sync().await
    }

    /// Runs one sync.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::SyncInProgress`] if another run is active.
    /// - [`GatewayError::SourceUnavailable`] if the spreadsheet cannot be
    ///   reached; the previous snapshot stays active.
    /// - [`GatewayError::MissingCategories`] if a required category has no
    ///   rows and no previous data to fall back on.
    /// - [`GatewayError::PersistenceError`] if the snapshot cannot be
    ///   written; nothing is committed.
    pub async fn sync_pricing(
        &self,
        force_refresh: bool,
        triggered_by: &str,
    ) -> Result<SyncReport, GatewayError> {
        let Ok(_running) = self.running.try_lock() else {
            return Err(GatewayError::SyncInProgress);
        };

        let started_at = self.clock.now();
        let timer = Instant::now();
        tracing::info!(triggered_by, force_refresh, "pricing sync started");

        match self.run(force_refresh, triggered_by, started_at, timer).await {
            Ok(report) => Ok(report),
            Err((err, errors)) => {
                let mut errors = errors;
                errors.push(err.to_string());
                let log = SyncLog {
                    synced_at: started_at,
                    triggered_by: triggered_by.to_string(),
                    status: SyncStatus::Failed,
                    items_added: 0,
                    items_updated: 0,
                    items_removed: 0,
                    items_unchanged: 0,
                    errors,
                    changes: Vec::new(),
                    version: None,
                    duration_ms: elapsed_ms(timer),
                };
                self.record(&log).await;
                tracing::error!(triggered_by, error = %err, "pricing sync failed");
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        force_refresh: bool,
        triggered_by: &str,
        started_at: DateTime<Utc>,
        timer: Instant,
    ) -> Result<SyncReport, (GatewayError, Vec<String>)> {
        let previous = self.store.latest().await.map_err(|e| (e, Vec::new()))?;
        let mut errors = Vec::new();
        let mut data = PricingData::new();

        for mapping in &self.mappings {
            let reason = match self.source.fetch_rows(&mapping.sheet).await {
                Ok(rows) => {
                    let parsed = parse_sheet(mapping, &rows);
                    errors.extend(parsed.errors);
                    if parsed.items.is_empty() {
                        format!("sheet '{}' has no valid rows", mapping.sheet)
                    } else {
                        data.insert_category(mapping.category.clone(), parsed.items);
                        continue;
                    }
                }
                Err(SourceError::Unavailable(reason)) => {
                    return Err((GatewayError::SourceUnavailable(reason), errors));
                }
                Err(err @ SourceError::Sheet { .. }) => err.to_string(),
            };

            let carried = previous
                .as_ref()
                .and_then(|s| s.data.category(&mapping.category))
                .filter(|items| !items.is_empty());
            match carried {
                Some(items) => {
                    tracing::warn!(sheet = %mapping.sheet, %reason, "keeping previous category data");
                    errors.push(format!("{reason}; kept previous '{}' data", mapping.category));
                    data.insert_category(mapping.category.clone(), items.clone());
                }
                None => {
                    tracing::warn!(sheet = %mapping.sheet, %reason, "sheet skipped");
                    errors.push(reason);
                }
            }
        }

        let missing = data.missing_required();
        if !missing.is_empty() {
            return Err((GatewayError::MissingCategories(missing.join(", ")), errors));
        }

        let empty = PricingData::new();
        let old = previous.as_ref().map_or(&empty, |s| &s.data);
        let changes = diff(old, &data);

        let unchanged_source = previous.is_some() && changes.is_empty();
        let (version, written) = match &previous {
            Some(prev) if unchanged_source && !force_refresh => (prev.version, false),
            _ => {
                let snapshot = self
                    .store
                    .save_snapshot(&data, triggered_by, started_at)
                    .await
                    .map_err(|e| (e, errors.clone()))?;
                self.cache.invalidate().await;
                (snapshot.version, true)
            }
        };

        let report = SyncReport {
            items_updated: count(changes.count(ChangeAction::Updated)),
            items_added: count(changes.count(ChangeAction::Added)),
            items_removed: count(changes.count(ChangeAction::Removed)),
            items_unchanged: count(changes.unchanged),
            errors,
            changes: changes.changes,
            version,
            written,
            duration_ms: elapsed_ms(timer),
        };

        let log = SyncLog {
            synced_at: started_at,
            triggered_by: triggered_by.to_string(),
            status: if report.errors.is_empty() {
                SyncStatus::Success
            } else {
                SyncStatus::Partial
            },
            items_added: report.items_added,
            items_updated: report.items_updated,
            items_removed: report.items_removed,
            items_unchanged: report.items_unchanged,
            errors: report.errors.clone(),
            changes: report.changes.clone(),
            version: written.then_some(version),
            duration_ms: report.duration_ms,
        };
        self.record(&log).await;

        tracing::info!(
            version,
            written,
            items_added = report.items_added,
            items_updated = report.items_updated,
            items_removed = report.items_removed,
            items_unchanged = report.items_unchanged,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "pricing sync finished"
        );
        Ok(report)
    }

    async fn record(&self, log: &SyncLog) {
        if let Err(e) = self.store.record_sync(log).await {
            tracing::warn!(error = %e, "could not record sync run");
        }
    }
}

fn elapsed_ms(timer: Instant) -> u64 {
    u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{Cents, SystemClock};
    use crate::persistence::MemorySnapshotStore;
    use crate::sheets::{CellValue, StaticSheetSource};

    fn mappings() -> Vec<SheetMapping> {
        vec![
            SheetMapping::simple("Nest", "nest").with_square_meters(3),
            SheetMapping::simple("Gebaeudehuelle", "gebaeudehuelle"),
            SheetMapping::simple("Innenverkleidung", "innenverkleidung"),
            SheetMapping::simple("Fussboden", "fussboden"),
            SheetMapping::simple("Fenster", "fenster"),
        ]
    }

    fn row(key: &str, name: &str, price: f64) -> Vec<CellValue> {
        vec![key.into(), name.into(), price.into()]
    }

    fn source() -> StaticSheetSource {
        StaticSheetSource::new()
            .with_rows(
                "Nest",
                vec![
                    vec!["nest80".into(), "Nest 80".into(), 177_000.0.into(), 75.0.into()],
                    vec!["nest100".into(), "Nest 100".into(), 213_000.0.into(), 95.0.into()],
                ],
            )
            .with_rows("Gebaeudehuelle", vec![row("trapezblech", "Trapezblech", 0.0)])
            .with_rows("Innenverkleidung", vec![row("kiefer", "Kiefer", 0.0)])
            .with_rows("Fussboden", vec![row("parkett", "Parkett", 0.0)])
            .with_rows("Fenster", vec![row("holz", "Holz", 400.0)])
    }

    struct Harness {
        source: Arc<StaticSheetSource>,
        store: Arc<MemorySnapshotStore>,
        service: PricingSyncService,
    }

    fn harness() -> Harness {
        let source = Arc::new(source());
        let store = Arc::new(MemorySnapshotStore::new(10));
        let cache = Arc::new(PricingCache::new(Duration::seconds(300), Arc::new(SystemClock)));
        let service = PricingSyncService::new(
            Arc::clone(&source) as Arc<dyn SheetSource>,
            Arc::clone(&store) as Arc<dyn SnapshotStore>,
            cache,
            Arc::new(SystemClock),
        )
        .with_mappings(mappings());
        Harness {
            source,
            store,
            service,
        }
    }

    #[tokio::test]
    async fn first_sync_writes_version_one_in_cents() {
        let h = harness();
        let Ok(report) = h.service.sync_pricing(false, "test").await else {
            panic!("sync should succeed");
        };
        assert!(report.written);
        assert_eq!(report.version, 1);
        assert_eq!(report.items_added, 6);
        assert!(report.errors.is_empty());

        let latest = h.store.latest().await.ok().flatten();
        let price = latest.and_then(|s| s.data.entry("nest", "nest80").map(|e| e.price));
        assert_eq!(price, Some(Cents::new(17_700_000)));
    }

    #[tokio::test]
    async fn unchanged_source_is_idempotent() {
        let h = harness();
        assert!(h.service.sync_pricing(false, "test").await.is_ok());
        let Ok(second) = h.service.sync_pricing(false, "test").await else {
            panic!("sync should succeed");
        };
        assert!(!second.written);
        assert_eq!(
            (second.items_added, second.items_updated, second.items_removed),
            (0, 0, 0)
        );
        assert_eq!(second.items_unchanged, 6);
        assert_eq!(h.store.versions().await, vec![1]);
    }

    #[tokio::test]
    async fn force_refresh_writes_identical_version() {
        let h = harness();
        assert!(h.service.sync_pricing(false, "test").await.is_ok());
        let Ok(forced) = h.service.sync_pricing(true, "admin").await else {
            panic!("sync should succeed");
        };
        assert!(forced.written);
        assert_eq!(forced.version, 2);
        assert!(forced.changes.is_empty());
    }

    #[tokio::test]
    async fn price_change_is_reported_as_update() {
        let h = harness();
        assert!(h.service.sync_pricing(false, "test").await.is_ok());
        h.source.set_rows("Fenster", vec![row("holz", "Holz", 450.0)]).await;

        let Ok(report) = h.service.sync_pricing(false, "test").await else {
            panic!("sync should succeed");
        };
        assert_eq!(report.items_updated, 1);
        assert_eq!(report.version, 2);
        let change = report.changes.first();
        assert_eq!(change.and_then(|c| c.new_price), Some(Cents::new(45_000)));
    }

    #[tokio::test]
    async fn failed_optional_sheet_carries_previous_data() {
        let h = harness();
        assert!(h.service.sync_pricing(false, "test").await.is_ok());
        h.source.fail_sheet("Fenster", "Unable to parse range").await;

        let Ok(report) = h.service.sync_pricing(false, "test").await else {
            panic!("sync should succeed");
        };
        assert_eq!(report.items_removed, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.written);
        let last = h.service.last_sync().await.ok().flatten();
        assert_eq!(last.map(|l| l.status), Some(SyncStatus::Partial));
    }

    #[tokio::test]
    async fn missing_required_category_fails_without_writing() {
        let h = harness();
        h.source.fail_sheet("Fussboden", "missing tab").await;
        let result = h.service.sync_pricing(false, "test").await;
        assert!(matches!(result, Err(GatewayError::MissingCategories(ref c)) if c == "fussboden"));
        assert!(h.store.versions().await.is_empty());
        let last = h.service.last_sync().await.ok().flatten();
        assert_eq!(last.map(|l| l.status), Some(SyncStatus::Failed));
    }

    #[tokio::test]
    async fn unavailable_source_keeps_previous_snapshot() {
        let h = harness();
        assert!(h.service.sync_pricing(false, "test").await.is_ok());
        h.source.set_unavailable(Some("connection refused".to_string())).await;

        let result = h.service.sync_pricing(true, "test").await;
        assert!(matches!(result, Err(GatewayError::SourceUnavailable(_))));
        assert_eq!(h.store.versions().await, vec![1]);
        assert_eq!(h.store.sync_runs().await, 2);
    }

    #[tokio::test]
    async fn persistence_failure_commits_nothing() {
        let h = harness();
        h.store.set_fail_writes(true);
        let result = h.service.sync_pricing(false, "test").await;
        assert!(matches!(result, Err(GatewayError::PersistenceError(_))));
        assert!(h.store.versions().await.is_empty());
    }

    #[tokio::test]
    async fn row_errors_do_not_abort_the_run() {
        let h = harness();
        h.source
            .set_rows(
                "Fenster",
                vec![row("holz", "Holz", 400.0), vec!["alu".into(), "Alu".into(), "teuer".into()]],
            )
            .await;
        let Ok(report) = h.service.sync_pricing(false, "test").await else {
            panic!("sync should succeed");
        };
        assert_eq!(report.errors, vec!["Fenster row 3: unparsable price 'teuer'".to_string()]);
        assert!(report.written);
    }

    #[tokio::test]
    async fn concurrent_run_is_rejected() {
        let h = harness();
        let _held = h.service.running.lock().await;
        assert!(matches!(
            h.service.sync_pricing(false, "test").await,
            Err(GatewayError::SyncInProgress)
        ));
    }
}
