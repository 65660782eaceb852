//! Periodic in-process jobs: analytics flush and pricing sync.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{AnalyticsService, PricingSyncService};
use crate::error::GatewayError;

/// `triggered_by` label of the in-process sync schedule.
pub const SCHEDULER_TRIGGER: &str = "scheduler";

/// Spawns the analytics flush loop. The first flush runs one interval
/// after startup.
#[must_use]
pub fn spawn_flush_task(analytics: Arc<AnalyticsService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            interval.tick().await;
            match analytics.flush().await {
                Ok(report) if !report.errors.is_empty() => {
                    tracing::warn!(
                        sessions_flushed = report.sessions_flushed,
                        errors = ?report.errors,
                        "scheduled flush had failures"
                    );
                }
                Ok(_) => {}
                Err(GatewayError::FlushInProgress) => {
                    tracing::debug!("flush skipped, another flush is running");
                }
                Err(e) => tracing::error!(error = %e, "scheduled flush failed"),
            }
        }
    })
}

/// Spawns the pricing sync loop. The first sync runs one interval after
/// startup.
#[must_use]
pub fn spawn_sync_task(sync: Arc<PricingSyncService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await;

        loop {
            interval.tick().await;
            // Other failures are logged and recorded by the sync itself.
            if let Err(GatewayError::SyncInProgress) =
                sync.sync_pricing(false, SCHEDULER_TRIGGER).await
            {
                tracing::debug!("scheduled sync skipped, another sync is running");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{EventBuffer, MemoryEventBuffer};
    use crate::domain::SystemClock;
    use crate::persistence::{AnalyticsStore, MemoryAnalyticsStore};
    use crate::service::analytics::NewEvent;

    #[tokio::test]
    async fn flush_task_drains_buffer() {
        let buffer = Arc::new(MemoryEventBuffer::default());
        let store = Arc::new(MemoryAnalyticsStore::new());
        let analytics = Arc::new(AnalyticsService::new(
            Arc::clone(&buffer) as Arc<dyn EventBuffer>,
            Arc::clone(&store) as Arc<dyn AnalyticsStore>,
            Arc::new(SystemClock),
        ));
        let event = NewEvent {
            event_type: "click".to_string(),
            category: "nest".to_string(),
            ..NewEvent::default()
        };
        assert!(analytics.record_event("s1", event).await.is_ok());

        let handle = spawn_flush_task(Arc::clone(&analytics), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(buffer.is_empty().await);
        assert_eq!(store.events("s1").await.len(), 1);
        handle.abort();
    }
}
