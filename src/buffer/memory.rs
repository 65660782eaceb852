//! In-process event buffer for development and tests.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::EventBuffer;
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct Lists {
    events: HashMap<String, VecDeque<String>>,
    pending: BTreeSet<String>,
}

/// Mirrors the Redis layout with a map of queues and a pending set.
#[derive(Debug)]
pub struct MemoryEventBuffer {
    lists: Mutex<Lists>,
    max_events: usize,
    unavailable: AtomicBool,
}

impl MemoryEventBuffer {
    /// Creates an empty buffer keeping at most `max_events` per session.
    #[must_use]
    pub fn new(max_events: u32) -> Self {
        Self {
            lists: Mutex::new(Lists::default()),
            max_events: usize::try_from(max_events.max(1)).unwrap_or(usize::MAX),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every operation fail, simulating a Redis outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of payloads buffered for a session.
    pub async fn len(&self, session_id: &str) -> usize {
        self.lists
            .lock()
            .await
            .events
            .get(session_id)
            .map_or(0, VecDeque::len)
    }

    /// Returns `true` if no session is pending.
    pub async fn is_empty(&self) -> bool {
        self.lists.lock().await.pending.is_empty()
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::BufferError("buffer unavailable".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryEventBuffer {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl EventBuffer for MemoryEventBuffer {
    async fn push(&self, session_id: &str, payload: String) -> Result<(), GatewayError> {
        self.check()?;
        let mut lists = self.lists.lock().await;
        let queue = lists.events.entry(session_id.to_string()).or_default();
        queue.push_back(payload);
        while queue.len() > self.max_events {
            queue.pop_front();
        }
        lists.pending.insert(session_id.to_string());
        Ok(())
    }

    async fn pending_sessions(&self) -> Result<Vec<String>, GatewayError> {
        self.check()?;
        Ok(self.lists.lock().await.pending.iter().cloned().collect())
    }

    async fn read(&self, session_id: &str) -> Result<Vec<String>, GatewayError> {
        self.check()?;
        Ok(self
            .lists
            .lock()
            .await
            .events
            .get(session_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn acknowledge(&self, session_id: &str, count: usize) -> Result<(), GatewayError> {
        self.check()?;
        let mut lists = self.lists.lock().await;
        let now_empty = match lists.events.get_mut(session_id) {
            Some(queue) => {
                let n = count.min(queue.len());
                queue.drain(..n);
                queue.is_empty()
            }
            None => true,
        };
        if now_empty {
            lists.events.remove(session_id);
            lists.pending.remove(session_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_oldest_first_and_trims_to_max() {
        let buffer = MemoryEventBuffer::new(2);
        for p in ["a", "b", "c"] {
            assert!(buffer.push("s1", p.to_string()).await.is_ok());
        }
        assert_eq!(buffer.read("s1").await.ok(), Some(vec!["b".to_string(), "c".to_string()]));
        assert_eq!(buffer.pending_sessions().await.ok(), Some(vec!["s1".to_string()]));
    }

    #[tokio::test]
    async fn acknowledge_keeps_late_pushes() {
        let buffer = MemoryEventBuffer::new(10);
        assert!(buffer.push("s1", "a".to_string()).await.is_ok());
        let read = buffer.read("s1").await.unwrap_or_default();
        assert!(buffer.push("s1", "late".to_string()).await.is_ok());

        assert!(buffer.acknowledge("s1", read.len()).await.is_ok());
        assert_eq!(buffer.read("s1").await.ok(), Some(vec!["late".to_string()]));
        assert!(!buffer.is_empty().await);

        assert!(buffer.acknowledge("s1", 1).await.is_ok());
        assert!(buffer.is_empty().await);
        assert_eq!(buffer.len("s1").await, 0);
    }

    #[tokio::test]
    async fn outage_surfaces_as_buffer_error() {
        let buffer = MemoryEventBuffer::default();
        buffer.set_unavailable(true);
        assert!(matches!(
            buffer.push("s1", "x".to_string()).await,
            Err(GatewayError::BufferError(_))
        ));
    }
}
