//! Fast per-session event buffer.
//!
//! Client events land here first and are moved to PostgreSQL by the
//! analytics flush. Payloads are opaque strings to the buffer; decoding
//! happens in the flush so that one malformed payload only fails its own
//! session.

pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::error::GatewayError;

pub use self::memory::MemoryEventBuffer;
pub use self::redis::RedisEventBuffer;

/// Lifetime of a session's buffered list after its last push.
pub const BUFFER_TTL_SECS: i64 = 24 * 60 * 60;

/// Ordered per-session event lists plus the set of sessions with pending
/// events.
#[async_trait]
pub trait EventBuffer: Send + Sync + std::fmt::Debug {
    /// Appends a payload to the session's list and marks the session
    /// pending. Only the newest `max_events` payloads are kept.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::BufferError`] if the buffer is unreachable.
    async fn push(&self, session_id: &str, payload: String) -> Result<(), GatewayError>;

    /// Sessions that currently have (or recently had) buffered events.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::BufferError`] if the buffer is unreachable.
    async fn pending_sessions(&self) -> Result<Vec<String>, GatewayError>;

    /// All buffered payloads of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::BufferError`] if the buffer is unreachable.
    async fn read(&self, session_id: &str) -> Result<Vec<String>, GatewayError>;

    /// Drops the first `count` payloads of a session (the ones just
    /// flushed) and clears the pending flag once the list is empty.
    /// Payloads pushed after the read are kept.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::BufferError`] if the buffer is unreachable.
    async fn acknowledge(&self, session_id: &str, count: usize) -> Result<(), GatewayError>;
}
