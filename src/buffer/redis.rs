//! Redis-backed event buffer.
//!
//! Layout:
//! - `analytics:events:<session>`: list of JSON payloads, `RPUSH`ed, so
//!   index 0 is the oldest event.
//! - `analytics:pending:sessions`: set of session ids with buffered events.
//!
//! Tests here need no server and only cover the key layout. Capping and
//! acknowledge semantics are exercised against
//! [`super::MemoryEventBuffer`], which mirrors this implementation command
//! for command.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use super::{BUFFER_TTL_SECS, EventBuffer};
use crate::error::GatewayError;

/// Key of the pending-sessions set.
pub const PENDING_SESSIONS_KEY: &str = "analytics:pending:sessions";

/// Trims the flushed prefix and clears the pending flag in one step, so a
/// push racing with the flush can never be left without its flag.
const ACKNOWLEDGE_SCRIPT: &str = r"
local count = tonumber(ARGV[1])
if count > 0 then
  redis.call('LTRIM', KEYS[1], count, -1)
end
if redis.call('LLEN', KEYS[1]) == 0 then
  redis.call('DEL', KEYS[1])
  redis.call('SREM', KEYS[2], ARGV[2])
  return 1
end
return 0
";

/// Event buffer on a shared Redis connection.
#[derive(Clone)]
pub struct RedisEventBuffer {
    conn: ConnectionManager,
    max_events: u32,
    acknowledge: Script,
}

impl std::fmt::Debug for RedisEventBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEventBuffer")
            .field("max_events", &self.max_events)
            .finish_non_exhaustive()
    }
}

impl RedisEventBuffer {
    /// Connects to Redis at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::BufferError`] if the URL is invalid or the
    /// initial connection fails.
    pub async fn connect(url: &str, max_events: u32) -> Result<Self, GatewayError> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!(max_events, "connected to redis event buffer");
        Ok(Self {
            conn,
            max_events: max_events.max(1),
            acknowledge: Script::new(ACKNOWLEDGE_SCRIPT),
        })
    }

    /// Key of a session's event list.
    #[must_use]
    pub fn events_key(session_id: &str) -> String {
        format!("analytics:events:{session_id}")
    }
}

#[async_trait]
impl EventBuffer for RedisEventBuffer {
    async fn push(&self, session_id: &str, payload: String) -> Result<(), GatewayError> {
        let key = Self::events_key(session_id);
        let keep_from = -isize::try_from(self.max_events).unwrap_or(isize::MAX);
        let mut conn = self.conn.clone();

        let (): () = redis::pipe()
            .atomic()
            .rpush(&key, payload)
            .ignore()
            .ltrim(&key, keep_from, -1)
            .ignore()
            .expire(&key, BUFFER_TTL_SECS)
            .ignore()
            .sadd(PENDING_SESSIONS_KEY, session_id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn pending_sessions(&self) -> Result<Vec<String>, GatewayError> {
        let mut conn = self.conn.clone();
        let sessions: Vec<String> = conn.smembers(PENDING_SESSIONS_KEY).await?;
        Ok(sessions)
    }

    async fn read(&self, session_id: &str) -> Result<Vec<String>, GatewayError> {
        let mut conn = self.conn.clone();
        let payloads: Vec<String> = conn.lrange(Self::events_key(session_id), 0, -1).await?;
        Ok(payloads)
    }

    async fn acknowledge(&self, session_id: &str, count: usize) -> Result<(), GatewayError> {
        let mut conn = self.conn.clone();
        let cleared: i64 = self
            .acknowledge
            .key(Self::events_key(session_id))
            .key(PENDING_SESSIONS_KEY)
            .arg(count)
            .arg(session_id)
            .invoke_async(&mut conn)
            .await?;
        tracing::trace!(session_id, count, cleared = cleared == 1, "buffer acknowledged");
        Ok(())
    }
}
