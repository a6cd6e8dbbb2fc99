//! Ticket number allocation
//!
//! The counter is a single row keyed `ticketNo` holding the last issued
//! value in `seq`. Allocation is one atomic increment-and-fetch with upsert
//! semantics; the floor correction happens inside the same atomic step so
//! concurrent callers can never observe the same value.

use async_trait::async_trait;
use enrollment_common::{Error, Result, TICKET_COUNTER_ID};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Creates the row at `floor - 1` when missing, increments it, and lifts
/// the result to the floor if an older row started lower.
const ALLOCATE_SCRIPT: &str = r#"
redis.call('HSETNX', KEYS[1], 'seq', ARGV[1])
local seq = redis.call('HINCRBY', KEYS[1], 'seq', 1)
local floor = tonumber(ARGV[2])
if seq < floor then
    redis.call('HSET', KEYS[1], 'seq', floor)
    seq = floor
end
return seq
"#;

/// Source of globally unique, strictly increasing ticket numbers
#[async_trait]
pub trait TicketCounter: Send + Sync {
    /// Allocate the next ticket number
    async fn next_ticket(&self) -> Result<u64>;

    /// Last issued value, or `None` if the counter row does not exist yet
    async fn current(&self) -> Result<Option<u64>>;
}

/// Redis-backed counter stored in the hash `counters:ticketNo`
pub struct RedisTicketCounter {
    conn: ConnectionManager,
    key: String,
    floor: u64,
    script: redis::Script,
}

impl RedisTicketCounter {
    pub fn new(conn: ConnectionManager, floor: u64) -> Self {
        Self {
            conn,
            key: format!("counters:{}", TICKET_COUNTER_ID),
            floor,
            script: redis::Script::new(ALLOCATE_SCRIPT),
        }
    }
}

#[async_trait]
impl TicketCounter for RedisTicketCounter {
    async fn next_ticket(&self) -> Result<u64> {
        let mut conn = self.conn.clone();

        let seq: u64 = self
            .script
            .key(&self.key)
            .arg(self.floor.saturating_sub(1))
            .arg(self.floor)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Error::Redis(e.to_string()))?;

        debug!("Allocated ticket number {}", seq);
        Ok(seq)
    }

    async fn current(&self) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let seq: Option<u64> = conn
            .hget(&self.key, "seq")
            .await
            .map_err(|e| Error::Redis(e.to_string()))?;
        Ok(seq)
    }
}

/// Process-local counter guarded by a mutex
pub struct MemoryTicketCounter {
    seq: Mutex<Option<u64>>,
    floor: u64,
}

impl MemoryTicketCounter {
    pub fn new(floor: u64) -> Self {
        Self {
            seq: Mutex::new(None),
            floor,
        }
    }

    /// Start from an existing counter row
    pub fn with_seq(seq: u64, floor: u64) -> Self {
        Self {
            seq: Mutex::new(Some(seq)),
            floor,
        }
    }
}

#[async_trait]
impl TicketCounter for MemoryTicketCounter {
    async fn next_ticket(&self) -> Result<u64> {
        let mut guard = self.seq.lock().await;

        let mut seq = guard.unwrap_or(self.floor.saturating_sub(1)) + 1;
        if seq < self.floor {
            warn!(
                "Counter at {} is below the ticket floor, correcting to {}",
                seq, self.floor
            );
            seq = self.floor;
        }
        *guard = Some(seq);

        Ok(seq)
    }

    async fn current(&self) -> Result<Option<u64>> {
        Ok(*self.seq.lock().await)
    }
}
