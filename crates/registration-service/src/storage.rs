//! Registration persistence
//!
//! Data model (Redis):
//! - registration:{id} → JSON registration record
//! - registration:ticket:{ticket_no} → id (unique ticket index)
//! - registrations:all → List of ids in insertion order

use anyhow::Context;
use async_trait::async_trait;
use enrollment_common::{Error, Registration, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

const REGISTRATIONS_INDEX: &str = "registrations:all";

/// Claims the ticket index entry and writes the record in one step.
/// Returns 0 when the ticket number is already taken.
const INSERT_SCRIPT: &str = r#"
if redis.call('SETNX', KEYS[1], ARGV[1]) == 0 then
    return 0
end
redis.call('SET', KEYS[2], ARGV[2])
redis.call('RPUSH', KEYS[3], ARGV[1])
return 1
"#;

/// Open a managed Redis connection shared by all Redis-backed stores
pub async fn connect(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

    let conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis at {}", redis_url);

    Ok(conn)
}

/// Append-only store of registration records
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Persist a new record. Fails with [`Error::DuplicateTicket`] if its
    /// ticket number is already assigned.
    async fn insert(&self, registration: &Registration) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Registration>>;

    async fn get_by_ticket(&self, ticket_no: u64) -> Result<Option<Registration>>;

    /// Number of persisted records
    async fn count(&self) -> Result<usize>;
}

/// Redis-backed registration store
pub struct RedisRegistrationStore {
    conn: ConnectionManager,
    script: redis::Script,
}

impl RedisRegistrationStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            script: redis::Script::new(INSERT_SCRIPT),
        }
    }
}

fn redis_err(e: redis::RedisError) -> Error {
    Error::Redis(e.to_string())
}

#[async_trait]
impl RegistrationStore for RedisRegistrationStore {
    async fn insert(&self, registration: &Registration) -> Result<()> {
        let json = serde_json::to_string(registration)?;
        let id = registration.id.to_string();
        let mut conn = self.conn.clone();

        let inserted: i64 = self
            .script
            .key(format!("registration:ticket:{}", registration.ticket_no))
            .key(format!("registration:{}", id))
            .key(REGISTRATIONS_INDEX)
            .arg(&id)
            .arg(json)
            .invoke_async(&mut conn)
            .await
            .map_err(redis_err)?;

        if inserted == 0 {
            return Err(Error::DuplicateTicket(registration.ticket_no));
        }

        info!(
            "Stored registration {} with ticket {}",
            registration.id, registration.ticket_no
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Registration>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn
            .get(format!("registration:{}", id))
            .await
            .map_err(redis_err)?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn get_by_ticket(&self, ticket_no: u64) -> Result<Option<Registration>> {
        let mut conn = self.conn.clone();
        let id: Option<String> = conn
            .get(format!("registration:ticket:{}", ticket_no))
            .await
            .map_err(redis_err)?;

        match id.and_then(|raw| Uuid::parse_str(&raw).ok()) {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let count: usize = conn.llen(REGISTRATIONS_INDEX).await.map_err(redis_err)?;
        Ok(count)
    }
}

#[derive(Default)]
struct MemoryInner {
    records: Vec<Registration>,
    by_ticket: HashMap<u64, usize>,
}

/// In-process registration store
#[derive(Default)]
pub struct MemoryRegistrationStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn insert(&self, registration: &Registration) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.by_ticket.contains_key(&registration.ticket_no) {
            return Err(Error::DuplicateTicket(registration.ticket_no));
        }

        let index = inner.records.len();
        inner.records.push(registration.clone());
        inner.by_ticket.insert(registration.ticket_no, index);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Registration>> {
        let inner = self.inner.read().await;
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    async fn get_by_ticket(&self, ticket_no: u64) -> Result<Option<Registration>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_ticket
            .get(&ticket_no)
            .map(|&index| inner.records[index].clone()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.records.len())
    }
}
