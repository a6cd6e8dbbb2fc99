//! Binary store for uploaded identification documents
//!
//! Data model (Redis):
//! - upload:{id} → Hash with `filename`, `content_type`, `length`,
//!   `uploaded_at` and the raw bytes in `data`
//! - uploads:all → Set of stored attachment ids
//!
//! The filesystem store keeps `{id}.bin` next to a `{id}.json` metadata file.
//! Attachments are never updated or deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use enrollment_common::{AttachmentMeta, Error, NewAttachment, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

const UPLOADS_INDEX: &str = "uploads:all";

/// A stored document together with its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    pub meta: AttachmentMeta,
    pub bytes: Vec<u8>,
}

/// Append-only store for attachment blobs
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Store a blob and return its generated id and metadata once it is
    /// durably written
    async fn put(&self, attachment: NewAttachment) -> Result<AttachmentMeta>;

    async fn get(&self, id: Uuid) -> Result<Option<StoredAttachment>>;

    /// Number of stored attachments
    async fn count(&self) -> Result<usize>;
}

fn new_meta(attachment: &NewAttachment) -> AttachmentMeta {
    AttachmentMeta {
        id: Uuid::new_v4(),
        filename: attachment.filename.clone(),
        content_type: attachment.content_type.clone(),
        length: attachment.bytes.len() as u64,
        uploaded_at: Utc::now(),
    }
}

/// Redis-backed attachment store
pub struct RedisAttachmentStore {
    conn: ConnectionManager,
}

impl RedisAttachmentStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

fn redis_err(e: redis::RedisError) -> Error {
    Error::Redis(e.to_string())
}

fn corrupt(id: Uuid, what: &str) -> Error {
    Error::AttachmentStore(format!("attachment {} has invalid {}", id, what))
}

#[async_trait]
impl AttachmentStore for RedisAttachmentStore {
    async fn put(&self, attachment: NewAttachment) -> Result<AttachmentMeta> {
        let meta = new_meta(&attachment);
        let key = format!("upload:{}", meta.id);
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(&key, "filename", &meta.filename)
            .ignore()
            .hset(&key, "length", meta.length)
            .ignore()
            .hset(&key, "uploaded_at", meta.uploaded_at.to_rfc3339())
            .ignore()
            .hset(&key, "data", attachment.bytes.as_slice())
            .ignore()
            .sadd(UPLOADS_INDEX, meta.id.to_string())
            .ignore();
        if let Some(content_type) = &meta.content_type {
            pipe.hset(&key, "content_type", content_type).ignore();
        }

        let _: () = pipe.query_async(&mut conn).await.map_err(redis_err)?;

        info!(
            "Stored attachment {} ({}, {} bytes)",
            meta.id, meta.filename, meta.length
        );
        Ok(meta)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredAttachment>> {
        let key = format!("upload:{}", id);
        let mut conn = self.conn.clone();

        let mut hash: HashMap<String, Vec<u8>> = conn.hgetall(&key).await.map_err(redis_err)?;
        if hash.is_empty() {
            return Ok(None);
        }

        let text = |hash: &HashMap<String, Vec<u8>>, field: &str| -> Result<Option<String>> {
            hash.get(field)
                .map(|raw| String::from_utf8(raw.clone()).map_err(|_| corrupt(id, field)))
                .transpose()
        };

        let filename = text(&hash, "filename")?.ok_or_else(|| corrupt(id, "filename"))?;
        let content_type = text(&hash, "content_type")?;
        let length = text(&hash, "length")?
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| corrupt(id, "length"))?;
        let uploaded_at = text(&hash, "uploaded_at")?
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| corrupt(id, "uploaded_at"))?;
        let bytes = hash.remove("data").unwrap_or_default();

        Ok(Some(StoredAttachment {
            meta: AttachmentMeta {
                id,
                filename,
                content_type,
                length,
                uploaded_at,
            },
            bytes,
        }))
    }

    async fn count(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let count: usize = conn.scard(UPLOADS_INDEX).await.map_err(redis_err)?;
        Ok(count)
    }
}

/// Attachment store writing into a local directory
pub struct FilesystemAttachmentStore {
    root: PathBuf,
}

impl FilesystemAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn data_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.bin", id))
    }

    fn meta_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

#[async_trait]
impl AttachmentStore for FilesystemAttachmentStore {
    async fn put(&self, attachment: NewAttachment) -> Result<AttachmentMeta> {
        let meta = new_meta(&attachment);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.data_path(meta.id), &attachment.bytes).await?;
        // Metadata last: an attachment without it is not visible.
        tokio::fs::write(self.meta_path(meta.id), serde_json::to_vec(&meta)?).await?;

        info!(
            "Stored attachment {} ({}, {} bytes) in {}",
            meta.id,
            meta.filename,
            meta.length,
            self.root.display()
        );
        Ok(meta)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredAttachment>> {
        let raw_meta = match tokio::fs::read(self.meta_path(id)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: AttachmentMeta = serde_json::from_slice(&raw_meta)?;
        let bytes = tokio::fs::read(self.data_path(id)).await?;

        Ok(Some(StoredAttachment { meta, bytes }))
    }

    async fn count(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// In-process attachment store
#[derive(Default)]
pub struct MemoryAttachmentStore {
    blobs: RwLock<HashMap<Uuid, StoredAttachment>>,
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn put(&self, attachment: NewAttachment) -> Result<AttachmentMeta> {
        let meta = new_meta(&attachment);
        self.blobs.write().await.insert(
            meta.id,
            StoredAttachment {
                meta: meta.clone(),
                bytes: attachment.bytes,
            },
        );
        Ok(meta)
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredAttachment>> {
        Ok(self.blobs.read().await.get(&id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.blobs.read().await.len())
    }
}
