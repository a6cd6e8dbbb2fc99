//! Registration flow: validate, store the attachment, allocate a ticket,
//! persist the record.

use anyhow::Context;
use enrollment_common::{
    AttachmentRef, Error, NewAttachment, Registration, RegistrationFields, Result,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::{
    attachments::{
        AttachmentStore, FilesystemAttachmentStore, MemoryAttachmentStore, RedisAttachmentStore,
    },
    config::{Config, StorageBackend},
    counter::{MemoryTicketCounter, RedisTicketCounter, TicketCounter},
    storage::{self, MemoryRegistrationStore, RedisRegistrationStore, RegistrationStore},
};

/// A parsed submission awaiting registration
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub fields: RegistrationFields,
    pub attachment: Option<NewAttachment>,
}

/// Coordinates the attachment store, ticket counter and registration store
#[derive(Clone)]
pub struct RegistrationService {
    attachments: Arc<dyn AttachmentStore>,
    counter: Arc<dyn TicketCounter>,
    registrations: Arc<dyn RegistrationStore>,
    store_timeout: Duration,
}

impl RegistrationService {
    pub fn new(
        attachments: Arc<dyn AttachmentStore>,
        counter: Arc<dyn TicketCounter>,
        registrations: Arc<dyn RegistrationStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            attachments,
            counter,
            registrations,
            store_timeout,
        }
    }

    /// Service backed entirely by process memory
    pub fn in_memory(ticket_floor: u64, store_timeout: Duration) -> Self {
        Self::new(
            Arc::new(MemoryAttachmentStore::new()),
            Arc::new(MemoryTicketCounter::new(ticket_floor)),
            Arc::new(MemoryRegistrationStore::new()),
            store_timeout,
        )
    }

    /// Build the service with the backends selected in `config`
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut service = match config.storage_backend {
            StorageBackend::Memory => {
                warn!("Using in-memory storage; registrations are lost on restart");
                Self::in_memory(config.ticket_floor, config.store_timeout)
            }
            StorageBackend::Redis => {
                let conn = storage::connect(&config.redis_url)
                    .await
                    .context("Failed to initialize storage")?;
                Self::new(
                    Arc::new(RedisAttachmentStore::new(conn.clone())),
                    Arc::new(RedisTicketCounter::new(conn.clone(), config.ticket_floor)),
                    Arc::new(RedisRegistrationStore::new(conn)),
                    config.store_timeout,
                )
            }
        };

        if let Some(dir) = &config.upload_dir {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create upload directory: {}", dir.display()))?;
            info!("Storing uploads in {}", dir.display());
            service.attachments = Arc::new(FilesystemAttachmentStore::new(dir.clone()));
        }

        Ok(service)
    }

    pub fn attachments(&self) -> &Arc<dyn AttachmentStore> {
        &self.attachments
    }

    pub fn counter(&self) -> &Arc<dyn TicketCounter> {
        &self.counter
    }

    pub fn registrations(&self) -> &Arc<dyn RegistrationStore> {
        &self.registrations
    }

    /// Register one applicant.
    ///
    /// Steps run strictly in order and each storage round trip is bounded by
    /// the store timeout. Validation happens before any side effect. Once a
    /// ticket has been allocated it stays consumed even if persisting the
    /// record fails.
    pub async fn register(&self, submission: Submission) -> Result<Registration> {
        let Submission { fields, attachment } = submission;

        fields.validate()?;

        let attachment = match attachment {
            Some(upload) => {
                let meta = self
                    .bounded("attachment upload", self.attachments.put(upload))
                    .await?;
                Some(AttachmentRef {
                    id: meta.id,
                    filename: meta.filename,
                })
            }
            None => None,
        };

        let ticket_no = self
            .bounded("ticket allocation", self.counter.next_ticket())
            .await?;

        let registration = Registration::new(ticket_no, fields, attachment);

        if let Err(e) = self
            .bounded("registration insert", self.registrations.insert(&registration))
            .await
        {
            warn!(
                "Ticket {} was allocated but its registration was not stored: {}",
                ticket_no, e
            );
            return Err(e);
        }

        info!(
            "Registration {} accepted with ticket {}",
            registration.id, ticket_no
        );
        Ok(registration)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.store_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(operation))?
    }
}
