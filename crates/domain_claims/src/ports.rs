//! Claims Domain Ports
//!
//! Narrow capability traits the claim services depend on. Storage adapters
//! (PostgreSQL in `infra_db`, S3 in `infra_storage`, in-memory under the
//! `mock` feature) implement them; the services never name a storage
//! technology.
//!
//! # Transactions
//!
//! Every mutating service operation receives a unit of work opened by the
//! caller and issues all of its reads and writes through it. The caller
//! decides commit or rollback from the returned `Result`:
//!
//! ```rust,ignore
//! let services = services.clone();
//! let claim = tm
//!     .run(metadata, move |tx| {
//!         Box::pin(async move { services.workflow.submit(tx, claim_id, actor).await })
//!     })
//!     .await?;
//! ```
//!
//! Repository traits are generic over the unit-of-work type so a PostgreSQL
//! transaction and an in-memory snapshot can stand behind the same services.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use rust_decimal::Decimal;
use tracing::warn;

use core_kernel::{
    AttachmentId, ClaimId, ClaimItemId, DomainPort, HealthCheckable, OperationMetadata,
    PortError, UserId,
};

use crate::attachment::{AttachmentType, ClaimAttachment};
use crate::claim::{Claim, ClaimStatus};
use crate::history::ClaimHistory;
use crate::item::{ClaimItem, ItemStatus};
use crate::query::{ClaimFilter, Pagination};

/// An open transaction handle
#[async_trait]
pub trait UnitOfWork: Send + 'static {
    /// Ambient context of the operation (correlation id, initiating actor)
    fn metadata(&self) -> &OperationMetadata;

    /// Makes every write durable
    async fn commit(self) -> Result<(), PortError>;

    /// Discards every write
    async fn rollback(self) -> Result<(), PortError>;
}

/// Opens units of work and runs callbacks inside them
#[async_trait]
pub trait TransactionManager: DomainPort {
    type Tx: UnitOfWork;

    /// Opens a new unit of work for manual commit/rollback
    async fn begin(&self, metadata: OperationMetadata) -> Result<Self::Tx, PortError>;

    /// Runs `f` inside a fresh unit of work
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise. The callback's
    /// error is returned unchanged; a rollback failure is only logged since
    /// the original error is the one the caller must see.
    async fn run<T, E, F>(&self, metadata: OperationMetadata, f: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<PortError> + Send + 'static,
        F: for<'t> FnOnce(&'t mut Self::Tx) -> BoxFuture<'t, Result<T, E>> + Send + 'static,
    {
        let mut tx = self.begin(metadata).await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "rollback failed");
                }
                Err(error)
            }
        }
    }
}

/// Storage of claim aggregates
///
/// Soft-deleted claims are invisible: lookups report `PortError::NotFound`
/// and listings skip them.
#[async_trait]
pub trait ClaimRepository<Tx: UnitOfWork>: DomainPort {
    async fn create(&self, tx: &mut Tx, claim: &Claim) -> Result<(), PortError>;

    async fn find_by_id(&self, tx: &mut Tx, id: ClaimId) -> Result<Claim, PortError>;

    /// Loads the claim and holds it exclusively until the unit of work ends
    async fn lock_by_id(&self, tx: &mut Tx, id: ClaimId) -> Result<Claim, PortError>;

    /// Returns one page of matching claims and the total number of matches
    async fn find_all(
        &self,
        tx: &mut Tx,
        filter: &ClaimFilter,
        pagination: &Pagination,
    ) -> Result<(Vec<Claim>, u64), PortError>;

    /// Persists description and total cost
    async fn update(&self, tx: &mut Tx, claim: &Claim) -> Result<(), PortError>;

    async fn update_status(
        &self,
        tx: &mut Tx,
        id: ClaimId,
        status: ClaimStatus,
        approved_by: Option<UserId>,
    ) -> Result<(), PortError>;

    async fn hard_delete(&self, tx: &mut Tx, id: ClaimId) -> Result<(), PortError>;

    async fn soft_delete(&self, tx: &mut Tx, id: ClaimId) -> Result<(), PortError>;
}

/// Storage of claim items
#[async_trait]
pub trait ClaimItemRepository<Tx: UnitOfWork>: DomainPort {
    async fn create(&self, tx: &mut Tx, item: &ClaimItem) -> Result<(), PortError>;

    async fn update(&self, tx: &mut Tx, item: &ClaimItem) -> Result<(), PortError>;

    async fn update_status(
        &self,
        tx: &mut Tx,
        id: ClaimItemId,
        status: ItemStatus,
    ) -> Result<(), PortError>;

    async fn hard_delete(&self, tx: &mut Tx, id: ClaimItemId) -> Result<(), PortError>;

    async fn hard_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<(), PortError>;

    async fn soft_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<(), PortError>;

    /// Sum of costs of the claim's approved items
    async fn sum_cost_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Decimal, PortError>;

    async fn find_by_id(&self, tx: &mut Tx, id: ClaimItemId) -> Result<ClaimItem, PortError>;

    async fn find_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError>;
}

/// Storage of attachment metadata
#[async_trait]
pub trait ClaimAttachmentRepository<Tx: UnitOfWork>: DomainPort {
    async fn create(&self, tx: &mut Tx, attachment: &ClaimAttachment) -> Result<(), PortError>;

    async fn hard_delete(&self, tx: &mut Tx, id: AttachmentId) -> Result<(), PortError>;

    async fn hard_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<(), PortError>;

    async fn soft_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<(), PortError>;

    async fn find_by_id(&self, tx: &mut Tx, id: AttachmentId) -> Result<ClaimAttachment, PortError>;

    async fn find_by_claim_id(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
    ) -> Result<Vec<ClaimAttachment>, PortError>;
}

/// Append-only storage of status history; there is deliberately no update
#[async_trait]
pub trait ClaimHistoryRepository<Tx: UnitOfWork>: DomainPort {
    async fn create(&self, tx: &mut Tx, entry: &ClaimHistory) -> Result<(), PortError>;

    async fn soft_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<(), PortError>;

    async fn hard_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<(), PortError>;

    /// Entries in the order they were recorded
    async fn find_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError>;
}

/// Remote binary storage for evidence files
///
/// Not transactional: uploads happen before the metadata insert and deletes
/// after the metadata delete.
#[async_trait]
pub trait ObjectStore: DomainPort + HealthCheckable {
    /// Stores `content` and returns the URL it can be fetched from
    async fn upload_file(
        &self,
        content: &[u8],
        kind: AttachmentType,
        content_type: &str,
    ) -> Result<String, PortError>;

    async fn delete_file_by_url(&self, url: &str) -> Result<(), PortError>;
}

/// The four repositories the claim services share
pub struct ClaimRepositories<Tx: UnitOfWork> {
    pub claims: Arc<dyn ClaimRepository<Tx>>,
    pub items: Arc<dyn ClaimItemRepository<Tx>>,
    pub attachments: Arc<dyn ClaimAttachmentRepository<Tx>>,
    pub history: Arc<dyn ClaimHistoryRepository<Tx>>,
}

impl<Tx: UnitOfWork> Clone for ClaimRepositories<Tx> {
    fn clone(&self) -> Self {
        Self {
            claims: Arc::clone(&self.claims),
            items: Arc::clone(&self.items),
            attachments: Arc::clone(&self.attachments),
            history: Arc::clone(&self.history),
        }
    }
}
