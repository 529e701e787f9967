//! In-memory adapters for tests
//!
//! A [`MemoryTransactionManager`] serializes whole units of work behind one
//! mutex. Each unit of work edits a private copy of the state that replaces
//! the shared state on commit and is dropped on rollback, which gives the
//! same all-or-nothing behaviour as a database transaction.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, AttachmentId, ClaimId, ClaimItemId, DomainPort, HealthCheckResult,
    HealthCheckable, OperationMetadata, PortError, UserId,
};

use crate::attachment::{AttachmentType, ClaimAttachment};
use crate::claim::{Claim, ClaimStatus};
use crate::config::ClaimPolicy;
use crate::history::ClaimHistory;
use crate::item::{ClaimItem, ItemStatus};
use crate::ports::{
    ClaimAttachmentRepository, ClaimHistoryRepository, ClaimItemRepository, ClaimRepositories,
    ClaimRepository, ObjectStore, TransactionManager, UnitOfWork,
};
use crate::query::{ClaimFilter, Pagination, SortDirection, SortField};
use crate::services::ClaimServices;

/// Everything the in-memory repositories store
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub claims: HashMap<ClaimId, Claim>,
    pub items: HashMap<ClaimItemId, ClaimItem>,
    pub attachments: HashMap<AttachmentId, ClaimAttachment>,
    pub history: Vec<ClaimHistory>,
}

/// Unit of work over a private copy of [`MemoryState`]
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    metadata: OperationMetadata,
}

impl MemoryUnitOfWork {
    pub fn state(&self) -> &MemoryState {
        &self.working
    }

    pub fn state_mut(&mut self) -> &mut MemoryState {
        &mut self.working
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn metadata(&self) -> &OperationMetadata {
        &self.metadata
    }

    async fn commit(self) -> Result<(), PortError> {
        let MemoryUnitOfWork { mut guard, working, .. } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), PortError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTransactionManager {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for any running unit of work to finish, then opens a new one
    pub async fn open(&self, metadata: OperationMetadata) -> MemoryUnitOfWork {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        MemoryUnitOfWork {
            guard,
            working,
            metadata,
        }
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

impl DomainPort for MemoryTransactionManager {}

#[async_trait]
impl TransactionManager for MemoryTransactionManager {
    type Tx = MemoryUnitOfWork;

    async fn begin(&self, metadata: OperationMetadata) -> Result<MemoryUnitOfWork, PortError> {
        Ok(self.open(metadata).await)
    }
}

#[async_trait]
impl HealthCheckable for MemoryTransactionManager {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "memory-transactions".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

fn injected_failure(operation: &str) -> PortError {
    PortError::internal(format!("injected failure in {}", operation))
}

// ============================================================================
// Claims
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryClaimRepository {
    fail_updates: bool,
}

impl MemoryClaimRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `update` call fails
    pub fn failing_updates() -> Self {
        Self { fail_updates: true }
    }
}

fn live_claim(state: &mut MemoryState, id: ClaimId) -> Result<&mut Claim, PortError> {
    state
        .claims
        .get_mut(&id)
        .filter(|claim| claim.deleted_at.is_none())
        .ok_or_else(|| PortError::not_found("Claim", id))
}

fn compare_claims(a: &Claim, b: &Claim, sort_by: SortField) -> Ordering {
    let ordering = match sort_by {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        SortField::TotalCost => a.total_cost.amount().cmp(&b.total_cost.amount()),
    };
    ordering.then_with(|| a.id.cmp(&b.id))
}

impl DomainPort for MemoryClaimRepository {}

#[async_trait]
impl ClaimRepository<MemoryUnitOfWork> for MemoryClaimRepository {
    async fn create(&self, tx: &mut MemoryUnitOfWork, claim: &Claim) -> Result<(), PortError> {
        let claims = &mut tx.state_mut().claims;
        if claims.contains_key(&claim.id) {
            return Err(PortError::conflict(format!("claim {} already exists", claim.id)));
        }
        claims.insert(claim.id, claim.clone());
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut MemoryUnitOfWork, id: ClaimId) -> Result<Claim, PortError> {
        live_claim(tx.state_mut(), id).map(|claim| claim.clone())
    }

    async fn lock_by_id(&self, tx: &mut MemoryUnitOfWork, id: ClaimId) -> Result<Claim, PortError> {
        // the unit of work already holds the store exclusively
        self.find_by_id(tx, id).await
    }

    async fn find_all(
        &self,
        tx: &mut MemoryUnitOfWork,
        filter: &ClaimFilter,
        pagination: &Pagination,
    ) -> Result<(Vec<Claim>, u64), PortError> {
        let mut matches: Vec<Claim> = tx
            .state()
            .claims
            .values()
            .filter(|claim| filter.matches(claim))
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            let ordering = compare_claims(a, b, pagination.sort_by);
            match pagination.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matches.len() as u64;
        if pagination.is_disabled() {
            return Ok((matches, total));
        }

        let page = matches
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.page_size as usize)
            .collect();
        Ok((page, total))
    }

    async fn update(&self, tx: &mut MemoryUnitOfWork, claim: &Claim) -> Result<(), PortError> {
        if self.fail_updates {
            return Err(injected_failure("claims.update"));
        }
        let stored = live_claim(tx.state_mut(), claim.id)?;
        stored.description = claim.description.clone();
        stored.total_cost = claim.total_cost;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn update_status(
        &self,
        tx: &mut MemoryUnitOfWork,
        id: ClaimId,
        status: ClaimStatus,
        approved_by: Option<UserId>,
    ) -> Result<(), PortError> {
        let stored = live_claim(tx.state_mut(), id)?;
        stored.status = status;
        stored.approved_by = approved_by;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn hard_delete(&self, tx: &mut MemoryUnitOfWork, id: ClaimId) -> Result<(), PortError> {
        tx.state_mut()
            .claims
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("Claim", id))
    }

    async fn soft_delete(&self, tx: &mut MemoryUnitOfWork, id: ClaimId) -> Result<(), PortError> {
        let stored = live_claim(tx.state_mut(), id)?;
        stored.deleted_at = Some(Utc::now());
        Ok(())
    }
}

// ============================================================================
// Claim items
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryClaimItemRepository;

fn live_item(state: &mut MemoryState, id: ClaimItemId) -> Result<&mut ClaimItem, PortError> {
    state
        .items
        .get_mut(&id)
        .filter(|item| item.deleted_at.is_none())
        .ok_or_else(|| PortError::not_found("ClaimItem", id))
}

impl DomainPort for MemoryClaimItemRepository {}

#[async_trait]
impl ClaimItemRepository<MemoryUnitOfWork> for MemoryClaimItemRepository {
    async fn create(&self, tx: &mut MemoryUnitOfWork, item: &ClaimItem) -> Result<(), PortError> {
        let items = &mut tx.state_mut().items;
        if items.contains_key(&item.id) {
            return Err(PortError::conflict(format!("claim item {} already exists", item.id)));
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update(&self, tx: &mut MemoryUnitOfWork, item: &ClaimItem) -> Result<(), PortError> {
        let stored = live_item(tx.state_mut(), item.id)?;
        *stored = ClaimItem {
            updated_at: Utc::now(),
            ..item.clone()
        };
        Ok(())
    }

    async fn update_status(
        &self,
        tx: &mut MemoryUnitOfWork,
        id: ClaimItemId,
        status: ItemStatus,
    ) -> Result<(), PortError> {
        let stored = live_item(tx.state_mut(), id)?;
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn hard_delete(&self, tx: &mut MemoryUnitOfWork, id: ClaimItemId) -> Result<(), PortError> {
        tx.state_mut()
            .items
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("ClaimItem", id))
    }

    async fn hard_delete_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        tx.state_mut().items.retain(|_, item| item.claim_id != claim_id);
        Ok(())
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        let now = Utc::now();
        tx.state_mut()
            .items
            .values_mut()
            .filter(|item| item.claim_id == claim_id && item.deleted_at.is_none())
            .for_each(|item| item.deleted_at = Some(now));
        Ok(())
    }

    async fn sum_cost_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<Decimal, PortError> {
        Ok(tx
            .state()
            .items
            .values()
            .filter(|item| item.claim_id == claim_id && item.deleted_at.is_none() && item.is_approved())
            .map(|item| item.cost.amount())
            .sum())
    }

    async fn find_by_id(&self, tx: &mut MemoryUnitOfWork, id: ClaimItemId) -> Result<ClaimItem, PortError> {
        live_item(tx.state_mut(), id).map(|item| item.clone())
    }

    async fn find_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError> {
        let mut items: Vec<ClaimItem> = tx
            .state()
            .items
            .values()
            .filter(|item| item.claim_id == claim_id && item.deleted_at.is_none())
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }
}

// ============================================================================
// Attachments
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryClaimAttachmentRepository {
    fail_writes: bool,
}

impl MemoryClaimAttachmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create` call fails
    pub fn failing() -> Self {
        Self { fail_writes: true }
    }
}

impl DomainPort for MemoryClaimAttachmentRepository {}

#[async_trait]
impl ClaimAttachmentRepository<MemoryUnitOfWork> for MemoryClaimAttachmentRepository {
    async fn create(&self, tx: &mut MemoryUnitOfWork, attachment: &ClaimAttachment) -> Result<(), PortError> {
        if self.fail_writes {
            return Err(injected_failure("claim_attachments.create"));
        }
        tx.state_mut().attachments.insert(attachment.id, attachment.clone());
        Ok(())
    }

    async fn hard_delete(&self, tx: &mut MemoryUnitOfWork, id: AttachmentId) -> Result<(), PortError> {
        tx.state_mut()
            .attachments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("ClaimAttachment", id))
    }

    async fn hard_delete_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        tx.state_mut().attachments.retain(|_, attachment| attachment.claim_id != claim_id);
        Ok(())
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        let now = Utc::now();
        tx.state_mut()
            .attachments
            .values_mut()
            .filter(|attachment| attachment.claim_id == claim_id && attachment.deleted_at.is_none())
            .for_each(|attachment| attachment.deleted_at = Some(now));
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut MemoryUnitOfWork, id: AttachmentId) -> Result<ClaimAttachment, PortError> {
        tx.state()
            .attachments
            .get(&id)
            .filter(|attachment| attachment.deleted_at.is_none())
            .cloned()
            .ok_or_else(|| PortError::not_found("ClaimAttachment", id))
    }

    async fn find_by_claim_id(
        &self,
        tx: &mut MemoryUnitOfWork,
        claim_id: ClaimId,
    ) -> Result<Vec<ClaimAttachment>, PortError> {
        let mut attachments: Vec<ClaimAttachment> = tx
            .state()
            .attachments
            .values()
            .filter(|attachment| attachment.claim_id == claim_id && attachment.deleted_at.is_none())
            .cloned()
            .collect();
        attachments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(attachments)
    }
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryClaimHistoryRepository {
    fail_writes: bool,
}

impl MemoryClaimHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create` call fails
    pub fn failing() -> Self {
        Self { fail_writes: true }
    }
}

impl DomainPort for MemoryClaimHistoryRepository {}

#[async_trait]
impl ClaimHistoryRepository<MemoryUnitOfWork> for MemoryClaimHistoryRepository {
    async fn create(&self, tx: &mut MemoryUnitOfWork, entry: &ClaimHistory) -> Result<(), PortError> {
        if self.fail_writes {
            return Err(injected_failure("claim_histories.create"));
        }
        tx.state_mut().history.push(entry.clone());
        Ok(())
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        let now = Utc::now();
        tx.state_mut()
            .history
            .iter_mut()
            .filter(|entry| entry.claim_id == claim_id && entry.deleted_at.is_none())
            .for_each(|entry| entry.deleted_at = Some(now));
        Ok(())
    }

    async fn hard_delete_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        tx.state_mut().history.retain(|entry| entry.claim_id != claim_id);
        Ok(())
    }

    async fn find_by_claim_id(&self, tx: &mut MemoryUnitOfWork, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError> {
        Ok(tx
            .state()
            .history
            .iter()
            .filter(|entry| entry.claim_id == claim_id && entry.deleted_at.is_none())
            .cloned()
            .collect())
    }
}

// ============================================================================
// Object store
// ============================================================================

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    size: usize,
}

/// Object store keeping uploads in a map keyed by URL
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    fail_uploads: bool,
    fail_deletes: bool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.objects.read().await.contains_key(url)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn content_type(&self, url: &str) -> Option<String> {
        self.objects.read().await.get(url).map(|object| object.content_type.clone())
    }

    pub async fn size(&self, url: &str) -> Option<usize> {
        self.objects.read().await.get(url).map(|object| object.size)
    }
}

impl DomainPort for MemoryObjectStore {}

#[async_trait]
impl HealthCheckable for MemoryObjectStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "memory-object-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: Some("Mock adapter always healthy".to_string()),
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload_file(
        &self,
        content: &[u8],
        kind: AttachmentType,
        content_type: &str,
    ) -> Result<String, PortError> {
        if self.fail_uploads {
            return Err(PortError::connection("object store unavailable"));
        }
        let url = format!("memory://claims/{}/{}", kind, Uuid::new_v4());
        self.objects.write().await.insert(
            url.clone(),
            StoredObject {
                content_type: content_type.to_string(),
                size: content.len(),
            },
        );
        Ok(url)
    }

    async fn delete_file_by_url(&self, url: &str) -> Result<(), PortError> {
        if self.fail_deletes {
            return Err(PortError::connection("object store unavailable"));
        }
        self.objects
            .write()
            .await
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("StoredObject", url))
    }
}

// ============================================================================
// Wiring
// ============================================================================

/// In-memory repositories, object store and transaction manager wired together
pub struct MemoryBackend {
    tm: MemoryTransactionManager,
    claims: Arc<MemoryClaimRepository>,
    items: Arc<MemoryClaimItemRepository>,
    attachments: Arc<MemoryClaimAttachmentRepository>,
    history: Arc<MemoryClaimHistoryRepository>,
    store: Arc<MemoryObjectStore>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            tm: MemoryTransactionManager::new(),
            claims: Arc::new(MemoryClaimRepository::new()),
            items: Arc::new(MemoryClaimItemRepository),
            attachments: Arc::new(MemoryClaimAttachmentRepository::new()),
            history: Arc::new(MemoryClaimHistoryRepository::new()),
            store: Arc::new(MemoryObjectStore::new()),
        }
    }

    pub fn with_store(mut self, store: MemoryObjectStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    pub fn with_failing_history(mut self) -> Self {
        self.history = Arc::new(MemoryClaimHistoryRepository::failing());
        self
    }

    pub fn with_failing_claim_updates(mut self) -> Self {
        self.claims = Arc::new(MemoryClaimRepository::failing_updates());
        self
    }

    pub fn with_failing_attachment_writes(mut self) -> Self {
        self.attachments = Arc::new(MemoryClaimAttachmentRepository::failing());
        self
    }

    pub fn repositories(&self) -> ClaimRepositories<MemoryUnitOfWork> {
        ClaimRepositories {
            claims: self.claims.clone(),
            items: self.items.clone(),
            attachments: self.attachments.clone(),
            history: self.history.clone(),
        }
    }

    pub fn services(&self, policy: ClaimPolicy) -> ClaimServices<MemoryUnitOfWork> {
        ClaimServices::new(self.repositories(), self.object_store(), policy)
    }

    pub fn store(&self) -> &MemoryObjectStore {
        &self.store
    }

    /// The same store, shared as a port
    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub fn transaction_manager(&self) -> MemoryTransactionManager {
        self.tm.clone()
    }

    pub async fn begin(&self, metadata: OperationMetadata) -> MemoryUnitOfWork {
        self.tm.open(metadata).await
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.tm.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let backend = MemoryBackend::new();
        let repos = backend.repositories();
        let claim = Claim::draft(
            core_kernel::VehicleId::new(),
            core_kernel::CustomerId::new(),
            "Door handle sensor",
            core_kernel::Currency::VND,
        );

        let mut tx = backend.begin(OperationMetadata::default()).await;
        repos.claims.create(&mut tx, &claim).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(backend.snapshot().await.claims.is_empty());

        let mut tx = backend.begin(OperationMetadata::default()).await;
        repos.claims.create(&mut tx, &claim).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(backend.snapshot().await.claims.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_deleted_claim_is_invisible() {
        let backend = MemoryBackend::new();
        let repos = backend.repositories();
        let claim = Claim::draft(
            core_kernel::VehicleId::new(),
            core_kernel::CustomerId::new(),
            "Seat heater",
            core_kernel::Currency::VND,
        );

        let mut tx = backend.begin(OperationMetadata::default()).await;
        repos.claims.create(&mut tx, &claim).await.unwrap();
        repos.claims.soft_delete(&mut tx, claim.id).await.unwrap();

        let err = repos.claims.find_by_id(&mut tx, claim.id).await.unwrap_err();
        assert!(err.is_not_found());
        let (all, total) = repos
            .claims
            .find_all(&mut tx, &ClaimFilter::default(), &Pagination::default())
            .await
            .unwrap();
        assert!(all.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces() {
        let store = MemoryObjectStore::new().failing_uploads();
        let result = store.upload_file(b"data", AttachmentType::Image, "image/png").await;
        assert!(result.unwrap_err().is_transient());
    }
}
