//! Claim workflow engine
//!
//! Owns the claim aggregate: creation, edits, deletion and every status
//! transition. Each transition is validated against
//! [`ClaimStatus::can_transition_to`], persisted, and followed by exactly one
//! history entry in the same unit of work.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{ClaimId, CustomerId, UserId, VehicleId};
use crate::attachment::OrphanedObjects;
use crate::claim::{Claim, ClaimStatus};
use crate::config::ClaimPolicy;
use crate::error::ClaimError;
use crate::history::ClaimHistory;
use crate::item::{ClaimItem, ItemStatus};
use crate::ports::{ClaimRepositories, UnitOfWork};
use crate::query::{ClaimFilter, Page, Pagination};
use crate::services::ClaimHistoryRecorder;

/// Command for opening a new claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClaim {
    pub vehicle_id: VehicleId,
    pub customer_id: CustomerId,
    pub description: String,
}

/// Resolves the review outcome from the item decisions
///
/// Every item must be decided. All approved yields `APPROVED`, all rejected
/// yields `REJECTED`, anything else `PARTIALLY_APPROVED`.
pub fn review_outcome(items: &[ClaimItem]) -> Result<ClaimStatus, ClaimError> {
    if items.is_empty() {
        return Err(ClaimError::InvalidClaimAction(
            "cannot complete a review without claim items".to_string(),
        ));
    }

    let pending = items.iter().filter(|item| item.status == ItemStatus::Pending).count();
    if pending > 0 {
        return Err(ClaimError::InvalidClaimAction(format!(
            "{} claim item(s) still pending review",
            pending
        )));
    }

    let approved = items.iter().filter(|item| item.is_approved()).count();
    let outcome = if approved == items.len() {
        ClaimStatus::Approved
    } else if approved == 0 {
        ClaimStatus::Rejected
    } else {
        ClaimStatus::PartiallyApproved
    };
    Ok(outcome)
}

pub struct ClaimWorkflowEngine<Tx: UnitOfWork> {
    repos: ClaimRepositories<Tx>,
    history: ClaimHistoryRecorder<Tx>,
    policy: ClaimPolicy,
}

impl<Tx: UnitOfWork> Clone for ClaimWorkflowEngine<Tx> {
    fn clone(&self) -> Self {
        Self {
            repos: self.repos.clone(),
            history: self.history.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<Tx: UnitOfWork> ClaimWorkflowEngine<Tx> {
    pub fn new(
        repos: ClaimRepositories<Tx>,
        history: ClaimHistoryRecorder<Tx>,
        policy: ClaimPolicy,
    ) -> Self {
        Self {
            repos,
            history,
            policy,
        }
    }

    /// Opens a draft claim and records its first history entry
    #[instrument(skip(self, tx, cmd), fields(vehicle_id = %cmd.vehicle_id, customer_id = %cmd.customer_id))]
    pub async fn create(&self, tx: &mut Tx, cmd: CreateClaim, creator: UserId) -> Result<Claim, ClaimError> {
        if cmd.description.trim().is_empty() {
            return Err(ClaimError::invalid_input("description must not be empty"));
        }

        let claim = Claim::draft(cmd.vehicle_id, cmd.customer_id, cmd.description, self.policy.currency);
        self.repos.claims.create(tx, &claim).await?;
        self.history.record(tx, claim.id, claim.status, creator).await?;

        info!(claim_id = %claim.id, "claim created");
        Ok(claim)
    }

    /// Replaces the description of an editable claim
    #[instrument(skip(self, tx, description), fields(claim_id = %id))]
    pub async fn update(&self, tx: &mut Tx, id: ClaimId, description: String) -> Result<Claim, ClaimError> {
        let mut claim = self.repos.claims.lock_by_id(tx, id).await?;
        claim.update_description(description)?;
        self.repos.claims.update(tx, &claim).await?;
        Ok(claim)
    }

    /// Permanently removes a draft claim and everything it owns
    ///
    /// Children are removed explicitly, items then attachments then history,
    /// before the claim row. The stored objects of the removed attachments are
    /// returned; discard them only after the unit of work commits.
    #[instrument(skip(self, tx), fields(claim_id = %id))]
    pub async fn hard_delete(&self, tx: &mut Tx, id: ClaimId) -> Result<OrphanedObjects, ClaimError> {
        let claim = self.repos.claims.lock_by_id(tx, id).await?;
        claim.ensure_hard_deletable()?;

        let attachments = self.repos.attachments.find_by_claim_id(tx, id).await?;

        self.repos.items.hard_delete_by_claim_id(tx, id).await?;
        self.repos.attachments.hard_delete_by_claim_id(tx, id).await?;
        self.history.hard_delete_by_claim_id(tx, id).await?;
        self.repos.claims.hard_delete(tx, id).await?;

        info!(attachments = attachments.len(), "claim hard deleted");
        Ok(OrphanedObjects::new(
            attachments.into_iter().map(|attachment| attachment.url).collect(),
        ))
    }

    /// Tombstones a cancelled claim, then its items, attachments and history
    #[instrument(skip(self, tx), fields(claim_id = %id))]
    pub async fn soft_delete(&self, tx: &mut Tx, id: ClaimId) -> Result<(), ClaimError> {
        let claim = self.repos.claims.lock_by_id(tx, id).await?;
        claim.ensure_soft_deletable()?;

        self.repos.claims.soft_delete(tx, id).await?;
        self.repos.items.soft_delete_by_claim_id(tx, id).await?;
        self.repos.attachments.soft_delete_by_claim_id(tx, id).await?;
        self.history.soft_delete_by_claim_id(tx, id).await?;

        info!("claim soft deleted");
        Ok(())
    }

    /// Moves a claim along the transition table
    ///
    /// `SUBMITTED` goes through the submission checks and the review
    /// outcomes through the completion checks, so this route cannot skip
    /// them. A review outcome must match the one the item decisions yield.
    pub async fn update_status(
        &self,
        tx: &mut Tx,
        id: ClaimId,
        status: ClaimStatus,
        actor: UserId,
    ) -> Result<Claim, ClaimError> {
        let claim = self.repos.claims.lock_by_id(tx, id).await?;
        match status {
            ClaimStatus::Submitted => self.submit_locked(tx, claim, actor).await,
            ClaimStatus::Approved | ClaimStatus::PartiallyApproved | ClaimStatus::Rejected => {
                self.complete_locked(tx, claim, actor, Some(status)).await
            }
            _ => self.transition(tx, claim, status, actor, None).await,
        }
    }

    /// Submits a draft, or resubmits after a request for information
    ///
    /// Children are counted after the claim lock is held, inside the same
    /// unit of work as the status write.
    #[instrument(skip(self, tx), fields(claim_id = %id))]
    pub async fn submit(&self, tx: &mut Tx, id: ClaimId, actor: UserId) -> Result<Claim, ClaimError> {
        let claim = self.repos.claims.lock_by_id(tx, id).await?;
        self.submit_locked(tx, claim, actor).await
    }

    /// Closes the review once every item carries a decision
    ///
    /// The actor is recorded as the approver.
    #[instrument(skip(self, tx), fields(claim_id = %id))]
    pub async fn complete(&self, tx: &mut Tx, id: ClaimId, actor: UserId) -> Result<Claim, ClaimError> {
        let claim = self.repos.claims.lock_by_id(tx, id).await?;
        self.complete_locked(tx, claim, actor, None).await
    }

    async fn submit_locked(&self, tx: &mut Tx, claim: Claim, actor: UserId) -> Result<Claim, ClaimError> {
        if !claim.status.can_transition_to(ClaimStatus::Submitted) {
            return Err(ClaimError::invalid_transition(claim.status, ClaimStatus::Submitted));
        }

        let items = self.repos.items.find_by_claim_id(tx, claim.id).await?.len();
        let attachments = self.repos.attachments.find_by_claim_id(tx, claim.id).await?.len();
        if items < self.policy.min_claim_items || attachments < self.policy.min_attachments {
            return Err(ClaimError::MissingInformation {
                items,
                required_items: self.policy.min_claim_items,
                attachments,
                required_attachments: self.policy.min_attachments,
            });
        }

        self.transition(tx, claim, ClaimStatus::Submitted, actor, None).await
    }

    async fn complete_locked(
        &self,
        tx: &mut Tx,
        claim: Claim,
        actor: UserId,
        expected: Option<ClaimStatus>,
    ) -> Result<Claim, ClaimError> {
        if claim.status != ClaimStatus::Reviewing {
            return Err(ClaimError::InvalidClaimAction(format!(
                "cannot complete the review of a claim in status {}",
                claim.status
            )));
        }

        let items = self.repos.items.find_by_claim_id(tx, claim.id).await?;
        let outcome = review_outcome(&items)?;
        if let Some(expected) = expected.filter(|expected| *expected != outcome) {
            return Err(ClaimError::InvalidClaimAction(format!(
                "item decisions resolve the review to {}, not {}",
                outcome, expected
            )));
        }
        self.transition(tx, claim, outcome, actor, Some(actor)).await
    }

    pub async fn get(&self, tx: &mut Tx, id: ClaimId) -> Result<Claim, ClaimError> {
        Ok(self.repos.claims.find_by_id(tx, id).await?)
    }

    pub async fn list(
        &self,
        tx: &mut Tx,
        filter: &ClaimFilter,
        pagination: &Pagination,
    ) -> Result<Page<Claim>, ClaimError> {
        let (claims, total) = self.repos.claims.find_all(tx, filter, pagination).await?;
        Ok(Page::new(claims, total, pagination))
    }

    /// Status history of an existing claim, oldest first
    pub async fn history(&self, tx: &mut Tx, id: ClaimId) -> Result<Vec<ClaimHistory>, ClaimError> {
        self.repos.claims.find_by_id(tx, id).await?;
        self.history.list(tx, id).await
    }

    async fn transition(
        &self,
        tx: &mut Tx,
        mut claim: Claim,
        target: ClaimStatus,
        actor: UserId,
        approved_by: Option<UserId>,
    ) -> Result<Claim, ClaimError> {
        let previous = claim.transition_to(target)?;
        if approved_by.is_some() {
            claim.approved_by = approved_by;
        }

        self.repos
            .claims
            .update_status(tx, claim.id, target, claim.approved_by)
            .await?;
        self.history.record(tx, claim.id, target, actor).await?;

        info!(claim_id = %claim.id, from = %previous, to = %target, actor = %actor, "claim status changed");
        Ok(claim)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use core_kernel::{OperationMetadata, PartCategoryId, PartId};
    use crate::attachment::AttachmentUpload;
    use crate::item::{CreateClaimItem, ItemType};
    use crate::mock::{MemoryBackend, MemoryObjectStore, MemoryUnitOfWork};
    use crate::ports::{TransactionManager, UnitOfWork};
    use crate::services::ClaimServices;

    use super::*;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    fn create_cmd() -> CreateClaim {
        CreateClaim {
            vehicle_id: VehicleId::new(),
            customer_id: CustomerId::new(),
            description: "Motor whine above 80 km/h".to_string(),
        }
    }

    fn item_cmd(cost: Decimal) -> CreateClaimItem {
        CreateClaimItem {
            part_category_id: PartCategoryId::new(),
            faulty_part_id: PartId::new(),
            replacement_part_id: None,
            issue_description: "Bearing noise".to_string(),
            item_type: ItemType::Repair,
            cost,
        }
    }

    struct Fixture {
        backend: MemoryBackend,
        services: ClaimServices<MemoryUnitOfWork>,
        actor: UserId,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_backend(MemoryBackend::new())
        }

        fn with_backend(backend: MemoryBackend) -> Self {
            let services = backend.services(ClaimPolicy::default());
            Self {
                backend,
                services,
                actor: UserId::new(),
            }
        }

        /// A draft claim with `items` items and `attachments` attachments
        async fn populated_draft(&self, tx: &mut MemoryUnitOfWork, items: usize, attachments: usize) -> Claim {
            let claim = self.services.workflow.create(tx, create_cmd(), self.actor).await.unwrap();
            for _ in 0..items {
                self.services.items.create(tx, claim.id, item_cmd(dec!(100))).await.unwrap();
            }
            for _ in 0..attachments {
                let upload = AttachmentUpload::new(None, JPEG.to_vec());
                self.services.attachments.create(tx, claim.id, upload).await.unwrap();
            }
            claim
        }

        /// A submitted claim moved into review
        async fn reviewing(&self, tx: &mut MemoryUnitOfWork, items: usize) -> Claim {
            let claim = self.populated_draft(tx, items, 3).await;
            self.services.workflow.submit(tx, claim.id, self.actor).await.unwrap();
            self.services
                .workflow
                .update_status(tx, claim.id, ClaimStatus::Reviewing, self.actor)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;

        let created = fx.services.workflow.create(&mut tx, create_cmd(), fx.actor).await.unwrap();
        let fetched = fx.services.workflow.get(&mut tx, created.id).await.unwrap();
        let history = fx.services.workflow.history(&mut tx, created.id).await.unwrap();

        assert_eq!(fetched.status, ClaimStatus::Draft);
        assert!(fetched.total_cost.is_zero());
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, ClaimStatus::Draft);
        assert_eq!(history[0].changed_by, fx.actor);
    }

    #[tokio::test]
    async fn test_create_is_atomic_when_history_fails() {
        let fx = Fixture::with_backend(MemoryBackend::new().with_failing_history());
        let services = fx.services.clone();
        let actor = fx.actor;

        let result = fx
            .backend
            .transaction_manager()
            .run(OperationMetadata::default(), move |tx| {
                Box::pin(async move { services.workflow.create(tx, create_cmd(), actor).await })
            })
            .await;

        assert!(matches!(result, Err(ClaimError::OperationFailed(_))));
        assert!(fx.backend.snapshot().await.claims.is_empty());
    }

    #[tokio::test]
    async fn test_update_only_while_editable() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.populated_draft(&mut tx, 1, 3).await;

        let updated = fx
            .services
            .workflow
            .update(&mut tx, claim.id, "Motor whine at any speed".to_string())
            .await
            .unwrap();
        assert_eq!(updated.description, "Motor whine at any speed");

        fx.services.workflow.submit(&mut tx, claim.id, fx.actor).await.unwrap();
        let err = fx
            .services
            .workflow
            .update(&mut tx, claim.id, "too late".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CLAIM_STATUS_NOT_ALLOWED_UPDATE");
    }

    #[tokio::test]
    async fn test_submit_requires_items_and_attachments() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;

        let no_items = fx.populated_draft(&mut tx, 0, 3).await;
        let err = fx.services.workflow.submit(&mut tx, no_items.id, fx.actor).await.unwrap_err();
        assert!(matches!(err, ClaimError::MissingInformation { items: 0, .. }));

        let few_attachments = fx.populated_draft(&mut tx, 2, 2).await;
        let err = fx
            .services
            .workflow
            .submit(&mut tx, few_attachments.id, fx.actor)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClaimError::MissingInformation { attachments: 2, required_attachments: 3, .. }
        ));
        let stored = fx.services.workflow.get(&mut tx, few_attachments.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Draft);

        let ready = fx.populated_draft(&mut tx, 1, 3).await;
        let submitted = fx.services.workflow.submit(&mut tx, ready.id, fx.actor).await.unwrap();
        assert_eq!(submitted.status, ClaimStatus::Submitted);
    }

    #[tokio::test]
    async fn test_submit_from_review_is_invalid_action() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.reviewing(&mut tx, 1).await;

        let err = fx.services.workflow.submit(&mut tx, claim.id, fx.actor).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidClaimAction(_)));
    }

    #[tokio::test]
    async fn test_resubmit_after_request_info() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.reviewing(&mut tx, 1).await;

        fx.services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::RequestInfo, fx.actor)
            .await
            .unwrap();
        fx.services.items.create(&mut tx, claim.id, item_cmd(dec!(50))).await.unwrap();
        let resubmitted = fx.services.workflow.submit(&mut tx, claim.id, fx.actor).await.unwrap();
        assert_eq!(resubmitted.status, ClaimStatus::Submitted);

        let statuses: Vec<_> = fx
            .services
            .workflow
            .history(&mut tx, claim.id)
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                ClaimStatus::Draft,
                ClaimStatus::Submitted,
                ClaimStatus::Reviewing,
                ClaimStatus::RequestInfo,
                ClaimStatus::Submitted,
            ]
        );
    }

    #[tokio::test]
    async fn test_complete_with_mixed_decisions() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.reviewing(&mut tx, 2).await;
        let items = fx.services.items.list(&mut tx, claim.id).await.unwrap();

        fx.services.items.approve(&mut tx, claim.id, items[0].id).await.unwrap();
        fx.services.items.reject(&mut tx, claim.id, items[1].id).await.unwrap();
        let before = fx.services.workflow.history(&mut tx, claim.id).await.unwrap().len();

        let completed = fx.services.workflow.complete(&mut tx, claim.id, fx.actor).await.unwrap();
        assert_eq!(completed.status, ClaimStatus::PartiallyApproved);
        assert_eq!(completed.approved_by, Some(fx.actor));
        assert_eq!(completed.total_cost.amount(), dec!(100));

        let after = fx.services.workflow.history(&mut tx, claim.id).await.unwrap();
        assert_eq!(after.len(), before + 1);
        assert_eq!(after[after.len() - 1].status, ClaimStatus::PartiallyApproved);
    }

    #[tokio::test]
    async fn test_complete_rejects_pending_items() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.reviewing(&mut tx, 2).await;
        let items = fx.services.items.list(&mut tx, claim.id).await.unwrap();
        fx.services.items.approve(&mut tx, claim.id, items[0].id).await.unwrap();

        let err = fx.services.workflow.complete(&mut tx, claim.id, fx.actor).await.unwrap_err();
        assert!(matches!(err, ClaimError::InvalidClaimAction(_)));
        let stored = fx.services.workflow.get(&mut tx, claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Reviewing);
    }

    #[tokio::test]
    async fn test_update_status_follows_table() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.populated_draft(&mut tx, 1, 3).await;

        let err = fx
            .services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::Completed, fx.actor)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CLAIM_ACTION");

        fx.services.workflow.submit(&mut tx, claim.id, fx.actor).await.unwrap();
        let cancelled = fx
            .services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::Cancelled, fx.actor)
            .await
            .unwrap();
        assert_eq!(cancelled.status, ClaimStatus::Cancelled);
        assert!(fx
            .services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::Submitted, fx.actor)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_update_status_cannot_skip_submission_checks() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.populated_draft(&mut tx, 0, 0).await;

        let err = fx
            .services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::Submitted, fx.actor)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::MissingInformation { items: 0, attachments: 0, .. }));
        let stored = fx.services.workflow.get(&mut tx, claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Draft);
    }

    #[tokio::test]
    async fn test_update_status_cannot_skip_review_checks() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.reviewing(&mut tx, 2).await;
        let items = fx.services.items.list(&mut tx, claim.id).await.unwrap();

        let err = fx
            .services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::Approved, fx.actor)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidClaimAction(_)));

        fx.services.items.approve(&mut tx, claim.id, items[0].id).await.unwrap();
        fx.services.items.reject(&mut tx, claim.id, items[1].id).await.unwrap();
        let err = fx
            .services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::Approved, fx.actor)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidClaimAction(_)));
        let stored = fx.services.workflow.get(&mut tx, claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Reviewing);

        let decided = fx
            .services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::PartiallyApproved, fx.actor)
            .await
            .unwrap();
        assert_eq!(decided.status, ClaimStatus::PartiallyApproved);
        assert_eq!(decided.approved_by, Some(fx.actor));
    }

    #[tokio::test]
    async fn test_hard_delete_draft_removes_children_and_objects() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.populated_draft(&mut tx, 2, 3).await;
        assert_eq!(fx.backend.store().len().await, 3);

        let orphaned = fx.services.workflow.hard_delete(&mut tx, claim.id).await.unwrap();

        let state = tx.state();
        assert!(state.claims.is_empty());
        assert!(state.items.is_empty());
        assert!(state.attachments.is_empty());
        assert!(state.history.is_empty());
        assert_eq!(orphaned.len(), 3);
        assert_eq!(fx.backend.store().len().await, 3);

        tx.commit().await.unwrap();
        fx.services.attachments.discard_objects(orphaned).await;
        assert!(fx.backend.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_rolled_back_hard_delete_keeps_objects() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.populated_draft(&mut tx, 1, 3).await;
        tx.commit().await.unwrap();

        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let orphaned = fx.services.workflow.hard_delete(&mut tx, claim.id).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(orphaned.len(), 3);
        let committed = fx.backend.snapshot().await;
        assert_eq!(committed.attachments.len(), 3);
        for attachment in committed.attachments.values() {
            assert!(fx.backend.store().contains(&attachment.url).await);
        }
    }

    #[tokio::test]
    async fn test_hard_delete_tolerates_store_failures() {
        let backend = MemoryBackend::new().with_store(MemoryObjectStore::new().failing_deletes());
        let fx = Fixture::with_backend(backend);
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.populated_draft(&mut tx, 1, 3).await;

        let orphaned = fx.services.workflow.hard_delete(&mut tx, claim.id).await.unwrap();
        tx.commit().await.unwrap();
        fx.services.attachments.discard_objects(orphaned).await;

        assert!(fx.backend.snapshot().await.claims.is_empty());
        assert_eq!(fx.backend.store().len().await, 3);
    }

    #[tokio::test]
    async fn test_hard_delete_refused_after_submit() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.populated_draft(&mut tx, 1, 3).await;
        fx.services.workflow.submit(&mut tx, claim.id, fx.actor).await.unwrap();

        let err = fx.services.workflow.hard_delete(&mut tx, claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::StatusNotAllowedDelete { status: ClaimStatus::Submitted }));
        assert_eq!(tx.state().items.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete_cascades_tombstones() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let claim = fx.populated_draft(&mut tx, 1, 3).await;

        let err = fx.services.workflow.soft_delete(&mut tx, claim.id).await.unwrap_err();
        assert!(matches!(err, ClaimError::StatusNotAllowedDelete { status: ClaimStatus::Draft }));

        fx.services.workflow.submit(&mut tx, claim.id, fx.actor).await.unwrap();
        fx.services
            .workflow
            .update_status(&mut tx, claim.id, ClaimStatus::Cancelled, fx.actor)
            .await
            .unwrap();
        fx.services.workflow.soft_delete(&mut tx, claim.id).await.unwrap();

        let state = tx.state();
        assert!(state.claims.values().all(|c| c.deleted_at.is_some()));
        assert!(state.items.values().all(|i| i.deleted_at.is_some()));
        assert!(state.attachments.values().all(|a| a.deleted_at.is_some()));
        assert!(state.history.iter().all(|h| h.deleted_at.is_some()));

        let err = fx.services.workflow.get(&mut tx, claim.id).await.unwrap_err();
        assert_eq!(err.code(), "CLAIM_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let fx = Fixture::new();
        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let customer = CustomerId::new();
        for _ in 0..3 {
            let cmd = CreateClaim { customer_id: customer, ..create_cmd() };
            fx.services.workflow.create(&mut tx, cmd, fx.actor).await.unwrap();
        }
        fx.services.workflow.create(&mut tx, create_cmd(), fx.actor).await.unwrap();

        let filter = ClaimFilter::by_customer(customer);
        let page = fx
            .services
            .workflow
            .list(&mut tx, &filter, &Pagination::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);

        let all = fx
            .services
            .workflow
            .list(&mut tx, &ClaimFilter::default(), &Pagination::unpaged())
            .await
            .unwrap();
        assert_eq!(all.items.len(), 4);
        assert_eq!(all.total_pages, 0);
    }

    #[tokio::test]
    async fn test_committed_transaction_is_visible() {
        let fx = Fixture::new();
        let services = fx.services.clone();
        let actor = fx.actor;

        let claim = fx
            .backend
            .transaction_manager()
            .run(OperationMetadata::with_correlation_id("req-1"), move |tx| {
                Box::pin(async move { services.workflow.create(tx, create_cmd(), actor).await })
            })
            .await
            .unwrap();

        let mut tx = fx.backend.begin(OperationMetadata::default()).await;
        let fetched = fx.services.workflow.get(&mut tx, claim.id).await.unwrap();
        assert_eq!(fetched.id, claim.id);
        tx.rollback().await.unwrap();
    }
}
