//! Claim item manager
//!
//! Owns the line items of a claim and keeps `Claim::total_cost` equal to the
//! sum of approved item costs. Every mutating operation runs the same steps:
//!
//! 1. lock the claim row
//! 2. check the claim status precondition
//! 3. load and mutate the item
//! 4. recompute the aggregate from storage
//! 5. persist the claim
//!
//! Any failing step returns an error, and the caller rolls back the whole
//! unit of work, so the total can never drift from the items.

use std::sync::Arc;

use tracing::{info, instrument};

use core_kernel::{ClaimId, ClaimItemId, Money};
use crate::claim::Claim;
use crate::error::ClaimError;
use crate::item::{ClaimItem, CreateClaimItem, ItemStatus, UpdateClaimItem};
use crate::ports::{ClaimItemRepository, ClaimRepository, UnitOfWork};

pub struct ClaimItemManager<Tx: UnitOfWork> {
    claims: Arc<dyn ClaimRepository<Tx>>,
    items: Arc<dyn ClaimItemRepository<Tx>>,
}

impl<Tx: UnitOfWork> Clone for ClaimItemManager<Tx> {
    fn clone(&self) -> Self {
        Self {
            claims: Arc::clone(&self.claims),
            items: Arc::clone(&self.items),
        }
    }
}

impl<Tx: UnitOfWork> ClaimItemManager<Tx> {
    pub fn new(claims: Arc<dyn ClaimRepository<Tx>>, items: Arc<dyn ClaimItemRepository<Tx>>) -> Self {
        Self { claims, items }
    }

    /// Adds a pending item to an editable claim
    ///
    /// Pending items do not count towards the total, so the aggregate is
    /// left untouched.
    #[instrument(skip(self, tx, cmd), fields(claim_id = %claim_id))]
    pub async fn create(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        cmd: CreateClaimItem,
    ) -> Result<ClaimItem, ClaimError> {
        let claim = self.claims.lock_by_id(tx, claim_id).await?;
        claim.ensure_editable()?;

        let item = ClaimItem::new(claim.id, cmd, claim.currency())?;
        self.items.create(tx, &item).await?;

        info!(item_id = %item.id, item_type = %item.item_type, "claim item created");
        Ok(item)
    }

    /// Edits a pending item of an editable claim
    #[instrument(skip(self, tx, cmd), fields(claim_id = %claim_id, item_id = %item_id))]
    pub async fn update(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        item_id: ClaimItemId,
        cmd: UpdateClaimItem,
    ) -> Result<ClaimItem, ClaimError> {
        let claim = self.claims.lock_by_id(tx, claim_id).await?;
        claim.ensure_editable()?;

        let mut item = self.load_item(tx, claim_id, item_id).await?;
        item.apply_update(cmd)?;
        self.items.update(tx, &item).await?;

        self.recompute_total(tx, claim).await?;
        Ok(item)
    }

    /// Removes an item from a draft claim
    #[instrument(skip(self, tx), fields(claim_id = %claim_id, item_id = %item_id))]
    pub async fn hard_delete(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        item_id: ClaimItemId,
    ) -> Result<(), ClaimError> {
        let claim = self.claims.lock_by_id(tx, claim_id).await?;
        claim.ensure_hard_deletable()?;

        let item = self.load_item(tx, claim_id, item_id).await?;
        self.items.hard_delete(tx, item.id).await?;

        self.recompute_total(tx, claim).await?;
        info!("claim item deleted");
        Ok(())
    }

    /// Approves an item of a claim under review
    pub async fn approve(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        item_id: ClaimItemId,
    ) -> Result<ClaimItem, ClaimError> {
        self.decide(tx, claim_id, item_id, ItemStatus::Approved).await
    }

    /// Rejects an item of a claim under review
    pub async fn reject(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        item_id: ClaimItemId,
    ) -> Result<ClaimItem, ClaimError> {
        self.decide(tx, claim_id, item_id, ItemStatus::Rejected).await
    }

    /// Items of a claim that is not deleted
    pub async fn list(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Vec<ClaimItem>, ClaimError> {
        self.claims.find_by_id(tx, claim_id).await?;
        Ok(self.items.find_by_claim_id(tx, claim_id).await?)
    }

    pub async fn get(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        item_id: ClaimItemId,
    ) -> Result<ClaimItem, ClaimError> {
        self.claims.find_by_id(tx, claim_id).await?;
        self.load_item(tx, claim_id, item_id).await
    }

    #[instrument(skip(self, tx), fields(claim_id = %claim_id, item_id = %item_id, decision = %decision))]
    async fn decide(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        item_id: ClaimItemId,
        decision: ItemStatus,
    ) -> Result<ClaimItem, ClaimError> {
        let claim = self.claims.lock_by_id(tx, claim_id).await?;
        claim.ensure_reviewing()?;

        let mut item = self.load_item(tx, claim_id, item_id).await?;
        let previous = item.status;
        self.items.update_status(tx, item.id, decision).await?;
        item.decide(decision);

        let claim = self.recompute_total(tx, claim).await?;
        info!(from = %previous, to = %decision, total_cost = %claim.total_cost, "claim item decided");
        Ok(item)
    }

    /// Items of other claims are reported as missing
    async fn load_item(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        item_id: ClaimItemId,
    ) -> Result<ClaimItem, ClaimError> {
        let item = self.items.find_by_id(tx, item_id).await?;
        if item.claim_id != claim_id {
            return Err(ClaimError::item_not_found(item_id));
        }
        Ok(item)
    }

    /// Rebuilds the claim total from the approved items in storage
    async fn recompute_total(&self, tx: &mut Tx, mut claim: Claim) -> Result<Claim, ClaimError> {
        let sum = self.items.sum_cost_by_claim_id(tx, claim.id).await?;
        claim.apply_total_cost(Money::new(sum, claim.currency()));
        self.claims.update(tx, &claim).await?;
        Ok(claim)
    }
}
