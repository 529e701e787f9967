//! Claim history recorder

use std::sync::Arc;

use tracing::{debug, instrument};

use core_kernel::{ClaimId, UserId};
use crate::claim::ClaimStatus;
use crate::error::ClaimError;
use crate::history::ClaimHistory;
use crate::ports::{ClaimHistoryRepository, UnitOfWork};

/// Appends one audit entry per accepted status change
///
/// There is no update path; a later status always produces a new entry.
pub struct ClaimHistoryRecorder<Tx: UnitOfWork> {
    history: Arc<dyn ClaimHistoryRepository<Tx>>,
}

impl<Tx: UnitOfWork> Clone for ClaimHistoryRecorder<Tx> {
    fn clone(&self) -> Self {
        Self {
            history: Arc::clone(&self.history),
        }
    }
}

impl<Tx: UnitOfWork> ClaimHistoryRecorder<Tx> {
    pub fn new(history: Arc<dyn ClaimHistoryRepository<Tx>>) -> Self {
        Self { history }
    }

    /// Appends an entry recording that `claim_id` entered `status`
    #[instrument(skip(self, tx), fields(claim_id = %claim_id, status = %status))]
    pub async fn record(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        status: ClaimStatus,
        changed_by: UserId,
    ) -> Result<ClaimHistory, ClaimError> {
        let entry = ClaimHistory::record(claim_id, status, changed_by);
        self.history.create(tx, &entry).await?;
        debug!(history_id = %entry.id, "history entry appended");
        Ok(entry)
    }

    /// Tombstones every entry of a claim
    pub async fn soft_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<(), ClaimError> {
        self.history.soft_delete_by_claim_id(tx, claim_id).await?;
        Ok(())
    }

    pub(crate) async fn hard_delete_by_claim_id(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<(), ClaimError> {
        self.history.hard_delete_by_claim_id(tx, claim_id).await?;
        Ok(())
    }

    /// Entries of a claim, oldest first
    pub async fn list(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, ClaimError> {
        Ok(self.history.find_by_claim_id(tx, claim_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::OperationMetadata;
    use crate::mock::MemoryBackend;

    #[tokio::test]
    async fn test_record_appends_in_order() {
        let backend = MemoryBackend::new();
        let recorder = ClaimHistoryRecorder::new(backend.repositories().history);
        let claim_id = ClaimId::new();
        let actor = UserId::new();

        let mut tx = backend.begin(OperationMetadata::default()).await;
        recorder.record(&mut tx, claim_id, ClaimStatus::Draft, actor).await.unwrap();
        recorder.record(&mut tx, claim_id, ClaimStatus::Submitted, actor).await.unwrap();

        let entries = recorder.list(&mut tx, claim_id).await.unwrap();
        let statuses: Vec<_> = entries.iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![ClaimStatus::Draft, ClaimStatus::Submitted]);
        assert!(entries.iter().all(|e| e.changed_by == actor));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_entries() {
        let backend = MemoryBackend::new();
        let recorder = ClaimHistoryRecorder::new(backend.repositories().history);
        let claim_id = ClaimId::new();
        let other_claim = ClaimId::new();
        let actor = UserId::new();

        let mut tx = backend.begin(OperationMetadata::default()).await;
        recorder.record(&mut tx, claim_id, ClaimStatus::Draft, actor).await.unwrap();
        recorder.record(&mut tx, other_claim, ClaimStatus::Draft, actor).await.unwrap();
        recorder.soft_delete_by_claim_id(&mut tx, claim_id).await.unwrap();

        assert!(recorder.list(&mut tx, claim_id).await.unwrap().is_empty());
        assert_eq!(recorder.list(&mut tx, other_claim).await.unwrap().len(), 1);
        assert_eq!(tx.state().history.len(), 2);
    }
}
