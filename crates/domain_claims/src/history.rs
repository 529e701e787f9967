//! Append-only claim status audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, HistoryId, UserId};
use crate::claim::ClaimStatus;

/// One accepted status change of a claim
///
/// Entries are written once and never updated; the only later change is the
/// tombstone set when the parent claim is soft deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimHistory {
    pub id: HistoryId,
    pub claim_id: ClaimId,
    /// Status the claim entered
    pub status: ClaimStatus,
    /// Actor who caused the change
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ClaimHistory {
    pub fn record(claim_id: ClaimId, status: ClaimStatus, changed_by: UserId) -> Self {
        Self {
            id: HistoryId::new_v7(),
            claim_id,
            status,
            changed_by,
            changed_at: Utc::now(),
            deleted_at: None,
        }
    }
}
