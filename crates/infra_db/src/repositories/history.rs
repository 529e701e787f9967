//! Claim status history repository implementation
//!
//! Insert-only apart from tombstoning; there is no UPDATE of a recorded
//! status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use core_kernel::{ClaimId, DomainPort, HistoryId, PortError, UserId};
use domain_claims::history::ClaimHistory;
use domain_claims::ports::ClaimHistoryRepository;

use crate::error::port_error;
use crate::repositories::PgClaimStatus;
use crate::transaction::PgUnitOfWork;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimHistoryRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub status: PgClaimStatus,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ClaimHistoryRow> for ClaimHistory {
    fn from(row: ClaimHistoryRow) -> Self {
        ClaimHistory {
            id: HistoryId::from_uuid(row.id),
            claim_id: ClaimId::from_uuid(row.claim_id),
            status: row.status.into(),
            changed_by: UserId::from_uuid(row.changed_by),
            changed_at: row.changed_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PgClaimHistoryRepository;

impl DomainPort for PgClaimHistoryRepository {}

#[async_trait]
impl ClaimHistoryRepository<PgUnitOfWork> for PgClaimHistoryRepository {
    async fn create(&self, tx: &mut PgUnitOfWork, entry: &ClaimHistory) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claim_history (id, claim_id, status, changed_by, changed_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*entry.id.as_uuid())
        .bind(*entry.claim_id.as_uuid())
        .bind(PgClaimStatus::from(entry.status))
        .bind(*entry.changed_by.as_uuid())
        .bind(entry.changed_at)
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(())
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        sqlx::query(
            "UPDATE claim_history SET deleted_at = now() WHERE claim_id = $1 AND deleted_at IS NULL",
        )
        .bind(*claim_id.as_uuid())
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(())
    }

    async fn hard_delete_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        sqlx::query("DELETE FROM claim_history WHERE claim_id = $1")
            .bind(*claim_id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(port_error)?;
        Ok(())
    }

    async fn find_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<Vec<ClaimHistory>, PortError> {
        // v7 ids are time-ordered, which breaks ties between entries written
        // in the same microsecond
        let rows = sqlx::query_as::<_, ClaimHistoryRow>(
            "SELECT * FROM claim_history WHERE claim_id = $1 AND deleted_at IS NULL ORDER BY changed_at, id",
        )
        .bind(*claim_id.as_uuid())
        .fetch_all(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(rows.into_iter().map(ClaimHistory::from).collect())
    }
}
