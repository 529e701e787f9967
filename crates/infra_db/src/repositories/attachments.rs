//! Claim attachment metadata repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{AttachmentId, ClaimId, DomainPort, PortError};
use domain_claims::attachment::ClaimAttachment;
use domain_claims::ports::ClaimAttachmentRepository;

use crate::error::port_error;
use crate::repositories::{expect_affected, PgAttachmentType};
use crate::transaction::PgUnitOfWork;

/// Database row for the claim_attachments table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimAttachmentRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub attachment_type: PgAttachmentType,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<ClaimAttachmentRow> for ClaimAttachment {
    fn from(row: ClaimAttachmentRow) -> Self {
        ClaimAttachment {
            id: AttachmentId::from_uuid(row.id),
            claim_id: ClaimId::from_uuid(row.claim_id),
            attachment_type: row.attachment_type.into(),
            url: row.url,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// PostgreSQL storage for attachment metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct PgClaimAttachmentRepository;

impl DomainPort for PgClaimAttachmentRepository {}

#[async_trait]
impl ClaimAttachmentRepository<PgUnitOfWork> for PgClaimAttachmentRepository {
    #[instrument(skip(self, tx, attachment), fields(attachment_id = %attachment.id))]
    async fn create(&self, tx: &mut PgUnitOfWork, attachment: &ClaimAttachment) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claim_attachments (id, claim_id, attachment_type, url, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*attachment.id.as_uuid())
        .bind(*attachment.claim_id.as_uuid())
        .bind(PgAttachmentType::from(attachment.attachment_type))
        .bind(&attachment.url)
        .bind(attachment.created_at)
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(())
    }

    async fn hard_delete(&self, tx: &mut PgUnitOfWork, id: AttachmentId) -> Result<(), PortError> {
        let result = sqlx::query("DELETE FROM claim_attachments WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(port_error)?;
        expect_affected(result.rows_affected(), "ClaimAttachment", id)
    }

    async fn hard_delete_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        sqlx::query("DELETE FROM claim_attachments WHERE claim_id = $1")
            .bind(*claim_id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(port_error)?;
        Ok(())
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        sqlx::query(
            "UPDATE claim_attachments SET deleted_at = now() WHERE claim_id = $1 AND deleted_at IS NULL",
        )
        .bind(*claim_id.as_uuid())
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut PgUnitOfWork, id: AttachmentId) -> Result<ClaimAttachment, PortError> {
        let row = sqlx::query_as::<_, ClaimAttachmentRow>(
            "SELECT * FROM claim_attachments WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(*id.as_uuid())
        .fetch_optional(tx.conn())
        .await
        .map_err(port_error)?
        .ok_or_else(|| PortError::not_found("ClaimAttachment", id))?;
        Ok(row.into())
    }

    async fn find_by_claim_id(
        &self,
        tx: &mut PgUnitOfWork,
        claim_id: ClaimId,
    ) -> Result<Vec<ClaimAttachment>, PortError> {
        let rows = sqlx::query_as::<_, ClaimAttachmentRow>(
            "SELECT * FROM claim_attachments WHERE claim_id = $1 AND deleted_at IS NULL ORDER BY created_at, id",
        )
        .bind(*claim_id.as_uuid())
        .fetch_all(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(rows.into_iter().map(ClaimAttachment::from).collect())
    }
}
