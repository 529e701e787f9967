//! Claim items repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{ClaimId, ClaimItemId, DomainPort, Money, PartId, PortError};
use domain_claims::item::{ClaimItem, ItemStatus};
use domain_claims::ports::ClaimItemRepository;

use crate::error::port_error;
use crate::repositories::{expect_affected, parse_currency, PgItemStatus, PgItemType};
use crate::transaction::PgUnitOfWork;

/// Database row for the claim_items table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimItemRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub part_category_id: Uuid,
    pub faulty_part_id: Uuid,
    pub replacement_part_id: Option<Uuid>,
    pub issue_description: String,
    pub status: PgItemStatus,
    pub item_type: PgItemType,
    pub cost: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ClaimItemRow {
    pub fn into_domain(self) -> Result<ClaimItem, PortError> {
        let currency = parse_currency(&self.currency)?;
        Ok(ClaimItem {
            id: ClaimItemId::from_uuid(self.id),
            claim_id: ClaimId::from_uuid(self.claim_id),
            part_category_id: self.part_category_id.into(),
            faulty_part_id: PartId::from_uuid(self.faulty_part_id),
            replacement_part_id: self.replacement_part_id.map(PartId::from_uuid),
            issue_description: self.issue_description,
            status: self.status.into(),
            item_type: self.item_type.into(),
            cost: Money::new(self.cost, currency),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

/// PostgreSQL storage for claim items
#[derive(Debug, Clone, Copy, Default)]
pub struct PgClaimItemRepository;

impl DomainPort for PgClaimItemRepository {}

#[async_trait]
impl ClaimItemRepository<PgUnitOfWork> for PgClaimItemRepository {
    #[instrument(skip(self, tx, item), fields(item_id = %item.id, claim_id = %item.claim_id))]
    async fn create(&self, tx: &mut PgUnitOfWork, item: &ClaimItem) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claim_items (
                id, claim_id, part_category_id, faulty_part_id, replacement_part_id,
                issue_description, status, item_type, cost, currency, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(*item.claim_id.as_uuid())
        .bind(*item.part_category_id.as_uuid())
        .bind(*item.faulty_part_id.as_uuid())
        .bind(item.replacement_part_id.map(Uuid::from))
        .bind(&item.issue_description)
        .bind(PgItemStatus::from(item.status))
        .bind(PgItemType::from(item.item_type))
        .bind(item.cost.amount())
        .bind(item.cost.currency().code())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(())
    }

    async fn update(&self, tx: &mut PgUnitOfWork, item: &ClaimItem) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"
            UPDATE claim_items
            SET part_category_id = $2,
                faulty_part_id = $3,
                replacement_part_id = $4,
                issue_description = $5,
                item_type = $6,
                cost = $7,
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(*item.part_category_id.as_uuid())
        .bind(*item.faulty_part_id.as_uuid())
        .bind(item.replacement_part_id.map(Uuid::from))
        .bind(&item.issue_description)
        .bind(PgItemType::from(item.item_type))
        .bind(item.cost.amount())
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        expect_affected(result.rows_affected(), "ClaimItem", item.id)
    }

    async fn update_status(
        &self,
        tx: &mut PgUnitOfWork,
        id: ClaimItemId,
        status: ItemStatus,
    ) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE claim_items SET status = $2, updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(*id.as_uuid())
        .bind(PgItemStatus::from(status))
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        expect_affected(result.rows_affected(), "ClaimItem", id)
    }

    async fn hard_delete(&self, tx: &mut PgUnitOfWork, id: ClaimItemId) -> Result<(), PortError> {
        let result = sqlx::query("DELETE FROM claim_items WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(port_error)?;
        expect_affected(result.rows_affected(), "ClaimItem", id)
    }

    async fn hard_delete_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        sqlx::query("DELETE FROM claim_items WHERE claim_id = $1")
            .bind(*claim_id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(port_error)?;
        Ok(())
    }

    async fn soft_delete_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<(), PortError> {
        sqlx::query(
            "UPDATE claim_items SET deleted_at = now() WHERE claim_id = $1 AND deleted_at IS NULL",
        )
        .bind(*claim_id.as_uuid())
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(())
    }

    async fn sum_cost_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<Decimal, PortError> {
        sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(cost), 0)
            FROM claim_items
            WHERE claim_id = $1 AND status = 'APPROVED' AND deleted_at IS NULL
            "#,
        )
        .bind(*claim_id.as_uuid())
        .fetch_one(tx.conn())
        .await
        .map_err(port_error)
    }

    async fn find_by_id(&self, tx: &mut PgUnitOfWork, id: ClaimItemId) -> Result<ClaimItem, PortError> {
        sqlx::query_as::<_, ClaimItemRow>(
            "SELECT * FROM claim_items WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(*id.as_uuid())
        .fetch_optional(tx.conn())
        .await
        .map_err(port_error)?
        .ok_or_else(|| PortError::not_found("ClaimItem", id))?
        .into_domain()
    }

    async fn find_by_claim_id(&self, tx: &mut PgUnitOfWork, claim_id: ClaimId) -> Result<Vec<ClaimItem>, PortError> {
        let rows = sqlx::query_as::<_, ClaimItemRow>(
            "SELECT * FROM claim_items WHERE claim_id = $1 AND deleted_at IS NULL ORDER BY created_at, id",
        )
        .bind(*claim_id.as_uuid())
        .fetch_all(tx.conn())
        .await
        .map_err(port_error)?;

        rows.into_iter().map(ClaimItemRow::into_domain).collect()
    }
}
