//! Claims repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use core_kernel::{ClaimId, DomainPort, Money, PortError, UserId};
use domain_claims::claim::{Claim, ClaimStatus};
use domain_claims::ports::ClaimRepository;
use domain_claims::query::{ClaimFilter, Pagination};

use crate::error::port_error;
use crate::repositories::{expect_affected, parse_currency, PgClaimStatus};
use crate::transaction::PgUnitOfWork;

const CLAIM_COLUMNS: &str = "id, vehicle_id, customer_id, description, status, total_cost, \
     currency, approved_by, created_at, updated_at, deleted_at";

/// Database row for the claims table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClaimRow {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    pub description: String,
    pub status: PgClaimStatus,
    pub total_cost: Decimal,
    pub currency: String,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ClaimRow {
    pub fn into_domain(self) -> Result<Claim, PortError> {
        let currency = parse_currency(&self.currency)?;
        Ok(Claim {
            id: ClaimId::from_uuid(self.id),
            vehicle_id: self.vehicle_id.into(),
            customer_id: self.customer_id.into(),
            description: self.description,
            status: self.status.into(),
            total_cost: Money::new(self.total_cost, currency),
            approved_by: self.approved_by.map(UserId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

/// PostgreSQL storage for claim aggregates
#[derive(Debug, Clone, Copy, Default)]
pub struct PgClaimRepository;

impl DomainPort for PgClaimRepository {}

impl PgClaimRepository {
    async fn fetch_live(
        &self,
        tx: &mut PgUnitOfWork,
        id: ClaimId,
        for_update: bool,
    ) -> Result<Claim, PortError> {
        let mut sql = format!(
            "SELECT {} FROM claims WHERE id = $1 AND deleted_at IS NULL",
            CLAIM_COLUMNS
        );
        if for_update {
            sql.push_str(" FOR UPDATE");
        }

        sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(*id.as_uuid())
            .fetch_optional(tx.conn())
            .await
            .map_err(port_error)?
            .ok_or_else(|| PortError::not_found("Claim", id))?
            .into_domain()
    }
}

/// Appends the WHERE clause shared by the page and count queries
fn push_filters(builder: &mut QueryBuilder<'static, Postgres>, filter: &ClaimFilter) {
    builder.push(" WHERE deleted_at IS NULL");

    if let Some(customer_id) = filter.customer_id {
        builder.push(" AND customer_id = ").push_bind(*customer_id.as_uuid());
    }
    if let Some(vehicle_id) = filter.vehicle_id {
        builder.push(" AND vehicle_id = ").push_bind(*vehicle_id.as_uuid());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(PgClaimStatus::from(status));
    }
    if let Some(from) = filter.created_from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
}

/// Builds the query returning one sorted page of live claims
pub fn page_query(filter: &ClaimFilter, pagination: &Pagination) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM claims", CLAIM_COLUMNS));
    push_filters(&mut builder, filter);

    // column and keyword come from closed enums, never from user text
    let direction = pagination.direction.keyword();
    builder.push(format!(
        " ORDER BY {} {}, id {}",
        pagination.sort_by.column(),
        direction,
        direction
    ));

    if !pagination.is_disabled() {
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(pagination.page_size))
            .push(" OFFSET ")
            .push_bind(pagination.offset() as i64);
    }
    builder
}

/// Builds the query counting every live claim that matches the filter
pub fn count_query(filter: &ClaimFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM claims");
    push_filters(&mut builder, filter);
    builder
}

#[async_trait]
impl ClaimRepository<PgUnitOfWork> for PgClaimRepository {
    #[instrument(skip(self, tx, claim), fields(claim_id = %claim.id))]
    async fn create(&self, tx: &mut PgUnitOfWork, claim: &Claim) -> Result<(), PortError> {
        sqlx::query(
            r#"
            INSERT INTO claims (
                id, vehicle_id, customer_id, description, status, total_cost,
                currency, approved_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(*claim.id.as_uuid())
        .bind(*claim.vehicle_id.as_uuid())
        .bind(*claim.customer_id.as_uuid())
        .bind(&claim.description)
        .bind(PgClaimStatus::from(claim.status))
        .bind(claim.total_cost.amount())
        .bind(claim.currency().code())
        .bind(claim.approved_by.map(Uuid::from))
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        Ok(())
    }

    async fn find_by_id(&self, tx: &mut PgUnitOfWork, id: ClaimId) -> Result<Claim, PortError> {
        self.fetch_live(tx, id, false).await
    }

    #[instrument(skip(self, tx), fields(claim_id = %id))]
    async fn lock_by_id(&self, tx: &mut PgUnitOfWork, id: ClaimId) -> Result<Claim, PortError> {
        self.fetch_live(tx, id, true).await
    }

    #[instrument(skip(self, tx, filter), fields(page = pagination.page, page_size = pagination.page_size))]
    async fn find_all(
        &self,
        tx: &mut PgUnitOfWork,
        filter: &ClaimFilter,
        pagination: &Pagination,
    ) -> Result<(Vec<Claim>, u64), PortError> {
        let mut count = count_query(filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(tx.conn())
            .await
            .map_err(port_error)?;

        let mut page = page_query(filter, pagination);
        let rows = page
            .build_query_as::<ClaimRow>()
            .fetch_all(tx.conn())
            .await
            .map_err(port_error)?;

        let claims = rows
            .into_iter()
            .map(ClaimRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((claims, total.max(0) as u64))
    }

    async fn update(&self, tx: &mut PgUnitOfWork, claim: &Claim) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET description = $2, total_cost = $3, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(*claim.id.as_uuid())
        .bind(&claim.description)
        .bind(claim.total_cost.amount())
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        expect_affected(result.rows_affected(), "Claim", claim.id)
    }

    async fn update_status(
        &self,
        tx: &mut PgUnitOfWork,
        id: ClaimId,
        status: ClaimStatus,
        approved_by: Option<UserId>,
    ) -> Result<(), PortError> {
        let result = sqlx::query(
            r#"
            UPDATE claims
            SET status = $2, approved_by = $3, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(*id.as_uuid())
        .bind(PgClaimStatus::from(status))
        .bind(approved_by.map(Uuid::from))
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        expect_affected(result.rows_affected(), "Claim", id)
    }

    async fn hard_delete(&self, tx: &mut PgUnitOfWork, id: ClaimId) -> Result<(), PortError> {
        let result = sqlx::query("DELETE FROM claims WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(tx.conn())
            .await
            .map_err(port_error)?;
        expect_affected(result.rows_affected(), "Claim", id)
    }

    async fn soft_delete(&self, tx: &mut PgUnitOfWork, id: ClaimId) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE claims SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(*id.as_uuid())
        .execute(tx.conn())
        .await
        .map_err(port_error)?;
        expect_affected(result.rows_affected(), "Claim", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::CustomerId;
    use domain_claims::query::{SortDirection, SortField};

    #[test]
    fn test_unfiltered_page_query() {
        let query = page_query(&ClaimFilter::default(), &Pagination::default());
        let sql = query.sql();

        assert!(sql.starts_with("SELECT id, vehicle_id"));
        assert!(sql.contains("WHERE deleted_at IS NULL ORDER BY created_at DESC, id DESC"));
        assert!(sql.ends_with("LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn test_filters_bind_in_order() {
        let filter = ClaimFilter {
            customer_id: Some(CustomerId::new()),
            status: Some(ClaimStatus::Submitted),
            ..Default::default()
        };
        let pagination = Pagination::new(2, 10).sorted(SortField::TotalCost, SortDirection::Asc);
        let query = page_query(&filter, &pagination);
        let sql = query.sql();

        assert!(sql.contains("AND customer_id = $1 AND status = $2"));
        assert!(sql.contains("ORDER BY total_cost ASC, id ASC"));
        assert!(sql.ends_with("LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn test_unpaged_query_has_no_limit() {
        let query = page_query(&ClaimFilter::default(), &Pagination::unpaged());
        assert!(!query.sql().contains("LIMIT"));
    }

    #[test]
    fn test_count_query_shares_filters() {
        let filter = ClaimFilter {
            created_from: Some(Utc::now()),
            ..Default::default()
        };
        let query = count_query(&filter);
        assert_eq!(
            query.sql(),
            "SELECT COUNT(*) FROM claims WHERE deleted_at IS NULL AND created_at >= $1"
        );
    }
}
