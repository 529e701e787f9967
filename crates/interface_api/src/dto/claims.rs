//! Claims DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{CustomerId, VehicleId};
use domain_claims::claim::{Claim, ClaimStatus};
use domain_claims::error::ClaimError;
use domain_claims::history::ClaimHistory;
use domain_claims::query::{ClaimFilter, Page, Pagination, SortDirection, SortField, DEFAULT_PAGE_SIZE};
use domain_claims::services::CreateClaim;

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClaimRequest {
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 4000, message = "must be between 1 and 4000 characters"))]
    pub description: String,
}

impl From<CreateClaimRequest> for CreateClaim {
    fn from(request: CreateClaimRequest) -> Self {
        CreateClaim {
            vehicle_id: VehicleId::from_uuid(request.vehicle_id),
            customer_id: CustomerId::from_uuid(request.customer_id),
            description: request.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClaimRequest {
    #[validate(length(min = 1, max = 4000, message = "must be between 1 and 4000 characters"))]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

impl UpdateStatusRequest {
    /// Unrecognised names are rejected as invalid input
    pub fn target(&self) -> Result<ClaimStatus, ClaimError> {
        self.status.parse()
    }
}

/// Query string of `GET /claims`
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListClaimsQuery {
    pub customer_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub status: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    /// 0 returns every match on one page
    #[validate(range(max = 100))]
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub direction: Option<String>,
}

impl ListClaimsQuery {
    pub fn filter(&self) -> Result<ClaimFilter, ClaimError> {
        let status = self.status.as_deref().map(str::parse).transpose()?;
        Ok(ClaimFilter {
            customer_id: self.customer_id.map(CustomerId::from_uuid),
            vehicle_id: self.vehicle_id.map(VehicleId::from_uuid),
            status,
            created_from: self.created_from,
            created_to: self.created_to,
        })
    }

    pub fn pagination(&self) -> Result<Pagination, ClaimError> {
        let sort_by: SortField = self.sort_by.as_deref().map(str::parse).transpose()?.unwrap_or_default();
        let direction: SortDirection = self.direction.as_deref().map(str::parse).transpose()?.unwrap_or_default();
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        Ok(Pagination::new(self.page.unwrap_or(1), page_size).sorted(sort_by, direction))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    pub description: String,
    pub status: ClaimStatus,
    pub total_cost: Decimal,
    pub currency: String,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Claim> for ClaimResponse {
    fn from(claim: Claim) -> Self {
        ClaimResponse {
            id: claim.id.into(),
            vehicle_id: claim.vehicle_id.into(),
            customer_id: claim.customer_id.into(),
            currency: claim.currency().code().to_string(),
            total_cost: claim.total_cost.amount(),
            description: claim.description,
            status: claim.status,
            approved_by: claim.approved_by.map(Uuid::from),
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T, D: From<T>> From<Page<T>> for PageResponse<D> {
    fn from(page: Page<T>) -> Self {
        PageResponse {
            items: page.items.into_iter().map(D::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub id: Uuid,
    pub status: ClaimStatus,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
}

impl From<ClaimHistory> for HistoryResponse {
    fn from(entry: ClaimHistory) -> Self {
        HistoryResponse {
            id: entry.id.into(),
            status: entry.status,
            changed_by: entry.changed_by.into(),
            changed_at: entry.changed_at,
        }
    }
}
