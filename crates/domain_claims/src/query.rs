//! Claim listing: filters, sorting and pagination

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CustomerId, VehicleId};
use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;

/// Default number of claims per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filters for listing claims; every set field must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimFilter {
    pub customer_id: Option<CustomerId>,
    pub vehicle_id: Option<VehicleId>,
    pub status: Option<ClaimStatus>,
    /// Inclusive lower bound on creation time
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time
    pub created_to: Option<DateTime<Utc>>,
}

impl ClaimFilter {
    pub fn by_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Default::default()
        }
    }

    pub fn by_status(status: ClaimStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// In-memory evaluation, used by adapters without a query language
    pub fn matches(&self, claim: &Claim) -> bool {
        if claim.deleted_at.is_some() {
            return false;
        }
        if self.customer_id.is_some_and(|id| id != claim.customer_id) {
            return false;
        }
        if self.vehicle_id.is_some_and(|id| id != claim.vehicle_id) {
            return false;
        }
        if self.status.is_some_and(|status| status != claim.status) {
            return false;
        }
        if self.created_from.is_some_and(|from| claim.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| claim.created_at > to) {
            return false;
        }
        true
    }
}

/// Column claims can be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Status,
    TotalCost,
}

impl SortField {
    /// Storage column backing the field
    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::Status => "status",
            SortField::TotalCost => "total_cost",
        }
    }
}

impl FromStr for SortField {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            "status" => Ok(SortField::Status),
            "total_cost" => Ok(SortField::TotalCost),
            _ => Err(ClaimError::invalid_input(format!("cannot sort claims by '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ClaimError::invalid_input(format!("unknown sort direction '{}'", s))),
        }
    }
}

/// Page request. A `page_size` of zero disables paging and returns every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortField,
    pub direction: SortDirection,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortField::default(),
            direction: SortDirection::default(),
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size,
            ..Default::default()
        }
    }

    /// Returns every matching row in one page
    pub fn unpaged() -> Self {
        Self::new(1, 0)
    }

    pub fn sorted(mut self, sort_by: SortField, direction: SortDirection) -> Self {
        self.sort_by = sort_by;
        self.direction = direction;
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.page_size == 0
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        if self.is_disabled() {
            return 0;
        }
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }
}

/// One page of results plus the total number of matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    /// Zero when paging is disabled
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        let total_pages = if pagination.is_disabled() {
            0
        } else {
            total.div_ceil(u64::from(pagination.page_size))
        };

        Self {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(Pagination::new(1, 20).offset(), 0);
        assert_eq!(Pagination::new(3, 20).offset(), 40);
        assert_eq!(Pagination::new(0, 10).offset(), 0);
        assert_eq!(Pagination::unpaged().offset(), 0);
    }

    #[test]
    fn test_total_pages() {
        let page: Page<u8> = Page::new(vec![], 41, &Pagination::new(1, 20));
        assert_eq!(page.total_pages, 3);

        let page: Page<u8> = Page::new(vec![], 0, &Pagination::new(1, 20));
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_disabled_paging_reports_zero_pages() {
        let page = Page::new(vec![1, 2, 3], 3, &Pagination::unpaged());
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.items.len(), 3);
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("TOTAL_COST".parse::<SortField>().unwrap(), SortField::TotalCost);
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("id; DROP TABLE claims".parse::<SortField>().is_err());
    }
}
