//! PostgreSQL implementations of the claims repository ports
//!
//! Every repository is a stateless unit struct; the connection comes from
//! the [`PgUnitOfWork`](crate::transaction::PgUnitOfWork) passed to each
//! call. Queries are checked at runtime (`query_as::<_, Row>`) and rows are
//! mapped into domain types by a `into_domain` method on each row struct.
//!
//! Soft-deleted rows (`deleted_at IS NOT NULL`) are filtered out of every
//! read.

pub mod claims;
pub mod claim_items;
pub mod attachments;
pub mod history;

use std::sync::Arc;

use core_kernel::{Currency, PortError};
use domain_claims::attachment::AttachmentType;
use domain_claims::claim::ClaimStatus;
use domain_claims::item::{ItemStatus, ItemType};
use domain_claims::ports::ClaimRepositories;

use crate::transaction::PgUnitOfWork;

pub use attachments::PgClaimAttachmentRepository;
pub use claim_items::PgClaimItemRepository;
pub use claims::PgClaimRepository;
pub use history::PgClaimHistoryRepository;

/// All four repositories, ready to hand to `ClaimServices::new`
pub fn pg_repositories() -> ClaimRepositories<PgUnitOfWork> {
    ClaimRepositories {
        claims: Arc::new(PgClaimRepository),
        items: Arc::new(PgClaimItemRepository),
        attachments: Arc::new(PgClaimAttachmentRepository),
        history: Arc::new(PgClaimHistoryRepository),
    }
}

/// Claim status as stored in the `claim_status` enum type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgClaimStatus {
    Draft,
    Submitted,
    Reviewing,
    RequestInfo,
    Approved,
    PartiallyApproved,
    Rejected,
    Completed,
    Cancelled,
}

impl From<ClaimStatus> for PgClaimStatus {
    fn from(status: ClaimStatus) -> Self {
        match status {
            ClaimStatus::Draft => PgClaimStatus::Draft,
            ClaimStatus::Submitted => PgClaimStatus::Submitted,
            ClaimStatus::Reviewing => PgClaimStatus::Reviewing,
            ClaimStatus::RequestInfo => PgClaimStatus::RequestInfo,
            ClaimStatus::Approved => PgClaimStatus::Approved,
            ClaimStatus::PartiallyApproved => PgClaimStatus::PartiallyApproved,
            ClaimStatus::Rejected => PgClaimStatus::Rejected,
            ClaimStatus::Completed => PgClaimStatus::Completed,
            ClaimStatus::Cancelled => PgClaimStatus::Cancelled,
        }
    }
}

impl From<PgClaimStatus> for ClaimStatus {
    fn from(status: PgClaimStatus) -> Self {
        match status {
            PgClaimStatus::Draft => ClaimStatus::Draft,
            PgClaimStatus::Submitted => ClaimStatus::Submitted,
            PgClaimStatus::Reviewing => ClaimStatus::Reviewing,
            PgClaimStatus::RequestInfo => ClaimStatus::RequestInfo,
            PgClaimStatus::Approved => ClaimStatus::Approved,
            PgClaimStatus::PartiallyApproved => ClaimStatus::PartiallyApproved,
            PgClaimStatus::Rejected => ClaimStatus::Rejected,
            PgClaimStatus::Completed => ClaimStatus::Completed,
            PgClaimStatus::Cancelled => ClaimStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_item_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgItemStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<ItemStatus> for PgItemStatus {
    fn from(status: ItemStatus) -> Self {
        match status {
            ItemStatus::Pending => PgItemStatus::Pending,
            ItemStatus::Approved => PgItemStatus::Approved,
            ItemStatus::Rejected => PgItemStatus::Rejected,
        }
    }
}

impl From<PgItemStatus> for ItemStatus {
    fn from(status: PgItemStatus) -> Self {
        match status {
            PgItemStatus::Pending => ItemStatus::Pending,
            PgItemStatus::Approved => ItemStatus::Approved,
            PgItemStatus::Rejected => ItemStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_item_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PgItemType {
    Repair,
    Replacement,
}

impl From<ItemType> for PgItemType {
    fn from(item_type: ItemType) -> Self {
        match item_type {
            ItemType::Repair => PgItemType::Repair,
            ItemType::Replacement => PgItemType::Replacement,
        }
    }
}

impl From<PgItemType> for ItemType {
    fn from(item_type: PgItemType) -> Self {
        match item_type {
            PgItemType::Repair => ItemType::Repair,
            PgItemType::Replacement => ItemType::Replacement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "claim_attachment_type", rename_all = "lowercase")]
pub enum PgAttachmentType {
    Image,
    Video,
}

impl From<AttachmentType> for PgAttachmentType {
    fn from(kind: AttachmentType) -> Self {
        match kind {
            AttachmentType::Image => PgAttachmentType::Image,
            AttachmentType::Video => PgAttachmentType::Video,
        }
    }
}

impl From<PgAttachmentType> for AttachmentType {
    fn from(kind: PgAttachmentType) -> Self {
        match kind {
            PgAttachmentType::Image => AttachmentType::Image,
            PgAttachmentType::Video => AttachmentType::Video,
        }
    }
}

/// Parses a stored ISO currency code
pub(crate) fn parse_currency(code: &str) -> Result<Currency, PortError> {
    code.trim()
        .parse()
        .map_err(|e| PortError::internal_with_source(format!("invalid stored currency '{}'", code), e))
}

/// Turns a zero-row write into the entity's not-found error
pub(crate) fn expect_affected(
    rows: u64,
    entity: &str,
    id: impl std::fmt::Display,
) -> Result<(), PortError> {
    if rows == 0 {
        return Err(PortError::not_found(entity, id));
    }
    Ok(())
}
