//! Warranty Claims Domain
//!
//! This crate implements the lifecycle of electric-vehicle warranty claims:
//! drafting, evidence collection, per-item review and closure.
//!
//! # Claim Lifecycle
//!
//! ```text
//! DRAFT -> SUBMITTED -> REVIEWING -> APPROVED/PARTIALLY_APPROVED/REJECTED -> COMPLETED
//!              |            |
//!          CANCELLED   REQUEST_INFO -> SUBMITTED
//! ```
//!
//! Services live in [`services`] and depend only on the traits in [`ports`];
//! storage adapters are provided by other crates, or by [`mock`] for tests.

pub mod attachment;
pub mod claim;
pub mod config;
pub mod error;
pub mod history;
pub mod item;
pub mod ports;
pub mod query;
pub mod services;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use attachment::{
    AttachmentType, AttachmentUpload, ClaimAttachment, DetectedMedia, OrphanedObjects,
};
pub use claim::{Claim, ClaimStatus};
pub use config::ClaimPolicy;
pub use error::{ClaimError, ErrorKind};
pub use history::ClaimHistory;
pub use item::{ClaimItem, CreateClaimItem, ItemStatus, ItemType, UpdateClaimItem};
pub use ports::{
    ClaimAttachmentRepository, ClaimHistoryRepository, ClaimItemRepository, ClaimRepositories,
    ClaimRepository, ObjectStore, TransactionManager, UnitOfWork,
};
pub use query::{ClaimFilter, Page, Pagination, SortDirection, SortField};
pub use services::{
    ClaimAttachmentManager, ClaimHistoryRecorder, ClaimItemManager, ClaimServices,
    ClaimWorkflowEngine, CreateClaim,
};
