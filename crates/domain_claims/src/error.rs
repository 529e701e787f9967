//! Claims domain errors
//!
//! Every failure carries a stable machine-readable code (see [`ClaimError::code`])
//! and a coarse [`ErrorKind`] that the HTTP boundary maps onto status codes.

use std::fmt;

use thiserror::Error;

use core_kernel::{AttachmentId, ClaimId, ClaimItemId, PortError};

use crate::claim::ClaimStatus;
use crate::item::ItemStatus;

/// Coarse classification of claim errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    StatusNotAllowed,
    InvalidClaimAction,
    MissingInformation,
    OperationFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::StatusNotAllowed => "status_not_allowed",
            ErrorKind::InvalidClaimAction => "invalid_claim_action",
            ErrorKind::MissingInformation => "missing_information",
            ErrorKind::OperationFailed => "operation_failed",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported attachment content: only images and videos are accepted")]
    InvalidAttachmentType,

    #[error("Attachment of {size} bytes exceeds the limit of {limit} bytes")]
    AttachmentTooLarge { size: usize, limit: usize },

    #[error("Claim in status {status} does not allow this change")]
    StatusNotAllowedUpdate { status: ClaimStatus },

    #[error("Claim item in status {status} can no longer be edited")]
    ItemStatusNotAllowedUpdate { status: ItemStatus },

    #[error("Claim in status {status} cannot be deleted")]
    StatusNotAllowedDelete { status: ClaimStatus },

    #[error("Invalid claim action: {0}")]
    InvalidClaimAction(String),

    #[error(
        "Claim is missing information: {items} of {required_items} required items, \
         {attachments} of {required_attachments} required attachments"
    )]
    MissingInformation {
        items: usize,
        required_items: usize,
        attachments: usize,
        required_attachments: usize,
    },

    #[error("Operation failed: {0}")]
    OperationFailed(#[source] PortError),
}

impl ClaimError {
    pub fn claim_not_found(id: ClaimId) -> Self {
        ClaimError::NotFound {
            entity: "Claim".to_string(),
            id: id.to_string(),
        }
    }

    pub fn item_not_found(id: ClaimItemId) -> Self {
        ClaimError::NotFound {
            entity: "ClaimItem".to_string(),
            id: id.to_string(),
        }
    }

    pub fn attachment_not_found(id: AttachmentId) -> Self {
        ClaimError::NotFound {
            entity: "ClaimAttachment".to_string(),
            id: id.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ClaimError::InvalidInput(message.into())
    }

    pub fn invalid_transition(from: ClaimStatus, to: ClaimStatus) -> Self {
        ClaimError::InvalidClaimAction(format!("cannot move claim from {} to {}", from, to))
    }

    /// Returns the coarse error classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClaimError::NotFound { .. } => ErrorKind::NotFound,
            ClaimError::InvalidInput(_)
            | ClaimError::InvalidAttachmentType
            | ClaimError::AttachmentTooLarge { .. } => ErrorKind::InvalidInput,
            ClaimError::StatusNotAllowedUpdate { .. }
            | ClaimError::ItemStatusNotAllowedUpdate { .. }
            | ClaimError::StatusNotAllowedDelete { .. } => ErrorKind::StatusNotAllowed,
            ClaimError::InvalidClaimAction(_) => ErrorKind::InvalidClaimAction,
            ClaimError::MissingInformation { .. } => ErrorKind::MissingInformation,
            ClaimError::OperationFailed(_) => ErrorKind::OperationFailed,
        }
    }

    /// Returns the stable error code exposed to callers
    pub fn code(&self) -> &'static str {
        match self {
            ClaimError::NotFound { entity, .. } => match entity.as_str() {
                "Claim" => "CLAIM_NOT_FOUND",
                "ClaimItem" => "CLAIM_ITEM_NOT_FOUND",
                "ClaimAttachment" => "CLAIM_ATTACHMENT_NOT_FOUND",
                "ClaimHistory" => "CLAIM_HISTORY_NOT_FOUND",
                _ => "NOT_FOUND",
            },
            ClaimError::InvalidInput(_) => "INVALID_INPUT",
            ClaimError::InvalidAttachmentType => "INVALID_ATTACHMENT_TYPE",
            ClaimError::AttachmentTooLarge { .. } => "ATTACHMENT_TOO_LARGE",
            ClaimError::StatusNotAllowedUpdate { .. } => "CLAIM_STATUS_NOT_ALLOWED_UPDATE",
            ClaimError::ItemStatusNotAllowedUpdate { .. } => "CLAIM_ITEM_STATUS_NOT_ALLOWED_UPDATE",
            ClaimError::StatusNotAllowedDelete { .. } => "CLAIM_STATUS_NOT_ALLOWED_DELETE",
            ClaimError::InvalidClaimAction(_) => "INVALID_CLAIM_ACTION",
            ClaimError::MissingInformation { .. } => "CLAIM_MISSING_INFORMATION",
            ClaimError::OperationFailed(PortError::Conflict { .. }) => "DUPLICATE_KEY",
            ClaimError::OperationFailed(_) => "OPERATION_FAILED",
        }
    }
}

/// Repository errors keep their not-found classification; everything else
/// is an operation failure the caller must roll back on.
impl From<PortError> for ClaimError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => ClaimError::NotFound {
                entity: entity_type,
                id,
            },
            other => ClaimError::OperationFailed(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_keeps_entity_code() {
        let id = ClaimItemId::new();
        let error: ClaimError = PortError::not_found("ClaimItem", id).into();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.code(), "CLAIM_ITEM_NOT_FOUND");
    }

    #[test]
    fn test_port_failure_is_operation_failed() {
        let error: ClaimError = PortError::connection("pool closed").into();
        assert_eq!(error.kind(), ErrorKind::OperationFailed);
        assert_eq!(error.code(), "OPERATION_FAILED");

        let duplicate: ClaimError = PortError::conflict("claim_items_pkey").into();
        assert_eq!(duplicate.code(), "DUPLICATE_KEY");
    }

    #[test]
    fn test_status_errors_share_kind() {
        let update = ClaimError::StatusNotAllowedUpdate { status: ClaimStatus::Submitted };
        let delete = ClaimError::StatusNotAllowedDelete { status: ClaimStatus::Submitted };
        assert_eq!(update.kind(), delete.kind());
        assert_ne!(update.code(), delete.code());
        assert!(update.to_string().contains("SUBMITTED"));
    }
}
