//! Claim aggregate and its status state machine

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, Currency, CustomerId, Money, UserId, VehicleId};
use crate::error::ClaimError;

/// Claim status
///
/// ```text
/// DRAFT -> SUBMITTED -> REVIEWING -> APPROVED | PARTIALLY_APPROVED | REJECTED
///              |            |            |
///              v            v            v
///          CANCELLED   REQUEST_INFO   COMPLETED
///                           |
///                           v
///                       SUBMITTED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Being prepared by the customer or technician
    Draft,
    /// Handed over for review
    Submitted,
    /// Under review by EVM staff
    Reviewing,
    /// Reviewer asked for more information; editable like a draft
    RequestInfo,
    /// Every claim item approved
    Approved,
    /// Some claim items approved, some rejected
    PartiallyApproved,
    /// No claim item approved
    Rejected,
    /// Warranty work carried out and closed
    Completed,
    /// Withdrawn after submission
    Cancelled,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 9] = [
        ClaimStatus::Draft,
        ClaimStatus::Submitted,
        ClaimStatus::Reviewing,
        ClaimStatus::RequestInfo,
        ClaimStatus::Approved,
        ClaimStatus::PartiallyApproved,
        ClaimStatus::Rejected,
        ClaimStatus::Completed,
        ClaimStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "DRAFT",
            ClaimStatus::Submitted => "SUBMITTED",
            ClaimStatus::Reviewing => "REVIEWING",
            ClaimStatus::RequestInfo => "REQUEST_INFO",
            ClaimStatus::Approved => "APPROVED",
            ClaimStatus::PartiallyApproved => "PARTIALLY_APPROVED",
            ClaimStatus::Rejected => "REJECTED",
            ClaimStatus::Completed => "COMPLETED",
            ClaimStatus::Cancelled => "CANCELLED",
        }
    }

    /// Statuses with no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Rejected | ClaimStatus::Cancelled | ClaimStatus::Completed
        )
    }

    /// Statuses in which the claim, its items and its attachments may be edited
    pub fn is_editable(&self) -> bool {
        matches!(self, ClaimStatus::Draft | ClaimStatus::RequestInfo)
    }

    /// Review outcomes reached through `complete`
    pub fn is_decision(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Approved | ClaimStatus::PartiallyApproved | ClaimStatus::Rejected
        )
    }

    /// Checks the transition table
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (*self, target),
            (Draft, Submitted) |
            (RequestInfo, Submitted) |
            (Submitted, Reviewing) |
            (Submitted, Cancelled) |
            (Reviewing, RequestInfo) |
            (Reviewing, Approved) |
            (Reviewing, PartiallyApproved) |
            (Reviewing, Rejected) |
            (Approved, Completed) |
            (PartiallyApproved, Completed)
        )
    }

    /// Lists every status reachable in one step
    pub fn allowed_transitions(&self) -> Vec<ClaimStatus> {
        ClaimStatus::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        ClaimStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ClaimError::invalid_input(format!("unknown claim status '{}'", s)))
    }
}

/// A warranty claim for one vehicle and one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Vehicle under warranty
    pub vehicle_id: VehicleId,
    /// Customer who owns the vehicle
    pub customer_id: CustomerId,
    /// Free-text description of the problem
    pub description: String,
    /// Status
    pub status: ClaimStatus,
    /// Sum of approved claim item costs; recomputed, never set by callers
    pub total_cost: Money,
    /// Staff member who recorded the review outcome
    pub approved_by: Option<UserId>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
    /// Tombstone for soft-deleted claims
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Claim {
    /// Creates a new draft claim
    pub fn draft(
        vehicle_id: VehicleId,
        customer_id: CustomerId,
        description: impl Into<String>,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: ClaimId::new_v7(),
            vehicle_id,
            customer_id,
            description: description.into(),
            status: ClaimStatus::Draft,
            total_cost: Money::zero(currency),
            approved_by: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Currency all costs of this claim are expressed in
    pub fn currency(&self) -> Currency {
        self.total_cost.currency()
    }

    /// Moves the claim to `target`, returning the previous status
    pub fn transition_to(&mut self, target: ClaimStatus) -> Result<ClaimStatus, ClaimError> {
        if !self.status.can_transition_to(target) {
            return Err(ClaimError::invalid_transition(self.status, target));
        }
        let previous = self.status;
        self.status = target;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    /// Fails unless the claim is in an editable status
    pub fn ensure_editable(&self) -> Result<(), ClaimError> {
        if !self.status.is_editable() {
            return Err(ClaimError::StatusNotAllowedUpdate { status: self.status });
        }
        Ok(())
    }

    /// Fails unless the claim is a draft, the only status that permits hard deletes
    pub fn ensure_hard_deletable(&self) -> Result<(), ClaimError> {
        if self.status != ClaimStatus::Draft {
            return Err(ClaimError::StatusNotAllowedDelete { status: self.status });
        }
        Ok(())
    }

    /// Fails unless the claim was cancelled
    pub fn ensure_soft_deletable(&self) -> Result<(), ClaimError> {
        if self.status != ClaimStatus::Cancelled {
            return Err(ClaimError::StatusNotAllowedDelete { status: self.status });
        }
        Ok(())
    }

    /// Fails unless the claim is under review
    pub fn ensure_reviewing(&self) -> Result<(), ClaimError> {
        if self.status != ClaimStatus::Reviewing {
            return Err(ClaimError::StatusNotAllowedUpdate { status: self.status });
        }
        Ok(())
    }

    /// Replaces the description
    pub fn update_description(&mut self, description: impl Into<String>) -> Result<(), ClaimError> {
        self.ensure_editable()?;
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ClaimError::invalid_input("description must not be empty"));
        }
        self.description = description;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Stores a freshly recomputed aggregate cost
    pub(crate) fn apply_total_cost(&mut self, total: Money) {
        self.total_cost = total;
        self.updated_at = Utc::now();
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Claim {
        Claim::draft(VehicleId::new(), CustomerId::new(), "Battery drains overnight", Currency::VND)
    }

    #[test]
    fn test_draft_defaults() {
        let claim = draft();
        assert_eq!(claim.status, ClaimStatus::Draft);
        assert!(claim.total_cost.is_zero());
        assert_eq!(claim.currency(), Currency::VND);
        assert!(claim.approved_by.is_none());
        assert!(!claim.is_deleted());
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for status in ClaimStatus::ALL.into_iter().filter(ClaimStatus::is_terminal) {
            assert!(status.allowed_transitions().is_empty(), "{} has exits", status);
        }
    }

    #[test]
    fn test_invalid_transition_keeps_status() {
        let mut claim = draft();
        let err = claim.transition_to(ClaimStatus::Approved).unwrap_err();
        assert!(matches!(err, ClaimError::InvalidClaimAction(_)));
        assert_eq!(claim.status, ClaimStatus::Draft);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("request_info".parse::<ClaimStatus>().unwrap(), ClaimStatus::RequestInfo);
        assert!(matches!(
            "ARCHIVED".parse::<ClaimStatus>(),
            Err(ClaimError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_description_update_requires_editable_status() {
        let mut claim = draft();
        claim.update_description("Charging port cracked").unwrap();
        assert_eq!(claim.description, "Charging port cracked");

        claim.transition_to(ClaimStatus::Submitted).unwrap();
        assert!(matches!(
            claim.update_description("late edit"),
            Err(ClaimError::StatusNotAllowedUpdate { status: ClaimStatus::Submitted })
        ));
    }
}
