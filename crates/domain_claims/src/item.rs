//! Claim items: one defective part per line

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, ClaimItemId, Currency, Money, PartCategoryId, PartId};
use crate::error::ClaimError;

/// Review decision on a single claim item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Approved => "APPROVED",
            ItemStatus::Rejected => "REJECTED",
        }
    }

    /// Approved and rejected items carry a final review decision
    pub fn is_decided(&self) -> bool {
        !matches!(self, ItemStatus::Pending)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ItemStatus::Pending),
            "APPROVED" => Ok(ItemStatus::Approved),
            "REJECTED" => Ok(ItemStatus::Rejected),
            _ => Err(ClaimError::invalid_input(format!("unknown claim item status '{}'", s))),
        }
    }
}

/// Kind of warranty work requested for a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Repair,
    Replacement,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Repair => "REPAIR",
            ItemType::Replacement => "REPLACEMENT",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = ClaimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REPAIR" => Ok(ItemType::Repair),
            "REPLACEMENT" => Ok(ItemType::Replacement),
            _ => Err(ClaimError::invalid_input(format!("unknown claim item type '{}'", s))),
        }
    }
}

/// A defective-part line item owned by one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimItem {
    pub id: ClaimItemId,
    pub claim_id: ClaimId,
    pub part_category_id: PartCategoryId,
    pub faulty_part_id: PartId,
    /// Only meaningful for replacements
    pub replacement_part_id: Option<PartId>,
    pub issue_description: String,
    pub status: ItemStatus,
    pub item_type: ItemType,
    /// Counts towards the claim total only while approved
    pub cost: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Command for adding an item to a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateClaimItem {
    pub part_category_id: PartCategoryId,
    pub faulty_part_id: PartId,
    pub replacement_part_id: Option<PartId>,
    pub issue_description: String,
    pub item_type: ItemType,
    pub cost: Decimal,
}

/// Partial update of a pending item; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateClaimItem {
    pub part_category_id: Option<PartCategoryId>,
    pub faulty_part_id: Option<PartId>,
    pub replacement_part_id: Option<PartId>,
    pub issue_description: Option<String>,
    pub item_type: Option<ItemType>,
    pub cost: Option<Decimal>,
}

fn validate_cost(cost: Decimal, currency: Currency) -> Result<Money, ClaimError> {
    Money::non_negative(cost, currency).map_err(|e| ClaimError::invalid_input(e.to_string()))
}

/// Repair items never carry a replacement part; replacements must name one
fn resolve_replacement_part(
    item_type: ItemType,
    replacement_part_id: Option<PartId>,
) -> Result<Option<PartId>, ClaimError> {
    match (item_type, replacement_part_id) {
        (ItemType::Repair, _) => Ok(None),
        (ItemType::Replacement, None) => Err(ClaimError::invalid_input(
            "replacement items must name a replacement part",
        )),
        (ItemType::Replacement, part) => Ok(part),
    }
}

impl ClaimItem {
    /// Builds a pending item from a create command
    pub fn new(claim_id: ClaimId, cmd: CreateClaimItem, currency: Currency) -> Result<Self, ClaimError> {
        if cmd.issue_description.trim().is_empty() {
            return Err(ClaimError::invalid_input("issue description must not be empty"));
        }
        let replacement_part_id = resolve_replacement_part(cmd.item_type, cmd.replacement_part_id)?;
        let cost = validate_cost(cmd.cost, currency)?;
        let now = Utc::now();

        Ok(Self {
            id: ClaimItemId::new_v7(),
            claim_id,
            part_category_id: cmd.part_category_id,
            faulty_part_id: cmd.faulty_part_id,
            replacement_part_id,
            issue_description: cmd.issue_description,
            status: ItemStatus::Pending,
            item_type: cmd.item_type,
            cost,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Applies an edit; only pending items may change
    pub fn apply_update(&mut self, cmd: UpdateClaimItem) -> Result<(), ClaimError> {
        if self.status != ItemStatus::Pending {
            return Err(ClaimError::ItemStatusNotAllowedUpdate { status: self.status });
        }

        let item_type = cmd.item_type.unwrap_or(self.item_type);
        let replacement_part_id =
            resolve_replacement_part(item_type, cmd.replacement_part_id.or(self.replacement_part_id))?;

        let cost = match cmd.cost {
            Some(cost) => validate_cost(cost, self.cost.currency())?,
            None => self.cost,
        };
        if let Some(description) = &cmd.issue_description {
            if description.trim().is_empty() {
                return Err(ClaimError::invalid_input("issue description must not be empty"));
            }
        }

        if let Some(category) = cmd.part_category_id {
            self.part_category_id = category;
        }
        if let Some(part) = cmd.faulty_part_id {
            self.faulty_part_id = part;
        }
        if let Some(description) = cmd.issue_description {
            self.issue_description = description;
        }
        self.item_type = item_type;
        self.replacement_part_id = replacement_part_id;
        self.cost = cost;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records the reviewer's decision
    pub fn decide(&mut self, status: ItemStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn is_approved(&self) -> bool {
        self.status == ItemStatus::Approved
    }
}
