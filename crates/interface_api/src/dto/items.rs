//! Claim item DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{PartCategoryId, PartId};
use domain_claims::error::ClaimError;
use domain_claims::item::{ClaimItem, CreateClaimItem, ItemStatus, ItemType, UpdateClaimItem};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    pub part_category_id: Uuid,
    pub faulty_part_id: Uuid,
    pub replacement_part_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2000, message = "must be between 1 and 2000 characters"))]
    pub issue_description: String,
    /// `REPAIR` or `REPLACEMENT`
    pub item_type: String,
    pub cost: Decimal,
}

impl CreateItemRequest {
    pub fn into_command(self) -> Result<CreateClaimItem, ClaimError> {
        Ok(CreateClaimItem {
            part_category_id: PartCategoryId::from_uuid(self.part_category_id),
            faulty_part_id: PartId::from_uuid(self.faulty_part_id),
            replacement_part_id: self.replacement_part_id.map(PartId::from_uuid),
            issue_description: self.issue_description,
            item_type: self.item_type.parse()?,
            cost: self.cost,
        })
    }
}

/// Partial update; omitted fields stay as they are
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemRequest {
    pub part_category_id: Option<Uuid>,
    pub faulty_part_id: Option<Uuid>,
    pub replacement_part_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2000, message = "must be between 1 and 2000 characters"))]
    pub issue_description: Option<String>,
    pub item_type: Option<String>,
    pub cost: Option<Decimal>,
}

impl UpdateItemRequest {
    pub fn into_command(self) -> Result<UpdateClaimItem, ClaimError> {
        Ok(UpdateClaimItem {
            part_category_id: self.part_category_id.map(PartCategoryId::from_uuid),
            faulty_part_id: self.faulty_part_id.map(PartId::from_uuid),
            replacement_part_id: self.replacement_part_id.map(PartId::from_uuid),
            issue_description: self.issue_description,
            item_type: self.item_type.as_deref().map(str::parse::<ItemType>).transpose()?,
            cost: self.cost,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub part_category_id: Uuid,
    pub faulty_part_id: Uuid,
    pub replacement_part_id: Option<Uuid>,
    pub issue_description: String,
    pub status: ItemStatus,
    pub item_type: ItemType,
    pub cost: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClaimItem> for ItemResponse {
    fn from(item: ClaimItem) -> Self {
        ItemResponse {
            id: item.id.into(),
            claim_id: item.claim_id.into(),
            part_category_id: item.part_category_id.into(),
            faulty_part_id: item.faulty_part_id.into(),
            replacement_part_id: item.replacement_part_id.map(Uuid::from),
            issue_description: item.issue_description,
            status: item.status,
            item_type: item.item_type,
            cost: item.cost.amount(),
            currency: item.cost.currency().code().to_string(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(item_type: &str) -> CreateItemRequest {
        CreateItemRequest {
            part_category_id: Uuid::new_v4(),
            faulty_part_id: Uuid::new_v4(),
            replacement_part_id: None,
            issue_description: "Inverter overheating".to_string(),
            item_type: item_type.to_string(),
            cost: Decimal::new(1_500_000, 0),
        }
    }

    #[test]
    fn test_item_type_is_case_insensitive() {
        let cmd = create_request("repair").into_command().unwrap();
        assert_eq!(cmd.item_type, ItemType::Repair);
    }

    #[test]
    fn test_unknown_item_type_is_invalid_input() {
        let err = create_request("REFUND").into_command().unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_empty_update_changes_nothing() {
        let cmd = UpdateItemRequest::default().into_command().unwrap();
        assert_eq!(cmd, UpdateClaimItem::default());
    }
}
