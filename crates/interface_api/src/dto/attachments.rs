//! Claim attachment DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_claims::attachment::{AttachmentType, ClaimAttachment};

/// Name of the multipart field carrying the file
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub claim_id: Uuid,
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl From<ClaimAttachment> for AttachmentResponse {
    fn from(attachment: ClaimAttachment) -> Self {
        AttachmentResponse {
            id: attachment.id.into(),
            claim_id: attachment.claim_id.into(),
            attachment_type: attachment.attachment_type,
            url: attachment.url,
            created_at: attachment.created_at,
        }
    }
}
