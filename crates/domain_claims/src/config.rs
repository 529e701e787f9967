//! Claim policy configuration

use serde::Deserialize;

use core_kernel::Currency;

/// Business thresholds applied by the claim services
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClaimPolicy {
    /// Items a claim needs before it can be submitted
    pub min_claim_items: usize,
    /// Attachments a claim needs before it can be submitted
    pub min_attachments: usize,
    /// Largest accepted evidence file
    pub max_attachment_bytes: usize,
    /// Currency of item costs and claim totals
    pub currency: Currency,
    /// Leading bytes inspected when classifying an attachment
    pub sniff_len: usize,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            min_claim_items: 1,
            min_attachments: 3,
            max_attachment_bytes: 50 * 1024 * 1024,
            currency: Currency::VND,
            sniff_len: 512,
        }
    }
}

impl ClaimPolicy {
    pub fn with_min_attachments(mut self, min_attachments: usize) -> Self {
        self.min_attachments = min_attachments;
        self
    }

    pub fn with_max_attachment_bytes(mut self, max_attachment_bytes: usize) -> Self {
        self.max_attachment_bytes = max_attachment_bytes;
        self
    }
}
