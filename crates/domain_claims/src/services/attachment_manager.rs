//! Claim attachment manager
//!
//! Metadata lives in the unit of work; the binary content lives in an
//! external object store that cannot take part in the transaction. Uploads
//! therefore happen before the metadata insert, with a compensating delete
//! if the insert fails.
//!
//! Deletes run the other way round. Removing metadata yields the
//! [`OrphanedObjects`] it referenced, and the caller discards them with
//! [`ClaimAttachmentManager::discard_objects`] only after its unit of work has
//! committed. A rolled back delete therefore never loses content. A failed
//! remote delete is logged and absorbed: the metadata is authoritative and
//! an orphaned object can be reclaimed separately.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use core_kernel::{AttachmentId, ClaimId};
use crate::attachment::{sniff, AttachmentUpload, ClaimAttachment, OrphanedObjects};
use crate::config::ClaimPolicy;
use crate::error::ClaimError;
use crate::ports::{ClaimAttachmentRepository, ClaimRepository, ObjectStore, UnitOfWork};

pub struct ClaimAttachmentManager<Tx: UnitOfWork> {
    claims: Arc<dyn ClaimRepository<Tx>>,
    attachments: Arc<dyn ClaimAttachmentRepository<Tx>>,
    store: Arc<dyn ObjectStore>,
    policy: ClaimPolicy,
}

impl<Tx: UnitOfWork> Clone for ClaimAttachmentManager<Tx> {
    fn clone(&self) -> Self {
        Self {
            claims: Arc::clone(&self.claims),
            attachments: Arc::clone(&self.attachments),
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
        }
    }
}

impl<Tx: UnitOfWork> ClaimAttachmentManager<Tx> {
    pub fn new(
        claims: Arc<dyn ClaimRepository<Tx>>,
        attachments: Arc<dyn ClaimAttachmentRepository<Tx>>,
        store: Arc<dyn ObjectStore>,
        policy: ClaimPolicy,
    ) -> Self {
        Self {
            claims,
            attachments,
            store,
            policy,
        }
    }

    /// Classifies, uploads and records an evidence file
    #[instrument(skip(self, tx, upload), fields(claim_id = %claim_id, size = upload.size()))]
    pub async fn create(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        upload: AttachmentUpload,
    ) -> Result<ClaimAttachment, ClaimError> {
        let claim = self.claims.lock_by_id(tx, claim_id).await?;
        claim.ensure_editable()?;

        if upload.size() > self.policy.max_attachment_bytes {
            return Err(ClaimError::AttachmentTooLarge {
                size: upload.size(),
                limit: self.policy.max_attachment_bytes,
            });
        }

        let head_len = upload.size().min(self.policy.sniff_len);
        let detected = sniff(&upload.content[..head_len]).ok_or(ClaimError::InvalidAttachmentType)?;

        let url = self
            .store
            .upload_file(&upload.content, detected.kind, detected.mime)
            .await?;

        let attachment = ClaimAttachment::new(claim.id, detected.kind, url);
        if let Err(error) = self.attachments.create(tx, &attachment).await {
            self.delete_object(&attachment.url).await;
            return Err(error.into());
        }

        info!(
            attachment_id = %attachment.id,
            kind = %attachment.attachment_type,
            mime = detected.mime,
            "claim attachment stored"
        );
        Ok(attachment)
    }

    /// Removes an attachment of a draft claim
    ///
    /// The stored object is returned for removal once the unit of work commits.
    #[instrument(skip(self, tx), fields(claim_id = %claim_id, attachment_id = %attachment_id))]
    pub async fn hard_delete(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        attachment_id: AttachmentId,
    ) -> Result<OrphanedObjects, ClaimError> {
        let claim = self.claims.lock_by_id(tx, claim_id).await?;
        claim.ensure_hard_deletable()?;

        let attachment = self.load_attachment(tx, claim_id, attachment_id).await?;
        self.attachments.hard_delete(tx, attachment.id).await?;

        info!("claim attachment deleted");
        Ok(OrphanedObjects::new(vec![attachment.url]))
    }

    pub async fn list(&self, tx: &mut Tx, claim_id: ClaimId) -> Result<Vec<ClaimAttachment>, ClaimError> {
        self.claims.find_by_id(tx, claim_id).await?;
        Ok(self.attachments.find_by_claim_id(tx, claim_id).await?)
    }

    pub async fn get(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        attachment_id: AttachmentId,
    ) -> Result<ClaimAttachment, ClaimError> {
        self.claims.find_by_id(tx, claim_id).await?;
        self.load_attachment(tx, claim_id, attachment_id).await
    }

    /// Best-effort removal of stored objects; failures are only logged
    ///
    /// Call only after the unit of work that removed their metadata committed.
    pub async fn discard_objects(&self, objects: OrphanedObjects) {
        for url in objects.urls() {
            self.delete_object(url).await;
        }
    }

    async fn delete_object(&self, url: &str) {
        if let Err(error) = self.store.delete_file_by_url(url).await {
            warn!(url = %url, error = %error, "failed to delete stored object");
        }
    }

    async fn load_attachment(
        &self,
        tx: &mut Tx,
        claim_id: ClaimId,
        attachment_id: AttachmentId,
    ) -> Result<ClaimAttachment, ClaimError> {
        let attachment = self.attachments.find_by_id(tx, attachment_id).await?;
        if attachment.claim_id != claim_id {
            return Err(ClaimError::attachment_not_found(attachment_id));
        }
        Ok(attachment)
    }
}
