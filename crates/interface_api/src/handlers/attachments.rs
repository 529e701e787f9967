//! Claim attachment handlers

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use core_kernel::{AttachmentId, ClaimId};
use domain_claims::attachment::AttachmentUpload;
use domain_claims::ports::TransactionManager;

use crate::dto::attachments::*;
use crate::error::ApiError;
use crate::extract::Caller;
use crate::AppState;

/// Accepts a multipart upload with the file in the `file` field
///
/// The declared content type of the part is ignored; the kind of the
/// attachment is decided from the leading bytes of the content.
pub async fn upload_attachment<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AttachmentResponse>), ApiError> {
    caller.actor()?;
    let upload = read_upload(multipart).await?;
    let id = ClaimId::from_uuid(id);

    let attachment = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.attachments.create(tx, id, upload).await })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(attachment.into())))
}

pub async fn list_attachments<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttachmentResponse>>, ApiError> {
    let id = ClaimId::from_uuid(id);
    let attachments = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.attachments.list(tx, id).await })
        })
        .await?;
    Ok(Json(attachments.into_iter().map(AttachmentResponse::from).collect()))
}

pub async fn get_attachment<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<AttachmentResponse>, ApiError> {
    let (id, attachment_id) = (ClaimId::from_uuid(id), AttachmentId::from_uuid(attachment_id));
    let attachment = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.attachments.get(tx, id, attachment_id).await })
        })
        .await?;
    Ok(Json(attachment.into()))
}

pub async fn delete_attachment<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path((id, attachment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    caller.actor()?;
    let (id, attachment_id) = (ClaimId::from_uuid(id), AttachmentId::from_uuid(attachment_id));
    let orphaned = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.attachments.hard_delete(tx, id, attachment_id).await })
        })
        .await?;
    state.services.attachments.discard_objects(orphaned).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn read_upload(mut multipart: Multipart) -> Result<AttachmentUpload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content = field.bytes().await?;
        if content.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }
        return Ok(AttachmentUpload::new(file_name, content.to_vec()));
    }
    Err(ApiError::BadRequest(format!("missing multipart field '{FILE_FIELD}'")))
}
