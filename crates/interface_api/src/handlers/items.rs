//! Claim item handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ClaimId, ClaimItemId};
use domain_claims::ports::TransactionManager;

use crate::dto::items::*;
use crate::error::ApiError;
use crate::extract::Caller;
use crate::AppState;

/// Adds a pending item to an editable claim
pub async fn create_item<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    request.validate()?;
    caller.actor()?;
    let command = request.into_command()?;
    let id = ClaimId::from_uuid(id);

    let item = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.items.create(tx, id, command).await })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn list_items<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let id = ClaimId::from_uuid(id);
    let items = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.items.list(tx, id).await })
        })
        .await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

pub async fn get_item<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ItemResponse>, ApiError> {
    let (id, item_id) = (ClaimId::from_uuid(id), ClaimItemId::from_uuid(item_id));
    let item = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.items.get(tx, id, item_id).await })
        })
        .await?;
    Ok(Json(item.into()))
}

/// Edits a pending item; omitted fields are kept
pub async fn update_item<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    request.validate()?;
    caller.actor()?;
    let command = request.into_command()?;
    let (id, item_id) = (ClaimId::from_uuid(id), ClaimItemId::from_uuid(item_id));

    let item = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.items.update(tx, id, item_id, command).await })
        })
        .await?;
    Ok(Json(item.into()))
}

pub async fn delete_item<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    caller.actor()?;
    let (id, item_id) = (ClaimId::from_uuid(id), ClaimItemId::from_uuid(item_id));
    state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.items.hard_delete(tx, id, item_id).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn approve_item<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ItemResponse>, ApiError> {
    caller.actor()?;
    let (id, item_id) = (ClaimId::from_uuid(id), ClaimItemId::from_uuid(item_id));
    let item = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.items.approve(tx, id, item_id).await })
        })
        .await?;
    Ok(Json(item.into()))
}

pub async fn reject_item<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ItemResponse>, ApiError> {
    caller.actor()?;
    let (id, item_id) = (ClaimId::from_uuid(id), ClaimItemId::from_uuid(item_id));
    let item = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.items.reject(tx, id, item_id).await })
        })
        .await?;
    Ok(Json(item.into()))
}
