//! Claims handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClaimId;
use domain_claims::claim::ClaimStatus;
use domain_claims::ports::TransactionManager;

use crate::dto::claims::*;
use crate::error::ApiError;
use crate::extract::Caller;
use crate::AppState;

/// Opens a draft claim
pub async fn create_claim<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Json(request): Json<CreateClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    request.validate()?;
    let actor = caller.actor()?;

    let claim = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.create(tx, request.into(), actor).await })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(claim.into())))
}

/// Lists claims matching the query, one page at a time
pub async fn list_claims<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Query(query): Query<ListClaimsQuery>,
) -> Result<Json<PageResponse<ClaimResponse>>, ApiError> {
    query.validate()?;
    let filter = query.filter()?;
    let pagination = query.pagination()?;

    let page = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.list(tx, &filter, &pagination).await })
        })
        .await?;
    Ok(Json(page.into()))
}

pub async fn get_claim<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let id = ClaimId::from_uuid(id);
    let claim = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.get(tx, id).await })
        })
        .await?;
    Ok(Json(claim.into()))
}

/// Replaces the description of an editable claim
pub async fn update_claim<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    request.validate()?;
    caller.actor()?;
    let id = ClaimId::from_uuid(id);

    let claim = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.update(tx, id, request.description).await })
        })
        .await?;
    Ok(Json(claim.into()))
}

/// Permanently removes a draft claim, then its stored objects once committed
pub async fn hard_delete_claim<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    caller.actor()?;
    let id = ClaimId::from_uuid(id);
    let orphaned = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.hard_delete(tx, id).await })
        })
        .await?;
    state.services.attachments.discard_objects(orphaned).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Tombstones a cancelled claim
pub async fn soft_delete_claim<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    caller.actor()?;
    let id = ClaimId::from_uuid(id);
    state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.soft_delete(tx, id).await })
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Generic status change along the transition table
pub async fn update_status<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let target = request.target()?;
    move_to(state, caller, id, target).await
}

pub async fn submit_claim<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let actor = caller.actor()?;
    let id = ClaimId::from_uuid(id);
    let claim = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.submit(tx, id, actor).await })
        })
        .await?;
    Ok(Json(claim.into()))
}

pub async fn start_review<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    move_to(state, caller, id, ClaimStatus::Reviewing).await
}

pub async fn request_info<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    move_to(state, caller, id, ClaimStatus::RequestInfo).await
}

pub async fn cancel_claim<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    move_to(state, caller, id, ClaimStatus::Cancelled).await
}

/// Closes the review; the outcome follows from the item decisions
pub async fn complete_claim<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let actor = caller.actor()?;
    let id = ClaimId::from_uuid(id);
    let claim = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.complete(tx, id, actor).await })
        })
        .await?;
    Ok(Json(claim.into()))
}

pub async fn claim_history<T: TransactionManager>(
    State(state): State<AppState<T>>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryResponse>>, ApiError> {
    let id = ClaimId::from_uuid(id);
    let entries = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.history(tx, id).await })
        })
        .await?;
    Ok(Json(entries.into_iter().map(HistoryResponse::from).collect()))
}

async fn move_to<T: TransactionManager>(
    state: AppState<T>,
    caller: Caller,
    id: Uuid,
    target: ClaimStatus,
) -> Result<Json<ClaimResponse>, ApiError> {
    let actor = caller.actor()?;
    let id = ClaimId::from_uuid(id);
    let claim = state
        .in_transaction(caller.metadata(), move |services, tx| {
            Box::pin(async move { services.workflow.update_status(tx, id, target, actor).await })
        })
        .await?;
    Ok(Json(claim.into()))
}
