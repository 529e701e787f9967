//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};
use domain_claims::ports::TransactionManager;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<HealthCheckResult>,
}

/// Liveness: the process is up
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dependencies: Vec::new(),
    })
}

/// Readiness: the database and the object store both answer
pub async fn readiness_check<T>(
    State(state): State<AppState<T>>,
) -> (StatusCode, Json<HealthResponse>)
where
    T: TransactionManager + HealthCheckable,
{
    let dependencies = vec![
        state.transactions.health_check().await,
        state.store.health_check().await,
    ];
    let ready = dependencies
        .iter()
        .all(|check| check.status == AdapterHealth::Healthy);

    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            dependencies,
        }),
    )
}
