//! HTTP API Layer
//!
//! REST surface of the warranty claims workflow using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource (claims, items, attachments)
//! - **Extractors**: the calling actor and correlation id
//! - **DTOs**: request/response bodies with validation
//! - **Error Handling**: domain error codes mapped to HTTP statuses
//!
//! Each request runs inside exactly one unit of work opened through the
//! [`TransactionManager`]; the services never commit on their own.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(tm, services, store, config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use futures::future::BoxFuture;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{HealthCheckable, OperationMetadata};
use domain_claims::error::ClaimError;
use domain_claims::ports::{ObjectStore, TransactionManager};
use domain_claims::services::ClaimServices;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handlers::{attachments, claims, health, items};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
pub struct AppState<T: TransactionManager> {
    pub transactions: Arc<T>,
    pub services: ClaimServices<T::Tx>,
    pub store: Arc<dyn ObjectStore>,
    pub config: Arc<ApiConfig>,
}

impl<T: TransactionManager> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            transactions: Arc::clone(&self.transactions),
            services: self.services.clone(),
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T: TransactionManager> AppState<T> {
    pub fn new(
        transactions: T,
        services: ClaimServices<T::Tx>,
        store: Arc<dyn ObjectStore>,
        config: ApiConfig,
    ) -> Self {
        Self {
            transactions: Arc::new(transactions),
            services,
            store,
            config: Arc::new(config),
        }
    }

    /// Runs `f` in a fresh unit of work, committing only on success
    pub async fn in_transaction<R, F>(&self, metadata: OperationMetadata, f: F) -> Result<R, ApiError>
    where
        R: Send + 'static,
        F: for<'t> FnOnce(ClaimServices<T::Tx>, &'t mut T::Tx) -> BoxFuture<'t, Result<R, ClaimError>>
            + Send
            + 'static,
    {
        let services = self.services.clone();
        self.transactions
            .run(metadata, move |tx| f(services, tx))
            .await
            .map_err(ApiError::from)
    }
}

/// Creates the main API router
pub fn create_router<T>(state: AppState<T>) -> Router
where
    T: TransactionManager + HealthCheckable,
{
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check::<T>));

    let claims_routes = Router::new()
        .route("/", post(claims::create_claim::<T>).get(claims::list_claims::<T>))
        .route(
            "/:id",
            get(claims::get_claim::<T>)
                .put(claims::update_claim::<T>)
                .delete(claims::hard_delete_claim::<T>),
        )
        .route("/:id/soft-delete", post(claims::soft_delete_claim::<T>))
        .route("/:id/status", axum::routing::put(claims::update_status::<T>))
        .route("/:id/submit", post(claims::submit_claim::<T>))
        .route("/:id/review", post(claims::start_review::<T>))
        .route("/:id/request-info", post(claims::request_info::<T>))
        .route("/:id/cancel", post(claims::cancel_claim::<T>))
        .route("/:id/complete", post(claims::complete_claim::<T>))
        .route("/:id/history", get(claims::claim_history::<T>))
        .route("/:id/items", post(items::create_item::<T>).get(items::list_items::<T>))
        .route(
            "/:id/items/:item_id",
            get(items::get_item::<T>)
                .put(items::update_item::<T>)
                .delete(items::delete_item::<T>),
        )
        .route("/:id/items/:item_id/approve", post(items::approve_item::<T>))
        .route("/:id/items/:item_id/reject", post(items::reject_item::<T>))
        .route(
            "/:id/attachments",
            post(attachments::upload_attachment::<T>).get(attachments::list_attachments::<T>),
        )
        .route(
            "/:id/attachments/:attachment_id",
            get(attachments::get_attachment::<T>).delete(attachments::delete_attachment::<T>),
        );

    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .layer(axum_middleware::from_fn(audit_middleware));

    let body_limit = state.config.body_limit();

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
