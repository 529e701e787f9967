//! Request context extraction
//!
//! Authentication happens in front of this service; the gateway forwards
//! the authenticated user in `X-Actor-Id`. The request id set by the
//! request-id layer becomes the correlation id of the unit of work.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use core_kernel::{OperationMetadata, UserId};

use crate::error::ApiError;

pub const ACTOR_HEADER: &str = "x-actor-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Who is calling and under which correlation id
#[derive(Debug, Clone)]
pub struct Caller {
    actor: Option<UserId>,
    correlation_id: Option<String>,
}

impl Caller {
    /// The acting user; required by every write
    pub fn actor(&self) -> Result<UserId, ApiError> {
        self.actor
            .ok_or_else(|| ApiError::Unauthorized(format!("{} header is required", ACTOR_HEADER)))
    }

    pub fn metadata(&self) -> OperationMetadata {
        let mut metadata = match &self.correlation_id {
            Some(id) => OperationMetadata::with_correlation_id(id.clone()),
            None => OperationMetadata::default(),
        };
        if let Some(actor) = self.actor {
            metadata = metadata.initiated_by(actor.to_string());
        }
        metadata
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = match parts.headers.get(ACTOR_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| ApiError::Unauthorized("actor id is not valid text".to_string()))?;
                let actor = raw
                    .parse::<UserId>()
                    .map_err(|_| ApiError::Unauthorized(format!("'{}' is not a user id", raw)))?;
                Some(actor)
            }
            None => None,
        };

        let correlation_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(Caller {
            actor,
            correlation_id,
        })
    }
}
