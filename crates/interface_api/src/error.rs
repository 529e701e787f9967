//! API error handling
//!
//! Domain errors keep their stable code in the response body; the HTTP
//! status is derived from the error kind.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::PortError;
use domain_claims::error::{ClaimError, ErrorKind};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Missing or invalid actor: {0}")]
    Unauthorized(String),

    #[error("Validation error")]
    Validation(Vec<String>),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

fn claim_status(error: &ClaimError) -> StatusCode {
    match error.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => match error {
            ClaimError::AttachmentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        },
        ErrorKind::StatusNotAllowed | ErrorKind::InvalidClaimAction => StatusCode::CONFLICT,
        ErrorKind::MissingInformation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::OperationFailed => match error {
            ClaimError::OperationFailed(PortError::Conflict { .. }) => StatusCode::CONFLICT,
            ClaimError::OperationFailed(port) if port.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Claim(error) => claim_status(error),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Claim(error) => error.code(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // storage details stay in the log
        let message = if status.is_server_error() {
            error!(error = %self, code, "request failed");
            "The request could not be completed".to_string()
        } else {
            self.to_string()
        };

        let details = match self {
            ApiError::Validation(details) => Some(details),
            _ => None,
        };

        let body = ErrorResponse {
            error: code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        ApiError::Claim(err.into())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| match &error.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, error.code),
                })
            })
            .collect();
        details.sort();
        ApiError::Validation(details)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::ClaimId;
    use domain_claims::claim::ClaimStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ClaimError::claim_not_found(ClaimId::new()), StatusCode::NOT_FOUND),
            (ClaimError::invalid_input("x"), StatusCode::BAD_REQUEST),
            (ClaimError::InvalidAttachmentType, StatusCode::BAD_REQUEST),
            (
                ClaimError::AttachmentTooLarge { size: 10, limit: 5 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                ClaimError::StatusNotAllowedUpdate { status: ClaimStatus::Reviewing },
                StatusCode::CONFLICT,
            ),
            (
                ClaimError::invalid_transition(ClaimStatus::Draft, ClaimStatus::Approved),
                StatusCode::CONFLICT,
            ),
            (
                ClaimError::MissingInformation {
                    items: 0,
                    required_items: 1,
                    attachments: 0,
                    required_attachments: 3,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ClaimError::OperationFailed(PortError::conflict("dup")),
                StatusCode::CONFLICT,
            ),
            (
                ClaimError::OperationFailed(PortError::connection("down")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ClaimError::OperationFailed(PortError::internal("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let code = error.code();
            assert_eq!(ApiError::from(error).status(), expected, "{}", code);
        }
    }

    #[test]
    fn test_body_keeps_domain_code() {
        let error = ApiError::from(ClaimError::InvalidAttachmentType);
        assert_eq!(error.code(), "INVALID_ATTACHMENT_TYPE");
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
