//! Object storage error types

use core_kernel::PortError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Credentials or bucket settings were rejected before any request
    #[error("Invalid storage configuration: {0}")]
    Configuration(String),

    /// The request reached the store but was refused
    #[error("Object store returned status {status} for '{key}'")]
    UnexpectedStatus { status: u16, key: String },

    /// The URL does not point into the configured bucket
    #[error("URL is not managed by this store: {0}")]
    ForeignUrl(String),

    #[error("Object store request failed: {0}")]
    Request(#[from] s3::error::S3Error),
}

impl From<StorageError> for PortError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::ForeignUrl(url) => PortError::not_found("StoredObject", url),
            StorageError::Request(source) => {
                PortError::connection(format!("object store request failed: {}", source))
            }
            other => PortError::internal(other.to_string()),
        }
    }
}
