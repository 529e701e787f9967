//! Infrastructure Object Storage Layer
//!
//! Stores claim evidence files (photos and videos) in an S3-compatible
//! bucket and implements the domain's [`ObjectStore`](domain_claims::ports::ObjectStore)
//! port. Only the URL of each object is persisted by the database layer.

pub mod config;
pub mod error;
pub mod keys;
pub mod bucket;

pub use config::S3Config;
pub use error::StorageError;
pub use bucket::S3ObjectStore;
