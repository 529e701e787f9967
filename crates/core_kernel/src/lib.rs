//! Core Kernel - Foundational types for the warranty claims system
//!
//! This crate provides the building blocks shared by the domain and
//! infrastructure crates:
//! - Strongly-typed identifiers for claims, their children and the parties
//!   that act on them
//! - Money types with precise decimal arithmetic
//! - The port error taxonomy and marker traits for hexagonal adapters

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{
    ClaimId, ClaimItemId, AttachmentId, HistoryId,
    VehicleId, CustomerId, UserId, PartCategoryId, PartId,
};
pub use ports::{
    PortError, DomainPort, OperationMetadata,
    HealthCheckable, HealthCheckResult, AdapterHealth,
};
