//! Request handlers, one module per resource

pub mod attachments;
pub mod claims;
pub mod health;
pub mod items;
