//! Request and response bodies
//!
//! Requests are validated with `validator` before they reach the services;
//! enum-valued fields arrive as text and are parsed by the domain so an
//! unknown name yields the domain's `INVALID_INPUT` code.

pub mod attachments;
pub mod claims;
pub mod items;
