//! Core domain concepts shared across all subdomains.
//!
//! - [`args`]: argument bags and key-insensitive lookups
//! - [`error::DomainError`]: domain-level errors

pub mod args;
pub mod error;
