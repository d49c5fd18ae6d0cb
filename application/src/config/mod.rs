//! Application-level configuration.
//!
//! - [`WriteSafetyParams`]: chain depth, chain deadline, preview cap,
//!   destructive-write confirmation
//! - [`McqParams`]: question lifetime and chaining limit

pub mod write_safety;

pub use write_safety::{McqParams, WriteSafetyParams};
