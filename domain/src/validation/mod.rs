//! Layer 1 write validation: argument completeness and generic invariants.
//!
//! [`FieldValidator::validate`] is a pure function over a tool name and its
//! arguments. It runs only for write tools (see
//! [`WriteVerb`](crate::tool::WriteVerb)); read tools short-circuit to valid.
//!
//! Checks run in order and **accumulate**, so the caller gets every problem in
//! one round trip:
//!
//! 1. Generic invariants ([`shapes`]): no empty argument bag, date-shaped
//!    fields parse, amount-shaped fields are not negative.
//! 2. Tool-specific [`ToolRule`](rules::ToolRule)s: required fields and
//!    per-field [`FieldCheck`](rules::FieldCheck)s.
//! 3. Destructive verbs add an advisory warning.

pub mod field_validator;
pub mod result;
pub mod rules;
pub mod shapes;

pub use field_validator::FieldValidator;
pub use result::ValidationResult;
pub use rules::{FieldCheck, ToolRule};
