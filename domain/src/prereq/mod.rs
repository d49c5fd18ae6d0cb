//! Pre-requisite chains (Layer 2 write validation)
//!
//! A chain is configuration, not code: an ordered list of [`PreReqStep`]s
//! keyed by write-tool name in a [`PreReqRegistry`]. Each step names a
//! read-only tool, how to build its arguments, and what to do with the
//! answer. The interpreter lives in the application layer
//! (`PreReqChainExecutor`); this module only describes chains and their
//! results.
//!
//! ```text
//!  write args ─┐
//!              ▼
//!   ┌────────────────────┐  condition false   ┌──────────┐
//!   │ step N             │───────────────────▶│ skipped  │──▶ step N+1
//!   │ extract_args       │                    └──────────┘
//!   │ call read tool     │  call failed ──▶ on_failure: abort | skip | ask_user
//!   │ parse + unwrap     │
//!   │ extract_field ─────┼──▶ inject_into (write arg, or `_chain` data)
//!   │ validate           │──▶ Pass | Resolve(v) | Block | AskUser
//!   └────────────────────┘
//! ```
//!
//! Block and AskUser end the chain immediately. Enriched arguments are only
//! handed back on [`ChainOutcome::Passed`].

pub mod payload;
pub mod policies;
pub mod result;
pub mod step;

pub use policies::default_prereq_registry;
pub use result::{ChainOutcome, PreReqChainResult, StepTrace};
pub use step::{
    DEFAULT_MAX_CHAIN_DEPTH, DEFAULT_PREVIEW_LIMIT, FailurePolicy, HARD_MAX_CHAIN_DEPTH,
    InjectTarget, PreReqConfig, PreReqRegistry, PreReqStep, StepInput, StepVerdict,
};
