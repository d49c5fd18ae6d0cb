//! Write-safety parameters: use-case loop control for Layer 2 and MCQs.
//!
//! These are application-layer concerns, not domain policy. The per-tool
//! chains themselves are domain data
//! ([`PreReqRegistry`](toolgate_domain::PreReqRegistry)).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolgate_domain::prereq::{DEFAULT_MAX_CHAIN_DEPTH, DEFAULT_PREVIEW_LIMIT, HARD_MAX_CHAIN_DEPTH};

/// Chain execution and confirmation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteSafetyParams {
    /// Steps a chain may run, clamped to the hard cap.
    pub max_chain_depth: usize,
    /// Overall deadline for one chain execution.
    pub chain_timeout: Duration,
    /// Cap on options in a chain-raised question.
    pub preview_limit: usize,
    /// Destructive verbs require a yes/no confirmation before invoking.
    pub confirm_destructive: bool,
}

impl Default for WriteSafetyParams {
    fn default() -> Self {
        Self {
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
            chain_timeout: Duration::from_secs(30),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            confirm_destructive: true,
        }
    }
}

impl WriteSafetyParams {
    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth;
        self
    }

    pub fn with_chain_timeout(mut self, timeout: Duration) -> Self {
        self.chain_timeout = timeout;
        self
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    pub fn with_confirm_destructive(mut self, confirm: bool) -> Self {
        self.confirm_destructive = confirm;
        self
    }

    pub fn effective_depth(&self) -> usize {
        self.max_chain_depth.min(HARD_MAX_CHAIN_DEPTH)
    }
}

/// MCQ lifecycle parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McqParams {
    /// Lifetime of a pending question.
    pub ttl: Duration,
    /// Chained questions allowed in one write flow before consolidating.
    pub max_chained: u32,
}

impl Default for McqParams {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_chained: 2,
        }
    }
}

impl McqParams {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_chained(mut self, max: u32) -> Self {
        self.max_chained = max;
        self
    }
}
