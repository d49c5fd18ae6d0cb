//! Pre-Requisite Chain Executor (Layer 2)
//!
//! Interprets the declarative chains of a [`PreReqRegistry`] against a live
//! [`ToolCaller`].
//!
//! # Flow
//!
//! ```text
//! run(tool, args, caller)
//!   │
//!   ├─ no chain for tool ──────────────▶ Passed(args unchanged)
//!   │
//!   └─ for step in steps[..depth]            (sequential, never parallel)
//!        ├─ condition false ───────────▶ trace skipped, continue
//!        ├─ signature seen before ─────▶ trace skipped (cycle guard), continue
//!        ├─ call read tool
//!        │    └─ Err ──▶ on_failure: Abort ▶ Blocked
//!        │                           Skip  ▶ continue
//!        │                           AskUser ▶ AskUser
//!        ├─ parse + unwrap, extract_field ▶ inject_into
//!        └─ validate ──▶ Pass | Resolve(v) ▶ inject, continue
//!                        Block ▶ Blocked (stop)
//!                        AskUser ▶ AskUser (stop)
//! ```
//!
//! The whole run is bounded by [`WriteSafetyParams::chain_timeout`]; a
//! silent remote side surfaces as [`ChainError::DeadlineExceeded`], never a
//! hang.

use crate::config::WriteSafetyParams;
use crate::ports::step_events::{NoStepEvents, StepEvent, StepEventSink, StepStatus};
use crate::ports::tool_caller::ToolCaller;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use toolgate_domain::core::args::{self, ArgMap, ChainData};
use toolgate_domain::prereq::payload;
use toolgate_domain::{
    ChainOutcome, FailurePolicy, InjectTarget, PreReqChainResult, PreReqConfig, PreReqRegistry,
    PreReqStep, StepInput, StepTrace, StepVerdict,
};
use tracing::{debug, info, warn};

/// Infrastructure failures of a chain run. Business outcomes are values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Pre-requisite chain for '{tool}' exceeded its {timeout_ms}ms deadline")]
    DeadlineExceeded { tool: String, timeout_ms: u64 },
}

pub struct PreReqChainExecutor {
    registry: Arc<PreReqRegistry>,
    events: Arc<dyn StepEventSink>,
    params: WriteSafetyParams,
}

impl PreReqChainExecutor {
    pub fn new(registry: Arc<PreReqRegistry>) -> Self {
        Self {
            registry,
            events: Arc::new(NoStepEvents),
            params: WriteSafetyParams::default(),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn StepEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_params(mut self, params: WriteSafetyParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> &WriteSafetyParams {
        &self.params
    }

    pub fn has_chain(&self, tool: &str) -> bool {
        self.registry.contains(tool)
    }

    /// Run the chain guarding `tool`.
    pub async fn run(
        &self,
        tool: &str,
        args: &ArgMap,
        caller: &dyn ToolCaller,
    ) -> Result<PreReqChainResult, ChainError> {
        let Some(config) = self.registry.get(tool) else {
            debug!(tool = %tool, "No pre-requisite chain configured");
            return Ok(PreReqChainResult::pass_through(args.clone()));
        };

        let deadline = self.params.chain_timeout;
        match tokio::time::timeout(deadline, self.run_steps(tool, config, args, caller)).await {
            Ok(result) => Ok(result),
            Err(_) => {
                warn!(tool = %tool, timeout_ms = deadline.as_millis() as u64, "Pre-requisite chain deadline exceeded");
                Err(ChainError::DeadlineExceeded {
                    tool: tool.to_string(),
                    timeout_ms: deadline.as_millis() as u64,
                })
            }
        }
    }

    async fn run_steps(
        &self,
        tool: &str,
        config: &PreReqConfig,
        args: &ArgMap,
        caller: &dyn ToolCaller,
    ) -> PreReqChainResult {
        let depth = config.effective_depth().min(self.params.effective_depth());
        if config.steps.len() > depth {
            warn!(
                tool = %tool,
                steps = config.steps.len(),
                depth,
                "Pre-requisite chain truncated at max depth"
            );
        }

        let mut enriched = args.clone();
        let mut chain = ChainData::new();
        let mut visited = HashSet::new();
        let mut trace = Vec::new();

        for step in config.steps.iter().take(depth) {
            if !step.should_run(&enriched, &chain) {
                debug!(tool = %step.tool, "Pre-requisite step skipped (condition)");
                trace.push(StepTrace::skipped(&step.tool, "condition not met"));
                self.emit(
                    StepEvent::new(&step.tool, StepStatus::Passed)
                        .with_data(json!({"skipped": "condition"})),
                );
                continue;
            }

            let sub_args = step.build_args(&enriched, &chain);
            if !visited.insert(step.signature(&sub_args)) {
                warn!(tool = %step.tool, "Duplicate pre-requisite call skipped (cycle guard)");
                trace.push(StepTrace::skipped(&step.tool, "duplicate call"));
                self.emit(
                    StepEvent::new(&step.tool, StepStatus::Passed)
                        .with_data(json!({"skipped": "duplicate"})),
                );
                continue;
            }

            self.emit(StepEvent::new(&step.tool, StepStatus::Executing));
            let started = Instant::now();
            let response = caller.call(&step.tool, &sub_args).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let raw = match response {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(tool = %step.tool, duration_ms, error = %e, "Pre-requisite call failed");
                    trace.push(StepTrace::ran(&step.tool, false, duration_ms).with_note(e.to_string()));
                    self.emit(
                        StepEvent::new(&step.tool, StepStatus::Failed)
                            .with_duration(duration_ms)
                            .with_data(json!({"error": e.to_string()})),
                    );
                    match step.on_failure {
                        FailurePolicy::Skip => continue,
                        FailurePolicy::Abort => {
                            return finish(
                                ChainOutcome::Blocked {
                                    reason: format!(
                                        "Could not verify {} before {tool}: {e}",
                                        step.tool
                                    ),
                                },
                                trace,
                            );
                        }
                        FailurePolicy::AskUser => {
                            return finish(failure_question(step, tool), trace);
                        }
                    }
                }
            };

            let result = payload::parse_result(&raw);
            if let (Some(path), Some(target)) = (&step.extract_field, &step.inject_into)
                && let Some(value) = payload::first_record(&result)
                    .and_then(|record| args::get_path(record, path))
                    .filter(|v| args::is_present(v))
            {
                inject(target, value.clone(), &mut enriched, &mut chain);
            }

            let verdict = match &step.validate {
                Some(validate) => validate(&StepInput {
                    result: &result,
                    args: &enriched,
                    chain: &chain,
                    preview_limit: self.params.preview_limit,
                }),
                None => StepVerdict::Pass,
            };

            match verdict {
                StepVerdict::Pass => {
                    debug!(tool = %step.tool, duration_ms, "Pre-requisite step passed");
                    trace.push(StepTrace::ran(&step.tool, true, duration_ms));
                    self.emit(
                        StepEvent::new(&step.tool, StepStatus::Passed).with_duration(duration_ms),
                    );
                }
                StepVerdict::Resolve(value) => {
                    let field = match &step.inject_into {
                        Some(target) => {
                            inject(target, value, &mut enriched, &mut chain);
                            target.key().to_string()
                        }
                        None => {
                            warn!(tool = %step.tool, "Resolved value has no injection target");
                            String::new()
                        }
                    };
                    debug!(tool = %step.tool, field = %field, "Pre-requisite step resolved a value");
                    trace.push(
                        StepTrace::ran(&step.tool, true, duration_ms)
                            .with_note(format!("resolved {field}")),
                    );
                    self.emit(
                        StepEvent::new(&step.tool, StepStatus::Passed)
                            .with_duration(duration_ms)
                            .with_data(json!({"resolved": field})),
                    );
                }
                StepVerdict::Block { reason } => {
                    info!(tool = %tool, step = %step.tool, reason = %reason, "Write blocked by pre-requisite");
                    trace.push(StepTrace::ran(&step.tool, true, duration_ms).with_note(&reason));
                    self.emit(
                        StepEvent::new(&step.tool, StepStatus::Blocked)
                            .with_duration(duration_ms)
                            .with_data(json!({"reason": reason})),
                    );
                    return finish(ChainOutcome::Blocked { reason }, trace);
                }
                StepVerdict::AskUser {
                    question,
                    options,
                    missing_field,
                } => {
                    info!(tool = %tool, step = %step.tool, options = options.len(), "Pre-requisite needs user input");
                    trace.push(
                        StepTrace::ran(&step.tool, true, duration_ms).with_note("needs input"),
                    );
                    self.emit(
                        StepEvent::new(&step.tool, StepStatus::NeedsInput)
                            .with_duration(duration_ms)
                            .with_data(json!({
                                "question": question,
                                "options": options.len(),
                                "missingField": missing_field,
                            })),
                    );
                    return finish(
                        ChainOutcome::AskUser {
                            question,
                            options,
                            missing_field,
                        },
                        trace,
                    );
                }
            }
        }

        finish(
            ChainOutcome::Passed {
                enriched_args: enriched,
            },
            trace,
        )
    }

    fn emit(&self, event: StepEvent) {
        self.events.emit(event);
    }
}

fn finish(outcome: ChainOutcome, steps_executed: Vec<StepTrace>) -> PreReqChainResult {
    PreReqChainResult {
        outcome,
        steps_executed,
    }
}

fn inject(target: &InjectTarget, value: Value, enriched: &mut ArgMap, chain: &mut ChainData) {
    match target {
        InjectTarget::WriteArg(field) => args::set(enriched, field, value),
        InjectTarget::ChainData(key) => {
            chain.insert(key.clone(), value);
        }
    }
}

fn failure_question(step: &PreReqStep, tool: &str) -> ChainOutcome {
    let question = match &step.missing_field {
        Some(field) => format!(
            "I couldn't look up the {field} for {tool} automatically. Which {field} should I use?"
        ),
        None => format!(
            "I couldn't run {} to check {tool}. How would you like to proceed?",
            step.tool
        ),
    };
    ChainOutcome::AskUser {
        question,
        options: Vec::new(),
        missing_field: step.missing_field.clone(),
    }
}
