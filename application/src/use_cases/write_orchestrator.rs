//! Write Orchestrator
//!
//! Sequences the write-safety pipeline for one tool call:
//!
//! ```text
//! execute(conversation, tool, args)
//!   │  supersede stale MCQ
//!   ▼
//! Layer 1  FieldValidator ──── invalid ───────────▶ Invalid(ValidationResult)
//!   ▼
//! Layer 2  PreReqChainExecutor
//!   ├── Blocked ──────────────────────────────────▶ Blocked
//!   ├── AskUser ──▶ save MCQ, push prompt ────────▶ AwaitingInput
//!   └── Passed
//!         ├── destructive + confirm ──▶ Yes/No MCQ ▶ AwaitingInput
//!         └── invoke tool ────────────────────────▶ Executed
//!
//! resume(conversation, mcq, answer)
//!   resolve MCQ ──▶ substitute answer ──▶ re-enter at Layer 1 (depth + 1)
//! ```
//!
//! Resumption is a fresh pass through the whole pipeline with the answer
//! substituted, never a jump back into the suspended step. After
//! `max_chained` answered questions in one flow the next ask becomes a single
//! consolidated free-text question; anything beyond that is blocked.

use super::catalog::CatalogStore;
use super::mcq_state_machine::{McqError, McqStateMachine};
use super::prereq_chain::{ChainError, PreReqChainExecutor};
use crate::ports::prompt_sink::{NoPromptSink, PromptSink};
use crate::ports::tool_caller::{ToolCallError, ToolCaller};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use toolgate_domain::core::args::{self, ArgMap};
use toolgate_domain::{
    ChainOutcome, FieldValidator, McqAnswer, McqDraft, McqId, McqOption, McqPrompt, McqState,
    McqType, PreReqChainResult, StepTrace, ValidationResult, WriteVerb,
};
use tracing::{info, warn};

/// Infrastructure failures. Business outcomes are [`WriteOutcome`]s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Mcq(#[from] McqError),

    #[error(transparent)]
    ToolCall(#[from] ToolCallError),
}

#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// The tool ran; `result` is its raw output.
    Executed {
        tool: String,
        result: String,
        warnings: Vec<String>,
        steps: Vec<StepTrace>,
    },
    /// Layer 1 rejected the arguments.
    Invalid(ValidationResult),
    /// A pre-requisite vetoed the write.
    Blocked {
        reason: String,
        steps: Vec<StepTrace>,
    },
    /// Paused on a question.
    AwaitingInput {
        prompt: McqPrompt,
        steps: Vec<StepTrace>,
    },
    /// The user declined or cancelled.
    Cancelled { mcq_id: McqId },
    /// Not in the current catalog snapshot.
    UnknownTool { tool: String },
}

impl WriteOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, WriteOutcome::Executed { .. })
    }

    pub fn prompt(&self) -> Option<&McqPrompt> {
        match self {
            WriteOutcome::AwaitingInput { prompt, .. } => Some(prompt),
            _ => None,
        }
    }

    pub fn steps(&self) -> &[StepTrace] {
        match self {
            WriteOutcome::Executed { steps, .. }
            | WriteOutcome::Blocked { steps, .. }
            | WriteOutcome::AwaitingInput { steps, .. } => steps,
            _ => &[],
        }
    }
}

pub struct WriteOrchestrator {
    validator: FieldValidator,
    executor: PreReqChainExecutor,
    mcq: McqStateMachine,
    caller: Arc<dyn ToolCaller>,
    catalog: Option<Arc<CatalogStore>>,
    prompts: Arc<dyn PromptSink>,
}

impl WriteOrchestrator {
    pub fn new(
        executor: PreReqChainExecutor,
        mcq: McqStateMachine,
        caller: Arc<dyn ToolCaller>,
    ) -> Self {
        Self {
            validator: FieldValidator::default(),
            executor,
            mcq,
            caller,
            catalog: None,
            prompts: Arc::new(NoPromptSink),
        }
    }

    pub fn with_validator(mut self, validator: FieldValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Reject tools missing from a non-empty catalog snapshot.
    pub fn with_catalog(mut self, catalog: Arc<CatalogStore>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_prompts(mut self, prompts: Arc<dyn PromptSink>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn validator(&self) -> &FieldValidator {
        &self.validator
    }

    /// Handle a new write request. Any pending question in the conversation
    /// is superseded.
    pub async fn execute(
        &self,
        conversation_id: &str,
        tool: &str,
        args: ArgMap,
    ) -> Result<WriteOutcome, OrchestratorError> {
        if let Some(stale) = self.mcq.supersede(conversation_id).await? {
            info!(conversation = %conversation_id, mcq = %stale, "New request superseded pending MCQ");
        }
        self.run_flow(conversation_id, tool, args, 0, false).await
    }

    /// Resume a paused write with the user's answer.
    pub async fn resume(
        &self,
        conversation_id: &str,
        mcq_id: McqId,
        answer: &McqAnswer,
    ) -> Result<WriteOutcome, OrchestratorError> {
        let state = self.mcq.resolve(conversation_id, mcq_id, answer).await?;
        let selected = state
            .selected_option
            .clone()
            .unwrap_or_else(|| McqOption::new("none", "", Value::Null));
        let McqState {
            mcq_type,
            pending_tool,
            mut pending_args,
            chain_depth,
            missing_field,
            ..
        } = state;

        if mcq_type == McqType::WriteConfirmation {
            if selected.value == Value::Bool(true) {
                return self
                    .run_flow(conversation_id, &pending_tool, pending_args, chain_depth, true)
                    .await;
            }
            info!(conversation = %conversation_id, tool = %pending_tool, "Write declined at confirmation");
            return Ok(WriteOutcome::Cancelled { mcq_id });
        }

        match &missing_field {
            Some(field) => args::set(&mut pending_args, field, selected.value),
            None => warn!(mcq = %mcq_id, "Answered MCQ names no target field"),
        }
        self.run_flow(
            conversation_id,
            &pending_tool,
            pending_args,
            chain_depth + 1,
            false,
        )
        .await
    }

    /// Cancel a paused write.
    pub async fn cancel(
        &self,
        conversation_id: &str,
        mcq_id: McqId,
    ) -> Result<WriteOutcome, OrchestratorError> {
        self.mcq.cancel(conversation_id, mcq_id).await?;
        Ok(WriteOutcome::Cancelled { mcq_id })
    }

    /// The question currently awaiting an answer, if any.
    pub async fn pending(&self, conversation_id: &str) -> Result<Option<McqPrompt>, OrchestratorError> {
        Ok(self
            .mcq
            .load_pending(conversation_id)
            .await?
            .as_ref()
            .map(McqPrompt::from))
    }

    async fn run_flow(
        &self,
        conversation_id: &str,
        tool: &str,
        args: ArgMap,
        depth: u32,
        confirmed: bool,
    ) -> Result<WriteOutcome, OrchestratorError> {
        if let Some(catalog) = &self.catalog {
            let snapshot = catalog.snapshot();
            if !snapshot.is_empty() && !snapshot.contains(tool) {
                warn!(tool = %tool, "Tool not in catalog");
                return Ok(WriteOutcome::UnknownTool {
                    tool: tool.to_string(),
                });
            }
        }

        let validation = self.validator.validate(tool, &args);
        if !validation.valid {
            info!(tool = %tool, errors = validation.errors.len(), "Write rejected by field validation");
            return Ok(WriteOutcome::Invalid(validation));
        }
        let warnings = validation.warnings;
        let args = validation.sanitized_args.unwrap_or(args);

        let PreReqChainResult {
            outcome,
            steps_executed: steps,
        } = self.executor.run(tool, &args, self.caller.as_ref()).await?;

        match outcome {
            ChainOutcome::Passed { enriched_args } => {
                let destructive = WriteVerb::from_tool_name(tool).is_some_and(|v| v.is_destructive());
                if destructive && self.executor.params().confirm_destructive && !confirmed {
                    let draft = McqDraft::write_confirmation(tool, &warnings.join(" "));
                    let state = McqState::new(conversation_id, draft, tool, enriched_args)
                        .with_chain_depth(depth);
                    return self.pause(state, steps).await;
                }

                let result = self.caller.call(tool, &enriched_args).await?;
                info!(tool = %tool, steps = steps.len(), "Write executed");
                Ok(WriteOutcome::Executed {
                    tool: tool.to_string(),
                    result,
                    warnings,
                    steps,
                })
            }
            ChainOutcome::Blocked { reason } => Ok(WriteOutcome::Blocked { reason, steps }),
            ChainOutcome::AskUser {
                question,
                options,
                missing_field,
            } => {
                let max_chained = self.mcq.params().max_chained;
                let field = missing_field.as_deref();
                let draft = if depth < max_chained {
                    if options.is_empty() {
                        McqDraft::parameter_resolution(question, options, field)
                    } else {
                        McqDraft::entity_resolution(question, options, field)
                    }
                } else if depth == max_chained {
                    info!(tool = %tool, depth, "Chained MCQ limit reached, consolidating");
                    McqDraft::consolidated(tool, &question, field)
                } else {
                    warn!(tool = %tool, depth, "Too many chained MCQs, blocking");
                    return Ok(WriteOutcome::Blocked {
                        reason: format!(
                            "Too many follow-up questions for {tool}. Please restate the request with all the details."
                        ),
                        steps,
                    });
                };

                let draft = draft.with_context("stepsExecuted", json!(steps.len()));
                let state = McqState::new(conversation_id, draft, tool, args).with_chain_depth(depth);
                self.pause(state, steps).await
            }
        }
    }

    async fn pause(
        &self,
        state: McqState,
        steps: Vec<StepTrace>,
    ) -> Result<WriteOutcome, OrchestratorError> {
        let state = self.mcq.save(state).await?;
        let prompt = McqPrompt::from(&state);
        self.prompts.push(&prompt);
        Ok(WriteOutcome::AwaitingInput { prompt, steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteSafetyParams;
    use crate::test_support::{MemoryStore, RecordingPrompts, RecordingToolCaller};
    use toolgate_domain::{
        McqStatus, PreReqConfig, PreReqRegistry, PreReqStep, StepVerdict, ToolCatalog,
        ToolDescriptor, default_prereq_registry,
    };

    fn args(value: Value) -> ArgMap {
        value.as_object().cloned().unwrap()
    }

    struct Harness {
        caller: Arc<RecordingToolCaller>,
        store: Arc<MemoryStore>,
        prompts: Arc<RecordingPrompts>,
        orchestrator: WriteOrchestrator,
    }

    fn harness_with(registry: PreReqRegistry, caller: RecordingToolCaller) -> Harness {
        let caller = Arc::new(caller);
        let store = Arc::new(MemoryStore::default());
        let prompts = Arc::new(RecordingPrompts::default());
        let orchestrator = WriteOrchestrator::new(
            PreReqChainExecutor::new(Arc::new(registry)).with_params(WriteSafetyParams::default()),
            McqStateMachine::new(store.clone()),
            caller.clone(),
        )
        .with_prompts(prompts.clone());
        Harness {
            caller,
            store,
            prompts,
            orchestrator,
        }
    }

    fn harness(caller: RecordingToolCaller) -> Harness {
        harness_with(default_prereq_registry(), caller)
    }

    #[tokio::test]
    async fn test_invalid_args_never_reach_the_server() {
        let h = harness(RecordingToolCaller::new());
        let outcome = h
            .orchestrator
            .execute("c1", "create_payment", args(json!({"Amount": -5})))
            .await
            .unwrap();
        let WriteOutcome::Invalid(validation) = outcome else {
            panic!("expected invalid");
        };
        assert!(validation.errors.len() >= 2);
        assert!(h.caller.calls().is_empty());
    }

    #[tokio::test]
    async fn test_void_paid_invoice_is_blocked() {
        let h = harness(RecordingToolCaller::new().with_response(
            "get_invoice",
            json!({"InvoiceID": "I-1", "InvoiceNumber": "INV-1", "Status": "PAID"}),
        ));
        let outcome = h
            .orchestrator
            .execute("c1", "void_invoice", args(json!({"InvoiceID": "I-1"})))
            .await
            .unwrap();
        let WriteOutcome::Blocked { reason, steps } = outcome else {
            panic!("expected blocked");
        };
        assert!(reason.contains("PAID"));
        assert_eq!(steps.len(), 1);
        assert_eq!(h.caller.calls_to("void_invoice"), 0);
    }

    #[tokio::test]
    async fn test_destructive_write_needs_confirmation() {
        let h = harness(RecordingToolCaller::new().with_response(
            "get_invoice",
            json!({"InvoiceID": "I-1", "Status": "AUTHORISED"}),
        ));
        let outcome = h
            .orchestrator
            .execute("c1", "void_invoice", args(json!({"InvoiceID": "I-1"})))
            .await
            .unwrap();
        let prompt = outcome.prompt().unwrap().clone();
        assert_eq!(prompt.mcq_type, McqType::WriteConfirmation);
        assert_eq!(h.prompts.prompts.lock().unwrap().len(), 1);
        assert_eq!(h.caller.calls_to("void_invoice"), 0);

        let outcome = h
            .orchestrator
            .resume("c1", prompt.mcq_id, &McqAnswer::FreeText("yes".into()))
            .await
            .unwrap();
        assert!(outcome.is_executed());
        assert_eq!(h.caller.calls_to("void_invoice"), 1);
        assert_eq!(h.store.pending_count("c1"), 0);
    }

    #[tokio::test]
    async fn test_declined_confirmation_cancels() {
        let h = harness(RecordingToolCaller::new().with_response(
            "get_invoice",
            json!({"InvoiceID": "I-1", "Status": "AUTHORISED"}),
        ));
        let prompt = h
            .orchestrator
            .execute("c1", "void_invoice", args(json!({"InvoiceID": "I-1"})))
            .await
            .unwrap()
            .prompt()
            .cloned()
            .unwrap();
        let outcome = h
            .orchestrator
            .resume("c1", prompt.mcq_id, &McqAnswer::Option("no".into()))
            .await
            .unwrap();
        assert!(matches!(outcome, WriteOutcome::Cancelled { .. }));
        assert_eq!(h.caller.calls_to("void_invoice"), 0);
    }

    #[tokio::test]
    async fn test_payment_account_selection_resumes() {
        let accounts: Vec<Value> = (1..=3)
            .map(|i| json!({"AccountID": format!("acc-{i}"), "Type": "BANK", "Name": format!("Bank {i}")}))
            .collect();
        let h = harness(
            RecordingToolCaller::new()
                .with_response("list_accounts", json!(accounts))
                .with_response(
                    "get_invoice",
                    json!({"InvoiceID": "I-1", "Status": "AUTHORISED", "AmountDue": 500}),
                ),
        );

        let outcome = h
            .orchestrator
            .execute(
                "c1",
                "create_payment",
                args(json!({"Amount": 100, "InvoiceID": "I-1"})),
            )
            .await
            .unwrap();
        let prompt = outcome.prompt().unwrap().clone();
        assert_eq!(prompt.mcq_type, McqType::EntityResolution);
        assert_eq!(prompt.options.len(), 3);
        assert_eq!(h.caller.calls_to("get_invoice"), 0);

        let outcome = h
            .orchestrator
            .resume("c1", prompt.mcq_id, &McqAnswer::Option("2".into()))
            .await
            .unwrap();
        assert!(outcome.is_executed());
        let calls = h.caller.calls();
        let (tool, sent) = calls.last().unwrap();
        assert_eq!(tool, "create_payment");
        assert_eq!(sent["AccountId"], "acc-2");
        assert_eq!(h.caller.calls_to("list_accounts"), 1);
    }

    #[tokio::test]
    async fn test_chained_questions_consolidate_then_block() {
        let registry = PreReqRegistry::new().with(
            "create_widget",
            PreReqConfig::new(vec![
                PreReqStep::new("lookup_code", |_, _| ArgMap::new()).validate(|_| {
                    StepVerdict::ask("Which code?", Vec::new(), Some("Code"))
                }),
            ]),
        );
        let h = harness_with(registry, RecordingToolCaller::new());

        let mut outcome = h
            .orchestrator
            .execute("c1", "create_widget", args(json!({"Name": "w"})))
            .await
            .unwrap();
        let mut consolidated = false;
        for _ in 0..3 {
            let prompt = outcome.prompt().unwrap().clone();
            consolidated = prompt.context.contains_key("consolidated");
            outcome = h
                .orchestrator
                .resume("c1", prompt.mcq_id, &McqAnswer::FreeText("X-1".into()))
                .await
                .unwrap();
        }
        assert!(consolidated);
        assert!(matches!(outcome, WriteOutcome::Blocked { .. }));
        assert_eq!(h.caller.calls_to("create_widget"), 0);
    }

    #[tokio::test]
    async fn test_new_request_supersedes_pending_question() {
        let h = harness(RecordingToolCaller::new().with_response(
            "get_invoice",
            json!({"InvoiceID": "I-1", "Status": "AUTHORISED"}),
        ));
        let first = h
            .orchestrator
            .execute("c1", "void_invoice", args(json!({"InvoiceID": "I-1"})))
            .await
            .unwrap()
            .prompt()
            .cloned()
            .unwrap();

        h.orchestrator
            .execute("c1", "create_contact", args(json!({"Name": "Acme"})))
            .await
            .unwrap();

        assert_eq!(h.store.status_of(first.mcq_id), Some(McqStatus::Cancelled));
        assert!(h.orchestrator.pending("c1").await.unwrap().is_none());
        assert!(
            h.orchestrator
                .resume("c1", first.mcq_id, &McqAnswer::Option("yes".into()))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_against_catalog() {
        let catalog = Arc::new(CatalogStore::new());
        catalog.replace(ToolCatalog::from_descriptors(
            vec![ToolDescriptor::new("create_contact", "")],
            chrono::Utc::now(),
        ));
        let h = harness(RecordingToolCaller::new());
        let orchestrator = h.orchestrator.with_catalog(catalog);
        let outcome = orchestrator
            .execute("c1", "create_widget", args(json!({"Name": "w"})))
            .await
            .unwrap();
        assert!(matches!(outcome, WriteOutcome::UnknownTool { .. }));
    }
}
