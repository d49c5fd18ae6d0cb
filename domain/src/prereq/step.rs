//! Declarative pre-requisite steps.

use crate::core::args::{ArgMap, ChainData, normalize_key};
use crate::mcq::McqOption;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Default number of steps a chain may run.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 5;

/// Upper bound on steps per chain, whatever the configuration says.
pub const HARD_MAX_CHAIN_DEPTH: usize = 10;

/// Default cap on options offered in a chain-raised question.
pub const DEFAULT_PREVIEW_LIMIT: usize = 5;

/// Predicate deciding whether a step runs.
pub type StepCondition = Arc<dyn Fn(&ArgMap, &ChainData) -> bool + Send + Sync>;

/// Builds the sub-call arguments from the write arguments and chain data.
pub type ArgsExtractor = Arc<dyn Fn(&ArgMap, &ChainData) -> ArgMap + Send + Sync>;

/// Turns a sub-call result into a verdict.
pub type StepValidate = Arc<dyn Fn(&StepInput<'_>) -> StepVerdict + Send + Sync>;

/// What a `validate` hook sees.
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    /// Parsed, envelope-unwrapped sub-call result
    pub result: &'a Value,
    /// Write arguments as enriched so far
    pub args: &'a ArgMap,
    pub chain: &'a ChainData,
    /// Cap on options in an ask-user verdict
    pub preview_limit: usize,
}

/// Verdict of a `validate` hook.
#[derive(Debug, Clone, PartialEq)]
pub enum StepVerdict {
    /// Continue with the next step.
    Pass,
    /// Terminal: the write must not proceed.
    Block { reason: String },
    /// Suspend: a human must answer.
    AskUser {
        question: String,
        options: Vec<McqOption>,
        missing_field: Option<String>,
    },
    /// Inject this value into the step's target and continue.
    Resolve(Value),
}

impl StepVerdict {
    pub fn block(reason: impl Into<String>) -> Self {
        StepVerdict::Block {
            reason: reason.into(),
        }
    }

    pub fn ask(
        question: impl Into<String>,
        options: Vec<McqOption>,
        missing_field: Option<&str>,
    ) -> Self {
        StepVerdict::AskUser {
            question: question.into(),
            options,
            missing_field: missing_field.map(str::to_string),
        }
    }
}

/// What to do when the sub-call itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Block the whole chain.
    #[default]
    Abort,
    /// Record the failure and continue.
    Skip,
    /// Suspend and ask the user for the value the step would have found.
    AskUser,
}

/// Where an extracted or resolved value is written.
///
/// Parsed from a field name: a leading `_` means chain-scoped data
/// (`_contact_id` -> chain key `contact_id`), anything else is a write
/// argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectTarget {
    WriteArg(String),
    ChainData(String),
}

impl InjectTarget {
    pub fn parse(field: &str) -> Self {
        match field.strip_prefix('_') {
            Some(key) => InjectTarget::ChainData(key.to_string()),
            None => InjectTarget::WriteArg(field.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            InjectTarget::WriteArg(k) | InjectTarget::ChainData(k) => k,
        }
    }
}

/// One read-only call in a pre-requisite chain.
#[derive(Clone)]
pub struct PreReqStep {
    pub tool: String,
    pub condition: Option<StepCondition>,
    pub extract_args: ArgsExtractor,
    /// Dotted path copied from the result into `inject_into`
    pub extract_field: Option<String>,
    pub inject_into: Option<InjectTarget>,
    pub validate: Option<StepValidate>,
    pub on_failure: FailurePolicy,
    /// Write argument to ask for when the sub-call fails under `AskUser`
    pub missing_field: Option<String>,
    pub description: Option<String>,
}

impl PreReqStep {
    pub fn new(
        tool: impl Into<String>,
        extract_args: impl Fn(&ArgMap, &ChainData) -> ArgMap + Send + Sync + 'static,
    ) -> Self {
        Self {
            tool: tool.into(),
            condition: None,
            extract_args: Arc::new(extract_args),
            extract_field: None,
            inject_into: None,
            validate: None,
            on_failure: FailurePolicy::Abort,
            missing_field: None,
            description: None,
        }
    }

    pub fn when(
        mut self,
        condition: impl Fn(&ArgMap, &ChainData) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn extract_field(mut self, path: impl Into<String>) -> Self {
        self.extract_field = Some(path.into());
        self
    }

    pub fn inject_into(mut self, field: &str) -> Self {
        self.inject_into = Some(InjectTarget::parse(field));
        self
    }

    pub fn validate(
        mut self,
        validate: impl Fn(&StepInput<'_>) -> StepVerdict + Send + Sync + 'static,
    ) -> Self {
        self.validate = Some(Arc::new(validate));
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn asks_for(mut self, field: impl Into<String>) -> Self {
        self.missing_field = Some(field.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn should_run(&self, args: &ArgMap, chain: &ChainData) -> bool {
        self.condition.as_ref().is_none_or(|c| c(args, chain))
    }

    pub fn build_args(&self, args: &ArgMap, chain: &ChainData) -> ArgMap {
        (self.extract_args)(args, chain)
    }

    /// Cycle-guard key: tool plus canonical sub-arguments.
    ///
    /// `serde_json::Map` keeps keys sorted, so equal argument bags render
    /// identically.
    pub fn signature(&self, sub_args: &ArgMap) -> String {
        format!("{}:{}", self.tool, Value::Object(sub_args.clone()))
    }
}

impl fmt::Debug for PreReqStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreReqStep")
            .field("tool", &self.tool)
            .field("conditional", &self.condition.is_some())
            .field("extract_field", &self.extract_field)
            .field("inject_into", &self.inject_into)
            .field("validates", &self.validate.is_some())
            .field("on_failure", &self.on_failure)
            .field("description", &self.description)
            .finish()
    }
}

/// Ordered steps guarding one write tool.
#[derive(Debug, Clone)]
pub struct PreReqConfig {
    pub steps: Vec<PreReqStep>,
    pub max_chain_depth: usize,
}

impl PreReqConfig {
    pub fn new(steps: Vec<PreReqStep>) -> Self {
        Self {
            steps,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }

    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth;
        self
    }

    /// Steps actually allowed to run, capped by [`HARD_MAX_CHAIN_DEPTH`].
    pub fn effective_depth(&self) -> usize {
        self.max_chain_depth.min(HARD_MAX_CHAIN_DEPTH)
    }
}

/// Per-tool chain table. Lookups ignore namespaces and key spelling.
#[derive(Debug, Clone, Default)]
pub struct PreReqRegistry {
    configs: BTreeMap<String, PreReqConfig>,
}

impl PreReqRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: &str, config: PreReqConfig) {
        self.configs.insert(normalize_key(tool), config);
    }

    pub fn with(mut self, tool: &str, config: PreReqConfig) -> Self {
        self.register(tool, config);
        self
    }

    pub fn get(&self, tool: &str) -> Option<&PreReqConfig> {
        let base = tool.rsplit(['.', '/', ':']).next().unwrap_or(tool);
        self.configs.get(&normalize_key(base))
    }

    pub fn contains(&self, tool: &str) -> bool {
        self.get(tool).is_some()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Cap every registered chain at `depth` (still bounded by the hard cap).
    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        for config in self.configs.values_mut() {
            config.max_chain_depth = depth;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup(args: &ArgMap, _: &ChainData) -> ArgMap {
        let mut sub = ArgMap::new();
        if let Some(id) = args.get("InvoiceID") {
            sub.insert("InvoiceID".into(), id.clone());
        }
        sub
    }

    #[test]
    fn test_inject_target_prefix() {
        assert_eq!(
            InjectTarget::parse("_contact_id"),
            InjectTarget::ChainData("contact_id".into())
        );
        assert_eq!(
            InjectTarget::parse("Email"),
            InjectTarget::WriteArg("Email".into())
        );
    }

    #[test]
    fn test_condition_defaults_to_true() {
        let step = PreReqStep::new("get_invoice", lookup);
        assert!(step.should_run(&ArgMap::new(), &ChainData::new()));

        let guarded = step.when(|args, _| !args.contains_key("Email"));
        let mut args = ArgMap::new();
        args.insert("Email".into(), json!("a@b.co"));
        assert!(!guarded.should_run(&args, &ChainData::new()));
    }

    #[test]
    fn test_signature_is_order_independent() {
        let step = PreReqStep::new("list_accounts", lookup);
        let a = json!({"Type": "BANK", "Status": "ACTIVE"});
        let b = json!({"Status": "ACTIVE", "Type": "BANK"});
        assert_eq!(
            step.signature(a.as_object().unwrap()),
            step.signature(b.as_object().unwrap())
        );
    }

    #[test]
    fn test_effective_depth_is_capped() {
        let config = PreReqConfig::new(vec![]).with_max_chain_depth(50);
        assert_eq!(config.effective_depth(), HARD_MAX_CHAIN_DEPTH);
        assert_eq!(PreReqConfig::new(vec![]).effective_depth(), 5);
    }

    #[test]
    fn test_registry_lookup_normalizes() {
        let registry = PreReqRegistry::new().with(
            "void_invoice",
            PreReqConfig::new(vec![PreReqStep::new("get_invoice", lookup)]),
        );
        assert!(registry.contains("voidInvoice"));
        assert!(registry.contains("books.void_invoice"));
        assert!(!registry.contains("create_invoice"));
    }
}
