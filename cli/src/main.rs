//! CLI entrypoint for toolgate
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use toolgate_application::{
    CatalogStore, CompositeStepEvents, Credentials, McqError, McqStateMachine, NoPromptSink,
    OrchestratorError, PreReqChainExecutor, PromptSink, RefreshCatalogUseCase, StepEventSink,
    WriteOrchestrator, WriteOutcome,
};
use toolgate_domain::{ArgMap, FieldValidator, default_prereq_registry};
use toolgate_infrastructure::{
    ConfigLoader, FileConfig, InMemoryMcqStore, JsonlStepLogger, McpToolCaller, TransportNegotiator,
};
use toolgate_presentation::{
    AnswerReader, Cli, Command, ConsoleFormatter, ConsolePromptSink, ConsoleStepReporter,
    OutputFormat, ServerArgs, UserReply,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered log lines are flushed
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("Failed to load configuration: {e}"))?
    };
    config.validate().context("Invalid configuration")?;

    info!("Starting toolgate");

    match cli.command {
        None => bail!("No command given. Run `toolgate --help` for usage."),
        Some(Command::Validate { tool, args }) => {
            let args = parse_args(&args)?;
            let result = FieldValidator::default().validate(&tool, &args);
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_validation(&tool, &result)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            }
            Ok(())
        }
        Some(Command::Discover { server }) => {
            let (_, store) = discover(&config, &server).await?;
            let catalog = store.snapshot();
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_catalog(&catalog)),
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_catalog_json(&catalog)),
            }
            Ok(())
        }
        Some(Command::Write {
            tool,
            args,
            conversation,
            server,
        }) => {
            let args = parse_args(&args)?;
            let (negotiator, store) = discover(&config, &server).await?;

            // === Dependency Injection ===
            let mut sinks: Vec<Arc<dyn StepEventSink>> = Vec::new();
            if !cli.quiet {
                sinks.push(Arc::new(
                    ConsoleStepReporter::new().with_verbose(cli.verbose > 0),
                ));
            }
            if let Some(path) = config.logging.step_log_path() {
                match JsonlStepLogger::new(&path) {
                    Some(logger) => sinks.push(Arc::new(logger)),
                    None => warn!(path = %path.display(), "Step log disabled"),
                }
            }

            let executor = PreReqChainExecutor::new(Arc::new(default_prereq_registry()))
                .with_params(config.write_safety.to_params())
                .with_events(Arc::new(CompositeStepEvents::new(sinks)));
            let mcq = McqStateMachine::new(Arc::new(InMemoryMcqStore::new()))
                .with_params(config.mcq.to_params());
            let prompts: Arc<dyn PromptSink> = match cli.output {
                OutputFormat::Text => Arc::new(ConsolePromptSink),
                OutputFormat::Json => Arc::new(NoPromptSink),
            };
            let orchestrator =
                WriteOrchestrator::new(executor, mcq, Arc::new(McpToolCaller::new(negotiator)))
                    .with_catalog(store)
                    .with_prompts(prompts);

            let outcome = run_write(&orchestrator, &conversation, &tool, args, cli.output).await?;
            match cli.output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_outcome(&outcome)),
                OutputFormat::Json => println!("{}", ConsoleFormatter::format_outcome_json(&outcome)),
            }
            Ok(())
        }
    }
}

/// Initialize logging based on verbosity level. `RUST_LOG` wins when set.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("--log-file must name a file: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn parse_args(raw: &str) -> Result<ArgMap> {
    match serde_json::from_str::<Value>(raw).context("--args is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--args must be a JSON object, got {other}"),
    }
}

/// Negotiate a transport and load the tool catalog.
async fn discover(
    config: &FileConfig,
    server: &ServerArgs,
) -> Result<(Arc<TransportNegotiator>, Arc<CatalogStore>)> {
    let mut negotiator_config = config.discovery.to_negotiator_config();
    if let Some(url) = &server.server_url {
        negotiator_config.server_url = url.clone();
        negotiator_config.sse_url = None;
    }
    let credentials = Credentials::new(&server.token, &server.entity_id, &server.org_id)?;

    let negotiator = Arc::new(
        TransportNegotiator::new(negotiator_config).context("Failed to build HTTP client")?,
    );
    let store = Arc::new(CatalogStore::new());
    RefreshCatalogUseCase::new(negotiator.clone(), store.clone())
        .execute(&credentials)
        .await?;

    Ok((negotiator, store))
}

/// Run a write, answering questions on stdin until the flow settles.
async fn run_write(
    orchestrator: &WriteOrchestrator,
    conversation: &str,
    tool: &str,
    args: ArgMap,
    output: OutputFormat,
) -> Result<WriteOutcome> {
    let mut outcome = orchestrator.execute(conversation, tool, args).await?;
    let mut reader = AnswerReader::stdin();

    loop {
        let WriteOutcome::AwaitingInput { prompt, .. } = &outcome else {
            return Ok(outcome);
        };
        let mcq_id = prompt.mcq_id;
        if output == OutputFormat::Json {
            println!("{}", ConsoleFormatter::format_outcome_json(&outcome));
        }

        outcome = match reader.next_reply().await? {
            UserReply::Cancel => orchestrator.cancel(conversation, mcq_id).await?,
            UserReply::Answer(answer) => {
                match orchestrator.resume(conversation, mcq_id, &answer).await {
                    Ok(next) => next,
                    Err(OrchestratorError::Mcq(McqError::Domain(e))) => {
                        eprintln!("{e}. Pick one of the listed options, or 'q' to cancel.");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };
    }
}
