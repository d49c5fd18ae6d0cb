//! Console output formatter for catalogs, validation results and write outcomes

use colored::Colorize;
use serde_json::{Value, json};
use toolgate_application::WriteOutcome;
use toolgate_domain::{McqPrompt, StepTrace, ToolCatalog, ValidationResult};

/// Formats toolgate results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a discovered catalog, write tools first
    pub fn format_catalog(catalog: &ToolCatalog) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Tool Catalog"));
        output.push('\n');

        let fetched = catalog
            .fetched_at()
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        output.push_str(&format!(
            "{} {} ({} write, fetched {})\n",
            "Tools:".cyan().bold(),
            catalog.len(),
            catalog.write_tools().count(),
            fetched
        ));

        if catalog.write_tools().next().is_some() {
            output.push_str(&Self::section_header("Write tools"));
            for tool in catalog.write_tools() {
                output.push_str(&Self::tool_line(&tool.name, &tool.description, true));
                for param in tool.required_parameters() {
                    output.push_str(&format!(
                        "      {} {} ({})\n",
                        "*".yellow(),
                        param.name,
                        param.param_type
                    ));
                }
            }
        }

        if catalog.read_tools().next().is_some() {
            output.push_str(&Self::section_header("Read tools"));
            for tool in catalog.read_tools() {
                output.push_str(&Self::tool_line(&tool.name, &tool.description, false));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    pub fn format_catalog_json(catalog: &ToolCatalog) -> String {
        let tools: Vec<_> = catalog.all().collect();
        let value = json!({
            "fetchedAt": catalog.fetched_at().map(|at| at.to_rfc3339()),
            "tools": tools,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format a Layer 1 validation result
    pub fn format_validation(tool: &str, result: &ValidationResult) -> String {
        let mut output = String::new();

        if result.valid {
            output.push_str(&format!("{} {} is valid\n", "v".green(), tool.bold()));
        } else {
            output.push_str(&format!("{} {} is invalid\n", "x".red(), tool.bold()));
            for error in &result.errors {
                output.push_str(&format!("  {} {}\n", "error:".red().bold(), error));
            }
        }
        for warning in &result.warnings {
            output.push_str(&format!("  {} {}\n", "warning:".yellow().bold(), warning));
        }
        if let Some(args) = &result.sanitized_args {
            output.push_str(&format!(
                "  {} {}\n",
                "args:".cyan(),
                serde_json::to_string(args).unwrap_or_default()
            ));
        }

        output
    }

    /// Format a question awaiting an answer
    pub fn format_prompt(prompt: &McqPrompt) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\n{} {}\n",
            format!("[{}]", prompt.mcq_type).magenta().bold(),
            prompt.question.bold()
        ));
        for (index, option) in prompt.options.iter().enumerate() {
            output.push_str(&format!("  {} {}", format!("{}.", index + 1).cyan(), option.label));
            if let Some(description) = &option.description {
                output.push_str(&format!(" {}", format!("({description})").dimmed()));
            }
            output.push('\n');
        }
        if prompt.options.is_empty() {
            output.push_str(&format!("  {}\n", "(type a value)".dimmed()));
        }

        output
    }

    /// Format the pre-requisite steps a flow ran
    pub fn format_steps(steps: &[StepTrace]) -> String {
        let mut output = String::new();
        for step in steps {
            let marker = if step.skipped {
                "-".dimmed()
            } else if step.success {
                "v".green()
            } else {
                "x".red()
            };
            output.push_str(&format!("  {} {} ({}ms)", marker, step.tool, step.duration_ms));
            if let Some(note) = &step.note {
                output.push_str(&format!(" {}", note.dimmed()));
            }
            output.push('\n');
        }
        output
    }

    /// Format a write outcome
    pub fn format_outcome(outcome: &WriteOutcome) -> String {
        let mut output = String::new();

        if !outcome.steps().is_empty() {
            output.push_str(&format!("{}\n", "Pre-requisites:".cyan().bold()));
            output.push_str(&Self::format_steps(outcome.steps()));
        }

        match outcome {
            WriteOutcome::Executed {
                tool,
                result,
                warnings,
                ..
            } => {
                output.push_str(&format!("{} {} executed\n", "v".green(), tool.bold()));
                for warning in warnings {
                    output.push_str(&format!("  {} {}\n", "warning:".yellow().bold(), warning));
                }
                output.push_str(&format!("\n{}\n", result));
            }
            WriteOutcome::Invalid(result) => {
                output.push_str(&format!(
                    "{} {}\n",
                    "Rejected:".red().bold(),
                    result.error_summary()
                ));
            }
            WriteOutcome::Blocked { reason, .. } => {
                output.push_str(&format!("{} {}\n", "Blocked:".red().bold(), reason));
            }
            WriteOutcome::AwaitingInput { prompt, .. } => {
                output.push_str(&Self::format_prompt(prompt));
            }
            WriteOutcome::Cancelled { mcq_id } => {
                output.push_str(&format!(
                    "{} write cancelled ({})\n",
                    "-".yellow(),
                    mcq_id
                ));
            }
            WriteOutcome::UnknownTool { tool } => {
                output.push_str(&format!(
                    "{} '{}' is not in the tool catalog\n",
                    "Unknown tool:".red().bold(),
                    tool
                ));
            }
        }

        output
    }

    /// Machine-readable outcome
    pub fn outcome_json(outcome: &WriteOutcome) -> Value {
        let steps = serde_json::to_value(outcome.steps()).unwrap_or(Value::Null);
        match outcome {
            WriteOutcome::Executed {
                tool,
                result,
                warnings,
                ..
            } => json!({
                "outcome": "executed",
                "tool": tool,
                "result": result,
                "warnings": warnings,
                "steps": steps,
            }),
            WriteOutcome::Invalid(result) => json!({
                "outcome": "invalid",
                "validation": result,
            }),
            WriteOutcome::Blocked { reason, .. } => json!({
                "outcome": "blocked",
                "reason": reason,
                "steps": steps,
            }),
            WriteOutcome::AwaitingInput { prompt, .. } => json!({
                "outcome": "awaiting_input",
                "prompt": prompt.to_json(),
                "steps": steps,
            }),
            WriteOutcome::Cancelled { mcq_id } => json!({
                "outcome": "cancelled",
                "mcqId": mcq_id.to_string(),
            }),
            WriteOutcome::UnknownTool { tool } => json!({
                "outcome": "unknown_tool",
                "tool": tool,
            }),
        }
    }

    pub fn format_outcome_json(outcome: &WriteOutcome) -> String {
        serde_json::to_string_pretty(&Self::outcome_json(outcome))
            .unwrap_or_else(|_| "{}".to_string())
    }

    fn tool_line(name: &str, description: &str, write: bool) -> String {
        let name = if write {
            name.yellow().bold()
        } else {
            name.normal()
        };
        if description.is_empty() {
            format!("  {}\n", name)
        } else {
            format!("  {} {}\n", name, format!("- {description}").dimmed())
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!(
            "\n{}\n{}\n{}\n",
            line.cyan(),
            format!("  {}", title).cyan().bold(),
            line.cyan()
        )
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n", format!("--- {} ---", title).blue().bold())
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use toolgate_domain::{McqId, ToolDescriptor, ToolParameter};

    fn catalog() -> ToolCatalog {
        ToolCatalog::from_descriptors(
            vec![
                ToolDescriptor::new("void_invoice", "Void an invoice")
                    .with_parameter(ToolParameter::new("InvoiceID", "string", true)),
                ToolDescriptor::new("get_invoice", "Fetch an invoice"),
            ],
            Utc::now(),
        )
    }

    #[test]
    fn test_catalog_lists_write_tools_with_required_params() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_catalog(&catalog());
        assert!(text.contains("Tools: 2 (1 write"));
        assert!(text.contains("void_invoice - Void an invoice"));
        assert!(text.contains("* InvoiceID (string)"));
        assert!(text.contains("get_invoice"));
    }

    #[test]
    fn test_catalog_json_lists_tools() {
        let value: Value =
            serde_json::from_str(&ConsoleFormatter::format_catalog_json(&catalog())).unwrap();
        assert_eq!(value["tools"].as_array().unwrap().len(), 2);
        assert!(value["fetchedAt"].is_string());
    }

    #[test]
    fn test_outcome_json_shapes() {
        let cancelled = WriteOutcome::Cancelled {
            mcq_id: McqId::new(),
        };
        assert_eq!(ConsoleFormatter::outcome_json(&cancelled)["outcome"], "cancelled");

        let blocked = WriteOutcome::Blocked {
            reason: "Invoice is already PAID".into(),
            steps: vec![StepTrace::ran("get_invoice", true, 12)],
        };
        let value = ConsoleFormatter::outcome_json(&blocked);
        assert_eq!(value["reason"], "Invoice is already PAID");
        assert_eq!(value["steps"][0]["tool"], "get_invoice");
        assert_eq!(value["steps"][0]["durationMs"], 12);
    }

    #[test]
    fn test_format_blocked_outcome() {
        colored::control::set_override(false);
        let blocked = WriteOutcome::Blocked {
            reason: "Invoice is already PAID".into(),
            steps: vec![StepTrace::skipped("list_accounts", "condition")],
        };
        let text = ConsoleFormatter::format_outcome(&blocked);
        assert!(text.contains("Blocked: Invoice is already PAID"));
        assert!(text.contains("- list_accounts (0ms) condition"));
    }
}
