//! Progress reporting for pre-requisite chain steps

use colored::Colorize;
use toolgate_application::{StepEvent, StepEventSink, StepStatus};

/// Prints one line per finished step to stderr.
///
/// `executing` events are only shown when `verbose` is set, so a normal run
/// prints a single line per step.
pub struct ConsoleStepReporter {
    verbose: bool,
}

impl ConsoleStepReporter {
    pub fn new() -> Self {
        Self { verbose: false }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Render an event, or `None` when it is not shown.
    pub fn render(&self, event: &StepEvent) -> Option<String> {
        let marker = match event.status {
            StepStatus::Executing if !self.verbose => return None,
            StepStatus::Executing => "..".cyan(),
            StepStatus::Passed => "v".green(),
            StepStatus::Blocked => "x".red(),
            StepStatus::NeedsInput => "?".magenta(),
            StepStatus::Failed => "!".red(),
        };

        let mut line = format!("  {} {}", marker, event.tool);
        if let Some(ms) = event.duration_ms {
            line.push_str(&format!(" ({ms}ms)"));
        }
        if let Some(skipped) = event
            .data
            .as_ref()
            .and_then(|d| d.get("skipped"))
            .and_then(|s| s.as_str())
        {
            line.push_str(&format!(" {}", format!("skipped: {skipped}").dimmed()));
        } else if !matches!(event.status, StepStatus::Passed | StepStatus::Executing) {
            line.push_str(&format!(" {}", event.status.as_str().dimmed()));
        }
        Some(line)
    }
}

impl Default for ConsoleStepReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StepEventSink for ConsoleStepReporter {
    fn emit(&self, event: StepEvent) {
        if let Some(line) = self.render(&event) {
            eprintln!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_executing_hidden_unless_verbose() {
        let event = StepEvent::new("get_invoice", StepStatus::Executing);
        assert!(ConsoleStepReporter::new().render(&event).is_none());
        assert!(
            ConsoleStepReporter::new()
                .with_verbose(true)
                .render(&event)
                .is_some()
        );
    }

    #[test]
    fn test_render_finished_steps() {
        colored::control::set_override(false);
        let reporter = ConsoleStepReporter::new();

        let passed = StepEvent::new("get_invoice", StepStatus::Passed).with_duration(40);
        assert_eq!(reporter.render(&passed).unwrap(), "  v get_invoice (40ms)");

        let blocked = StepEvent::new("get_invoice", StepStatus::Blocked).with_duration(7);
        assert_eq!(
            reporter.render(&blocked).unwrap(),
            "  x get_invoice (7ms) blocked"
        );

        let skipped = StepEvent::new("list_accounts", StepStatus::Passed)
            .with_data(json!({"skipped": "condition"}));
        assert_eq!(
            reporter.render(&skipped).unwrap(),
            "  v list_accounts skipped: condition"
        );
    }
}
