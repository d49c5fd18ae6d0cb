//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored human-readable output
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for toolgate
#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(author, version, about = "Tool discovery and write-safety gate for financial agents")]
#[command(long_about = r#"
toolgate discovers the tools a remote MCP server exposes and guards every
state-changing call behind two layers of checks:

1. Field validation: required arguments and generic invariants
2. Pre-requisite chains: read-only lookups that block, enrich or pause a write

When a write needs a human decision it pauses on a multiple-choice question,
answered interactively on stdin.

Configuration files are loaded from (in priority order):
1. --config <path>       Explicit config file
2. ./toolgate.toml       Project-level config
3. ~/.config/toolgate/config.toml   Global config

Example:
  toolgate discover --token $TOKEN --entity-id ent-1 --org-id org-1
  toolgate validate create_payment --args '{"Amount": 100}'
  toolgate write void_invoice --args '{"InvoiceID": "inv-9"}' --conversation c-1
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress per-step progress lines
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Write diagnostic logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the tool server and list its tools
    Discover {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Run Layer 1 field validation only (no network)
    Validate {
        /// Tool name, e.g. create_payment
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, value_name = "JSON", default_value = "{}")]
        args: String,
    },

    /// Run a tool call through the full write-safety pipeline
    Write {
        /// Tool name, e.g. void_invoice
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, value_name = "JSON", default_value = "{}")]
        args: String,

        /// Conversation the write belongs to
        #[arg(long, value_name = "ID", default_value = "cli")]
        conversation: String,

        #[command(flatten)]
        server: ServerArgs,
    },
}

/// Tool server connection arguments
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Tool server URL (overrides discovery.server_url)
    #[arg(long, value_name = "URL")]
    pub server_url: Option<String>,

    /// Bearer token (a leading "Bearer " is stripped)
    #[arg(long, env = "TOOLGATE_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Entity the agent acts for
    #[arg(long, env = "TOOLGATE_ENTITY_ID", default_value = "")]
    pub entity_id: String,

    /// Organization the entity belongs to
    #[arg(long, env = "TOOLGATE_ORG_ID", default_value = "")]
    pub org_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_command() {
        let cli = Cli::try_parse_from([
            "toolgate",
            "write",
            "void_invoice",
            "--args",
            r#"{"InvoiceID":"inv-9"}"#,
            "--conversation",
            "c-1",
            "--token",
            "Bearer abc",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::Write {
                tool,
                conversation,
                server,
                ..
            }) => {
                assert_eq!(tool, "void_invoice");
                assert_eq!(conversation, "c-1");
                assert_eq!(server.token, "Bearer abc");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_validate_needs_no_token() {
        let cli = Cli::try_parse_from(["toolgate", "validate", "create_payment"]).unwrap();
        match cli.command {
            Some(Command::Validate { tool, args }) => {
                assert_eq!(tool, "create_payment");
                assert_eq!(args, "{}");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.output, OutputFormat::Text);
    }
}
