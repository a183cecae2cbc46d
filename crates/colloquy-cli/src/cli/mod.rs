//! CLI command definitions for the `colloquy` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod config;
pub mod render;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use colloquy_types::config::TransportKind;
use colloquy_types::message::ControlToken;

/// Stream a debate or chat session from one or two backends.
#[derive(Parser)]
#[command(name = "colloquy", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export trace spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect, send one prompt or control token, and stream the turns.
    Run(RunArgs),

    /// Print the resolved session configuration.
    #[command(name = "check-config")]
    CheckConfig {
        /// Config file (defaults to the platform config directory).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Backend URL; repeat once for a two-agent debate.
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoints: Vec<String>,

    /// Transport for every endpoint given on the command line. Inferred
    /// from the URL scheme when omitted.
    #[arg(long)]
    pub transport: Option<TransportKind>,

    /// Config file (defaults to the platform config directory).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Prompt text to submit.
    #[arg(long, short)]
    pub prompt: Option<String>,

    /// Extra prompt field, e.g. `--field topic=AI --field answer_length=3`.
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Send a control token instead of a prompt (e.g. `next`).
    #[arg(long, conflicts_with = "prompt")]
    pub control: Option<ControlToken>,

    /// Send `start` after every successful connect.
    #[arg(long)]
    pub auto_start: bool,

    /// Send `continue` after every completed message.
    #[arg(long)]
    pub auto_continue: bool,

    /// Handshake timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Consecutive connection failures before giving up.
    #[arg(long)]
    pub max_retries: Option<u32>,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_two_endpoints() {
        let cli = Cli::try_parse_from([
            "colloquy",
            "run",
            "--endpoint",
            "ws://localhost:8000/ws",
            "--endpoint",
            "ws://localhost:8001/ws",
            "--prompt",
            "Is AI conscious?",
            "--field",
            "topic=AI",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.endpoints.len(), 2);
        assert_eq!(args.prompt.as_deref(), Some("Is AI conscious?"));
        assert_eq!(args.fields, vec![("topic".to_string(), "AI".to_string())]);
    }

    #[test]
    fn parses_transport_and_control() {
        let cli = Cli::try_parse_from([
            "colloquy",
            "-v",
            "run",
            "--endpoint",
            "http://localhost:8000/chat",
            "--transport",
            "http-stream",
            "--control",
            "next",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.transport, Some(TransportKind::HttpStream));
        assert_eq!(args.control, Some(ControlToken::Next));
    }

    #[test]
    fn prompt_and_control_conflict() {
        assert!(
            Cli::try_parse_from(["colloquy", "run", "--prompt", "x", "--control", "next"]).is_err()
        );
    }

    #[test]
    fn field_requires_key_value() {
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
        assert_eq!(
            parse_field("answer_length=3").unwrap(),
            ("answer_length".to_string(), "3".to_string())
        );
    }
}
