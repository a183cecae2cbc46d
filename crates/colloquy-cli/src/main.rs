//! Colloquy CLI entry point.
//!
//! Binary name: `colloquy`
//!
//! Parses CLI arguments, sets up tracing, then dispatches to the command
//! handler.

mod cli;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,colloquy=debug",
        _ => "trace",
    };
    colloquy_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = match cli.command {
        Commands::Run(args) => cli::run::run(args, cli.json, cli.quiet).await,
        Commands::CheckConfig { config } => cli::config::check_config(config, cli.json).await,
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(shell, &mut cmd, "colloquy", &mut std::io::stdout());
            Ok(())
        }
    };

    colloquy_observe::tracing_setup::shutdown_tracing();
    result
}
