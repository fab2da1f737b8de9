// ditteau/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug ditteau evaluate ... to see decision traces
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { project_dir } => commands::check::execute(project_dir),
        Commands::Evaluate {
            project_dir,
            dataset,
            role,
            input,
            as_of,
            output,
            trace,
        } => commands::evaluate::execute(commands::evaluate::EvaluateArgs {
            project_dir,
            dataset,
            role,
            input,
            as_of,
            output,
            trace,
        }),
        Commands::Inspect {
            project_dir,
            dataset,
            format,
        } => commands::inspect::execute(project_dir, dataset, format),
        Commands::Audit {
            project_dir,
            check,
            format,
            sample,
            dataset,
        } => commands::audit::execute(project_dir, check, format, sample, dataset),
    }
}
