// ditteau/src/commands/evaluate.rs
//
// USE CASE: Decide visibility and masking of rows for one role.

use anyhow::Context;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::debug;

use ditteau_core::application::{evaluate_batch, resolve_as_of};
use ditteau_core::domain::governance::EvaluationContext;
use ditteau_core::infrastructure::config::load_snapshot;
use ditteau_core::infrastructure::fs::atomic_write_json;
use ditteau_core::infrastructure::rows::read_rows;
use ditteau_core::ports::SystemClock;

pub struct EvaluateArgs {
    pub project_dir: PathBuf,
    pub dataset: String,
    pub role: String,
    pub input: PathBuf,
    pub as_of: Option<NaiveDate>,
    pub output: Option<PathBuf>,
    pub trace: bool,
}

pub fn execute(args: EvaluateArgs) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&args.project_dir)?;
    let rows = read_rows(&args.input)
        .with_context(|| format!("Failed to read rows from {}", args.input.display()))?;

    let as_of = resolve_as_of(&snapshot, &SystemClock, args.as_of);
    debug!(%as_of, rows = rows.len(), "Evaluating");
    let ctx = EvaluationContext::new(&args.role, as_of);
    let report = evaluate_batch(&snapshot, &ctx, &args.dataset, &rows);

    for w in &report.warnings {
        eprintln!("⚠️  {}", w);
    }
    if args.trace {
        for (i, d) in report.decisions.iter().enumerate() {
            eprintln!("   #{} {}", i, d.trace_summary());
        }
    }

    match &args.output {
        Some(path) => {
            atomic_write_json(path, &report)?;
            println!(
                "🔐 {} rows evaluated for {} as of {}: {} visible, {} hidden, {} errors",
                report.summary.total,
                report.role,
                report.as_of,
                report.summary.visible,
                report.summary.hidden,
                report.summary.errors
            );
            println!("📄 Decisions saved to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}
