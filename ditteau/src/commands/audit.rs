// ditteau/src/commands/audit.rs
//
// USE CASE: Pre-flight compliance check of masking coverage.

use std::path::PathBuf;

use ditteau_core::application::{PiiScanner, audit_coverage};
use ditteau_core::infrastructure::config::load_snapshot;
use ditteau_core::infrastructure::rows::read_rows;

pub fn execute(
    project_dir: PathBuf,
    check: bool,
    format: String,
    sample: Option<PathBuf>,
    dataset: Option<String>,
) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&project_dir)?;
    let mut report = audit_coverage(&snapshot);

    if let (Some(path), Some(dataset)) = (&sample, &dataset) {
        let rows: Vec<_> = read_rows(path)?.into_iter().filter_map(Result::ok).collect();
        report
            .findings
            .extend(PiiScanner::new()?.scan(&snapshot, dataset, &rows));
    }

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            println!("🛡️  Auditing {}...", snapshot.name());
            for finding in &report.findings {
                println!("   {}", finding);
            }
            if report.findings.is_empty() {
                println!("   ✅ Every sensitive column is masked.");
            }
        }
    }

    if report.has_violations() {
        eprintln!(
            "\n⚠️  {} violation(s) detected.",
            report.violations().count()
        );
        if check {
            eprintln!("💥 --check mode: Failing due to compliance violations.");
            std::process::exit(1);
        }
    }

    Ok(())
}
