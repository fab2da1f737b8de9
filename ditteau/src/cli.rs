// ditteau/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ditteau")]
#[command(about = "Role-based masking and row access policies for institutional data", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ✅ Loads and validates the policy configuration
    Check {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🔐 Evaluates rows of a dataset for a role (JSON in, decisions out)
    Evaluate {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Dataset the rows belong to (ex: "student_enrollment")
        #[arg(long, short)]
        dataset: String,

        /// Acting role
        #[arg(long, short)]
        role: String,

        /// Rows file: JSON array, single object, or .jsonl
        #[arg(long, short)]
        input: PathBuf,

        /// Reference date (YYYY-MM-DD). Defaults to `reference-date`, then today
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Write the decisions to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print the decision trace of every row to stderr
        #[arg(long, default_value = "false")]
        trace: bool,
    },

    /// 📚 Lists roles and policy references
    Inspect {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Only show references of this dataset
        #[arg(long, short)]
        dataset: Option<String>,

        /// Output format: table | json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// 🛡️ Audits masking coverage of sensitive columns
    Audit {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Exit with error if violations are detected
        #[arg(long)]
        check: bool,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,

        /// Sample rows to scan for PII in unmasked columns (requires --dataset)
        #[arg(long, requires = "dataset")]
        sample: Option<PathBuf>,

        /// Dataset of the sample rows
        #[arg(long)]
        dataset: Option<String>,
    },
}
