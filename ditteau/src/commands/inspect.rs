// ditteau/src/commands/inspect.rs
//
// USE CASE: Show which policies are attached where.

use chrono::Utc;
use std::path::PathBuf;

use ditteau_core::application::PolicyCatalog;
use ditteau_core::infrastructure::config::load_snapshot;

pub fn execute(project_dir: PathBuf, dataset: Option<String>, format: String) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&project_dir)?;

    let mut catalog = PolicyCatalog::build(&snapshot, Utc::now());
    if let Some(name) = &dataset {
        if snapshot.binding(name).is_none() {
            anyhow::bail!("Dataset '{}' has no policy binding", name);
        }
        catalog = catalog.for_dataset(name);
    }

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&catalog)?),
        _ => {
            println!("📚 {} ({} datasets)\n", catalog.project_name, catalog.stats.datasets);
            println!("{}", catalog.roles_table());
            if !catalog.tags.is_empty() {
                println!("\n🏷️  Tags\n{}", catalog.tags_table());
            }
            println!("\n{}", catalog.references_table());
            println!(
                "\n📊 {} masked columns, {} row filters",
                catalog.stats.masked_columns, catalog.stats.row_filters
            );
        }
    }

    Ok(())
}
