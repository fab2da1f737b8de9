// ditteau/src/commands/check.rs
//
// USE CASE: Validate the policy configuration before it is deployed.

use std::path::PathBuf;

use ditteau_core::infrastructure::config::load_snapshot;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    println!("⚙️  Loading policy configuration...");

    let snapshot = match load_snapshot(&project_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            eprintln!("\n❌ Configuration is invalid.");
            std::process::exit(1);
        }
    };

    println!("   Project: {}", snapshot.name());
    println!("   Roles: {}", snapshot.roles().len());
    println!(
        "   Policies: {} masking, {} row access",
        snapshot.masking_policies().count(),
        snapshot.row_access_policies().count()
    );
    println!("   Datasets: {}", snapshot.bindings().count());
    if let Some(date) = snapshot.reference_date() {
        println!("   Reference date: {}", date);
    }
    println!("\n✨ Configuration is valid.");

    Ok(())
}
