//! Materialize command - build the dump tree for every configured server.

use std::fs;

use dbfs::app::{BootstrapSummary, DbfsApp};
use dbfs::catalog::SqlcmdClient;
use dbfs::fatal::Supervisor;
use dbfs::materializer::CatalogStatus;
use tracing::warn;

use crate::error::CliError;
use crate::runner::CliRunner;
use crate::GlobalArgs;

/// Run the materialize command.
pub fn run(args: &GlobalArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args)?;
    runner.log_startup("materialize");
    let registry = runner.load_registry()?;
    let settings = runner.settings().clone();

    println!("DBFS v{}", dbfs::VERSION);
    println!("=========");
    println!();
    println!("Dump dir:  {}", settings.dump_dir.display());
    if let Some(mount_dir) = &settings.mount_dir {
        println!("Mount dir: {}", mount_dir.display());
    }
    println!("Servers:   {}", registry.len());
    println!();

    let mut supervisor = Supervisor::new();

    // Only a dump directory created by this run is ours to remove.
    if !settings.dump_dir.exists() {
        let dump_dir = settings.dump_dir.clone();
        supervisor.on_teardown("remove dump directory", move || {
            if let Err(e) = fs::remove_dir_all(&dump_dir) {
                warn!(path = %dump_dir.display(), error = %e, "Failed to remove dump directory");
            }
        });
    }

    let summary = supervisor.run(|| {
        let app = DbfsApp::new(settings, registry)?;
        app.bootstrap(&SqlcmdClient::new())
    })?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &BootstrapSummary) {
    for report in &summary.reports {
        let catalog = match &report.catalog {
            CatalogStatus::Listed { items } => format!("{} DMVs", items),
            CatalogStatus::Degenerate => "no DMVs returned".to_string(),
            CatalogStatus::Failed(reason) => format!("catalog query failed: {}", reason),
        };
        println!(
            "  {:<20} {} files, {} custom queries ({})",
            report.server,
            report.dmv_files.len(),
            report.custom_query_files.len(),
            catalog
        );
        for skipped in &report.skipped {
            println!("    skipped {}: {}", skipped.path.display(), skipped.reason);
        }
    }

    println!();
    println!(
        "Created {} placeholder files for {} servers",
        summary.total_files(),
        summary.servers()
    );
    let warnings = summary.warning_count();
    if warnings > 0 {
        println!("{} warning(s); run with -v for details", warnings);
    }
}
