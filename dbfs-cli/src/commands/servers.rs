//! Servers command - list configured servers.

use crate::error::CliError;
use crate::runner::CliRunner;
use crate::GlobalArgs;

/// Run the servers command.
pub fn run(args: &GlobalArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args)?;
    let registry = runner.load_registry()?;

    println!("Configured Servers");
    println!("==================");
    println!();

    for record in registry.iter() {
        let custom = if record.custom_queries_path.as_os_str().is_empty() {
            "(none)".to_string()
        } else {
            record.custom_queries_path.display().to_string()
        };
        println!("[{}]", record.name);
        println!("  hostname          = {}", record.hostname);
        println!("  username          = {}", record.username);
        println!("  version           = {}", record.version);
        println!("  customQueriesPath = {}", custom);
    }

    Ok(())
}
