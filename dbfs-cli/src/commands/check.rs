//! Check command - report whether a path is a synthesized placeholder.

use dbfs::config::ProvenanceBackend;
use dbfs::paths::DumpRoot;
use dbfs::provenance::{ManifestTagger, ProvenanceTagger, XattrTagger};

use crate::error::CliError;
use crate::runner::CliRunner;
use crate::GlobalArgs;

/// Run the check command.
pub fn run(args: &GlobalArgs, virtual_path: &str) -> Result<(), CliError> {
    let runner = CliRunner::new(args)?;
    let settings = runner.settings();
    let dump_path = DumpRoot::new(&settings.dump_dir).to_dump_path(virtual_path);

    let tagged = match settings.provenance {
        ProvenanceBackend::Xattr => XattrTagger::new().is_tagged(&dump_path),
        // An unreadable manifest answers "not synthesized".
        ProvenanceBackend::Manifest => ManifestTagger::in_dir(&settings.dump_dir)
            .map(|tagger| tagger.is_tagged(&dump_path))
            .unwrap_or(false),
    };

    println!("{}", dump_path.display());
    if tagged {
        println!("  placeholder (synthesized by dbfs)");
    } else {
        println!("  not a placeholder");
    }
    Ok(())
}
