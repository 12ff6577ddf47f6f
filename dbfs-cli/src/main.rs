//! DBFS CLI - Command-line interface
//!
//! Builds the dump tree for every configured SQL Server.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use dbfs::config::ProvenanceBackend;

/// Expose SQL Server DMVs as a file tree.
#[derive(Debug, Parser)]
#[command(name = "dbfs", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Options shared by every command.
#[derive(Debug, clap::Args)]
pub struct GlobalArgs {
    /// Server configuration file (defaults to ~/.dbfs/config.ini)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Dump directory holding the materialized tree
    #[arg(short = 'd', long, global = true)]
    pub dump_dir: Option<PathBuf>,

    /// Mount point served by the filesystem layer
    #[arg(short = 'm', long, global = true)]
    pub mount_dir: Option<PathBuf>,

    /// Write diagnostics to this file instead of stderr
    #[arg(short = 'l', long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Verbose diagnostics
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Where provenance marks are stored
    #[arg(long, value_enum, default_value_t = ProvenanceArg::Xattr, global = true)]
    pub provenance: ProvenanceArg,
}

/// Provenance backend selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProvenanceArg {
    /// Extended attribute on each placeholder
    Xattr,
    /// Sidecar manifest in the dump directory
    Manifest,
}

impl From<ProvenanceArg> for ProvenanceBackend {
    fn from(arg: ProvenanceArg) -> Self {
        match arg {
            ProvenanceArg::Xattr => ProvenanceBackend::Xattr,
            ProvenanceArg::Manifest => ProvenanceBackend::Manifest,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the dump tree for every configured server (default)
    Materialize,

    /// List configured servers
    Servers,

    /// Report whether a mount-relative path is a synthesized placeholder
    Check {
        /// Path relative to the mount point, e.g. /prod/dm_exec_requests
        path: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Materialize) {
        Command::Materialize => commands::materialize::run(&cli.global),
        Command::Servers => commands::servers::run(&cli.global),
        Command::Check { path } => commands::check::run(&cli.global, &path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["dbfs", "-c", "/etc/dbfs.ini"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.global.config, Some(PathBuf::from("/etc/dbfs.ini")));
        assert_eq!(cli.global.provenance, ProvenanceArg::Xattr);
    }

    #[test]
    fn test_parse_check_with_global_flags() {
        let cli = Cli::try_parse_from([
            "dbfs",
            "check",
            "/prod/dm_exec_requests",
            "-d",
            "/tmp/dump",
            "--provenance",
            "manifest",
            "-v",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Command::Check { ref path }) if path == "/prod/dm_exec_requests"));
        assert_eq!(cli.global.dump_dir, Some(PathBuf::from("/tmp/dump")));
        assert!(cli.global.verbose);
        assert_eq!(
            ProvenanceBackend::from(cli.global.provenance),
            ProvenanceBackend::Manifest
        );
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
