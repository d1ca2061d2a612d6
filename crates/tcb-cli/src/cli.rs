//! Command-line definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tenant configuration editor
#[derive(Debug, Parser)]
#[command(name = "tcb")]
#[command(about = "Validate, merge, diff and deploy tenant configurations")]
#[command(version)]
pub struct Cli {
    /// Editor settings file (TOML)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that an edit payload only touches editable fields
    Validate {
        /// Edit payload (JSON or YAML)
        payload: PathBuf,
    },
    /// Print the editable part of a full configuration
    Extract {
        /// Full configuration (JSON or YAML)
        config: PathBuf,
        /// Write here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Merge an edit payload onto a base configuration
    Merge {
        /// Base configuration
        base: PathBuf,
        /// Edit payload
        edits: PathBuf,
        /// Write here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show what changed between two configurations
    Diff {
        /// Old configuration
        old: PathBuf,
        /// New configuration
        new: PathBuf,
        /// Print the diff as JSON
        #[arg(long)]
        json: bool,
    },
    /// List entities referencing one entity
    Deps {
        /// Configuration to inspect
        config: PathBuf,
        /// Section of the entity, e.g. `cta_definitions`
        section: String,
        /// Entity id
        id: String,
    },
    /// Merge an edit payload into a tenant's stored configuration
    Deploy {
        /// Store root directory
        #[arg(long)]
        store: PathBuf,
        /// Tenant id
        #[arg(long)]
        tenant: String,
        /// Edit payload
        edits: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_deploy_with_global_flags() {
        let cli = Cli::try_parse_from([
            "tcb",
            "deploy",
            "--store",
            "/srv/configs",
            "--tenant",
            "acme",
            "edits.json",
            "--log-json",
        ])
        .unwrap();
        assert!(cli.log_json);
        assert!(matches!(
            cli.command,
            Commands::Deploy { ref tenant, .. } if tenant == "acme"
        ));
    }
}
