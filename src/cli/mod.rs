// src/cli/mod.rs
//! CLI definitions for nupack
//!
//! The command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nupack")]
#[command(version)]
#[command(about = "Restore and install packages for a solution", long_about = None)]
pub struct Cli {
    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that talks to feeds
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Package source (URL or directory); may be repeated. Given sources are
    /// consulted before the configured ones
    #[arg(short, long = "source")]
    pub sources: Vec<String>,

    /// Settings file to use instead of the nupack.toml lookup
    #[arg(long)]
    pub config_file: Option<String>,

    /// Maximum number of packages acquired at once
    #[arg(long)]
    pub max_concurrent: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Restore the packages declared by a solution or a packages.config file
    Restore {
        /// Solution file, directory holding one solution, or packages.config
        path: Option<String>,

        /// Folder packages are installed into
        #[arg(long)]
        packages_directory: Option<String>,

        /// Solution directory (required with a packages.config unless
        /// --packages-directory is given)
        #[arg(long)]
        solution_directory: Option<String>,

        /// Artifacts kept per package: any of nuspec;nupkg;files
        #[arg(long)]
        save_mode: Option<String>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Install a package and its dependencies
    Install {
        /// Package id
        id: String,

        /// Exact version to install (default: latest)
        #[arg(long)]
        version: Option<String>,

        /// Allow prerelease versions
        #[arg(long)]
        prerelease: bool,

        /// Allow versions hidden from the feed listing
        #[arg(long)]
        include_unlisted: bool,

        /// Dependency version choice: lowest, highest, highestminor,
        /// highestpatch or ignore
        #[arg(long)]
        dependency_version: Option<String>,

        /// Folder packages are installed into
        #[arg(short, long)]
        output_directory: Option<String>,

        /// Solution directory whose settings choose the packages folder
        #[arg(long)]
        solution_directory: Option<String>,

        /// Artifacts kept per package: any of nuspec;nupkg;files
        #[arg(long)]
        save_mode: Option<String>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Update nupack itself
    Update {
        /// Replace the running nupack executable with the latest release
        #[arg(long = "self", required = true)]
        self_update: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
}
