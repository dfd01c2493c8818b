//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pipdeck - A terminal front-end for pip
#[derive(Parser, Debug)]
#[command(name = "pipdeck")]
#[command(about = "Search, install, update and remove Python packages with pip", long_about = None)]
pub struct Args {
    /// Project directory holding `.pipdeck/config.toml`
    #[arg(long, value_name = "DIR", global = true)]
    pub project: Option<PathBuf>,

    /// Emit streamed output as NDJSON events
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search PyPI
    Search { query: String },

    /// Install packages
    Install {
        /// Package specifiers
        packages: Vec<String>,

        /// Install from a requirements file
        #[arg(long, short = 'r', value_name = "FILE", conflicts_with_all = ["archive", "index_url"])]
        requirements: Option<PathBuf>,

        /// Install a local sdist or wheel
        #[arg(long, value_name = "PATH", conflicts_with = "index_url")]
        archive: Option<PathBuf>,

        /// Resolve packages against another index
        #[arg(long, value_name = "URL")]
        index_url: Option<String>,

        /// Do not pass `-U`
        #[arg(long)]
        no_upgrade: bool,
    },

    /// Uninstall packages
    Uninstall {
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// Upgrade packages, or every outdated package when none are given
    Update { packages: Vec<String> },

    /// List installed packages
    List {
        /// Only packages with a newer release
        #[arg(long)]
        outdated: bool,
    },

    /// Show package metadata
    Show { package: String },

    /// Browse the third-party wheel index
    Wheels {
        #[command(subcommand)]
        command: WheelsCommand,
    },

    /// Run any command and stream its output
    Run {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Write a default `.pipdeck/config.toml`
    Init,
}

#[derive(Subcommand, Debug)]
pub enum WheelsCommand {
    /// Search modules by name
    Search { term: String },

    /// Install the newest compatible wheel of a module
    Install {
        module: String,

        /// Pick this version instead of the newest
        #[arg(long)]
        version: Option<String>,
    },
}
