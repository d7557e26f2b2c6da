//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Harvest contributor data from a code-forge API and resolve profile
/// locations to countries.
///
/// Forge tokens come from repeated `--token` flags, the `FORGE_TOKENS`
/// environment variable (comma-separated) or the config file, in that order.
#[derive(Parser, Debug)]
#[command(name = "forge-harvest")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/forge-harvest/config.toml)
    #[arg(long, value_name = "PATH", env = "FORGE_HARVEST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Forge API token (repeat for a rotation pool)
    #[arg(long = "token", value_name = "TOKEN", global = true)]
    pub tokens: Vec<String>,

    /// Maximum concurrent workers (1-100; defaults to 8 per token)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100), global = true)]
    pub concurrency: Option<u8>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify free-text locations (arguments, or one per stdin line)
    Locate(LocateArgs),
    /// Resolve the country of every contributor of a repository
    Contributors(ContributorsArgs),
    /// Summarize a repository
    Repo(RepoArgs),
}

/// Arguments of `locate`.
#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Locations to classify
    #[arg(value_name = "LOCATION")]
    pub locations: Vec<String>,

    /// Never query the geocoding service
    #[arg(long)]
    pub offline: bool,
}

/// Arguments of `contributors`.
#[derive(Args, Debug)]
pub struct ContributorsArgs {
    /// Repository as OWNER/NAME or URL
    #[arg(value_name = "OWNER/REPO")]
    pub repo: String,

    /// Never query the geocoding service
    #[arg(long)]
    pub offline: bool,

    /// Only print contributors whose country was resolved
    #[arg(long)]
    pub resolved_only: bool,
}

/// Arguments of `repo`.
#[derive(Args, Debug)]
pub struct RepoArgs {
    /// Repository as OWNER/NAME or URL
    #[arg(value_name = "OWNER/REPO|URL")]
    pub repo: String,
}

impl Cli {
    /// Whether the chosen command asked for offline resolution.
    #[must_use]
    pub fn offline(&self) -> bool {
        match &self.command {
            Command::Locate(args) => args.offline,
            Command::Contributors(args) => args.offline,
            Command::Repo(_) => true,
        }
    }
}
