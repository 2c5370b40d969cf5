//! Command-line surface for `reporter-cli`.

#![deny(clippy::all, clippy::pedantic)]

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "reporter-cli",
    version,
    about = "Beyonder reporter read and admin client",
    long_about = None
)]
pub struct Cli {
    /// Public listener base URL, e.g. <http://127.0.0.1:8080>
    #[arg(long = "public-url", env = "REPORTER_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Admin listener base URL, e.g. <http://127.0.0.1:8081>
    #[arg(long = "admin-url", env = "REPORTER_ADMIN_URL")]
    pub admin_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pathway report for one player
    Pathway { player: String },
    /// Cached snapshot of every known beyonder
    Everyone,
    /// Raw beyonder data file
    Beyonder { player: String },
    /// Tail of a beyonder's activity log
    Logs {
        player: String,
        /// Number of lines; clamped server-side to 1..=10000
        #[arg(default_value = "10")]
        amount: String,
    },
    /// Raw artifact data file
    Artifact { id: String },
    /// Cache administration
    Cache(CacheArgs),
    /// Send a free-form admin command, e.g. `command clear Klein`
    Command {
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
    /// Probe the admin listener
    Health,
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheCmd,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheCmd {
    /// Dispatch a background snapshot rebuild
    Refresh,
    /// Drop one player's entry, or both tiers when no player is given
    Clear { player: Option<String> },
    /// Show occupancy of both tiers
    Stats,
    /// Re-read configuration and refresh
    Reload,
}
