use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the reporter binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "beyonder-reporter",
    version,
    about = "Caching HTTP reporter for beyonder pathways"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "REPORTER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and admin HTTP listeners.
    Serve(Box<ServeArgs>),
    /// Build the whole-population snapshot once and print it as JSON.
    Snapshot(SourceArgs),
    /// Derive one player's pathway report and print it as JSON.
    Pathway(PathwayArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SourceOverride {
    /// Override the directory holding one `<player>.yml` per beyonder.
    #[arg(long = "beyonders-dir", value_name = "PATH")]
    pub beyonders_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SourceArgs {
    #[command(flatten)]
    pub source: SourceOverride,
}

#[derive(Debug, Args, Clone)]
pub struct PathwayArgs {
    #[command(flatten)]
    pub source: SourceOverride,

    /// Player name to report on.
    #[arg(value_name = "PLAYER")]
    pub player: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub source: SourceOverride,

    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Log entity cache hits, misses and invalidations at info level.
    #[arg(
        long = "debug-cache",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub debug_cache: Option<bool>,

    /// Log snapshot refresh start and completion at info level.
    #[arg(
        long = "debug-refresh",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub debug_refresh: Option<bool>,

    /// Override the entity cache TTL in minutes.
    #[arg(long = "cache-player-ttl", value_name = "MINUTES")]
    pub player_ttl: Option<u64>,

    /// Override the entity cache capacity.
    #[arg(long = "cache-max-player-entries", value_name = "COUNT")]
    pub max_player_entries: Option<usize>,

    /// Override the snapshot refresh interval in minutes; zero disables it.
    #[arg(
        long = "cache-refresh-interval",
        value_name = "MINUTES",
        allow_negative_numbers = true
    )]
    pub refresh_interval: Option<i64>,

    /// Override how many players one rebuild derives in parallel.
    #[arg(long = "cache-rebuild-concurrency", value_name = "COUNT")]
    pub rebuild_concurrency: Option<usize>,
}
