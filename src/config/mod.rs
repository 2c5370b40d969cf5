//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::commands::ReloadSource;
use crate::cache::CacheConfig;
use crate::infra::error::InfraError;

mod cli;

pub use cli::{
    CliArgs, Command, PathwayArgs, ServeArgs, ServeOverrides, SourceArgs, SourceOverride,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "reporter";
const ENV_PREFIX: &str = "REPORTER";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 8080;
const DEFAULT_ADMIN_PORT: u16 = 8081;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_PLAYER_TTL_MINUTES: u64 = 5;
const DEFAULT_MAX_PLAYER_ENTRIES: usize = 1000;
const DEFAULT_REFRESH_INTERVAL_MINUTES: i64 = 15;
const DEFAULT_REBUILD_CONCURRENCY: usize = 4;
const DEFAULT_BEYONDERS_DIR: &str = "plugins/CircleOfImagination/data/beyonders";
const DEFAULT_LOGS_DIR: &str = "plugins/CircleOfImagination/logs";
const DEFAULT_ARTIFACTS_DIR: &str = "plugins/CircleOfImagination/artifacts";

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub endpoints: EndpointSettings,
    pub source: SourceSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
    pub debug_cache: bool,
    pub debug_refresh: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub player_ttl_minutes: NonZeroU64,
    pub max_player_entries: NonZeroUsize,
    /// Zero or negative disables the periodic refresh.
    pub refresh_interval_minutes: i64,
    pub rebuild_concurrency: NonZeroUsize,
}

/// Which public routes get registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSettings {
    pub player_pathway: bool,
    pub everyone_pathway: bool,
    pub beyonder_data: bool,
    pub beyonder_logs: bool,
    pub artifact: bool,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            player_pathway: true,
            everyone_pathway: true,
            beyonder_data: true,
            beyonder_logs: true,
            artifact: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub beyonders_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub artifacts_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Snapshot(args)) => raw.apply_source_override(&args.source),
        Some(Command::Pathway(args)) => raw.apply_source_override(&args.source),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

/// Re-runs [`load`] with the arguments the process started with.
#[derive(Debug, Clone)]
pub struct ConfigReloader {
    args: CliArgs,
}

impl ConfigReloader {
    pub fn new(args: CliArgs) -> Self {
        Self { args }
    }

    pub fn reload(&self) -> Result<Settings, LoadError> {
        load(&self.args)
    }
}

impl ReloadSource for ConfigReloader {
    fn cache_config(&self) -> Result<CacheConfig, InfraError> {
        let settings = self
            .reload()
            .map_err(|err| InfraError::configuration(err.to_string()))?;
        Ok(CacheConfig::from(&settings))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    endpoints: RawEndpointSettings,
    source: RawSourceSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(flag) = overrides.debug_cache {
            self.logging.debug_cache = Some(flag);
        }
        if let Some(flag) = overrides.debug_refresh {
            self.logging.debug_refresh = Some(flag);
        }
        if let Some(ttl) = overrides.player_ttl {
            self.cache.player_ttl = Some(ttl);
        }
        if let Some(max) = overrides.max_player_entries {
            self.cache.max_player_entries = Some(max);
        }
        if let Some(interval) = overrides.refresh_interval {
            self.cache.refresh_interval = Some(interval);
        }
        if let Some(concurrency) = overrides.rebuild_concurrency {
            self.cache.rebuild_concurrency = Some(concurrency);
        }

        self.apply_source_override(&overrides.source);
    }

    fn apply_source_override(&mut self, overrides: &SourceOverride) {
        if let Some(dir) = overrides.beyonders_dir.as_ref() {
            self.source.beyonders_dir = Some(dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            endpoints,
            source,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            endpoints: build_endpoint_settings(endpoints),
            source: build_source_settings(source)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;
    if public_addr == admin_addr {
        return Err(LoadError::invalid(
            "server.admin_port",
            "admin listener must not share the public address",
        ));
    }

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings {
        level,
        format,
        debug_cache: logging.debug_cache.unwrap_or(false),
        debug_refresh: logging.debug_refresh.unwrap_or(false),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl = cache.player_ttl.unwrap_or(DEFAULT_PLAYER_TTL_MINUTES);
    let player_ttl_minutes = NonZeroU64::new(ttl)
        .ok_or_else(|| LoadError::invalid("cache.player_ttl", "must be greater than zero"))?;

    let max_player_entries = non_zero_usize(
        cache
            .max_player_entries
            .unwrap_or(DEFAULT_MAX_PLAYER_ENTRIES),
        "cache.max_player_entries",
    )?;
    let rebuild_concurrency = non_zero_usize(
        cache
            .rebuild_concurrency
            .unwrap_or(DEFAULT_REBUILD_CONCURRENCY),
        "cache.rebuild_concurrency",
    )?;

    Ok(CacheSettings {
        player_ttl_minutes,
        max_player_entries,
        refresh_interval_minutes: cache
            .refresh_interval
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_MINUTES),
        rebuild_concurrency,
    })
}

fn build_endpoint_settings(endpoints: RawEndpointSettings) -> EndpointSettings {
    let defaults = EndpointSettings::default();
    EndpointSettings {
        player_pathway: endpoints.player_pathway.unwrap_or(defaults.player_pathway),
        everyone_pathway: endpoints
            .everyone_pathway
            .unwrap_or(defaults.everyone_pathway),
        beyonder_data: endpoints.beyonder_data.unwrap_or(defaults.beyonder_data),
        beyonder_logs: endpoints.beyonder_logs.unwrap_or(defaults.beyonder_logs),
        artifact: endpoints.artifact.unwrap_or(defaults.artifact),
    }
}

fn build_source_settings(source: RawSourceSettings) -> Result<SourceSettings, LoadError> {
    Ok(SourceSettings {
        beyonders_dir: non_empty_path(
            source.beyonders_dir,
            DEFAULT_BEYONDERS_DIR,
            "source.beyonders_dir",
        )?,
        logs_dir: non_empty_path(source.logs_dir, DEFAULT_LOGS_DIR, "source.logs_dir")?,
        artifacts_dir: non_empty_path(
            source.artifacts_dir,
            DEFAULT_ARTIFACTS_DIR,
            "source.artifacts_dir",
        )?,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
    debug_cache: Option<bool>,
    debug_refresh: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    player_ttl: Option<u64>,
    max_player_entries: Option<usize>,
    refresh_interval: Option<i64>,
    rebuild_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEndpointSettings {
    player_pathway: Option<bool>,
    everyone_pathway: Option<bool>,
    beyonder_data: Option<bool>,
    beyonder_logs: Option<bool>,
    artifact: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSourceSettings {
    beyonders_dir: Option<PathBuf>,
    logs_dir: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}
