//! Textual admin command surface: `refresh`, `clear [player]`, `stats`,
//! `reload`. Anything else prints the help.

use std::sync::Arc;

use tracing::info;

use crate::application::error::AppError;
use crate::cache::{CacheConfig, CacheCoordinator, CacheStats};
use crate::infra::error::InfraError;

const HELP: [&str; 5] = [
    "=== Reporter Cache Commands ===",
    "refresh - Refresh everyone cache",
    "clear [player] - Clear cache (all or specific player)",
    "stats - Show cache statistics",
    "reload - Reload config and refresh caches",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterCommand {
    Refresh,
    Clear { player: Option<String> },
    Stats,
    Reload,
    Help,
}

impl ReporterCommand {
    /// Parse operator arguments; the subcommand is matched case-insensitively.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let Some(first) = args.first() else {
            return Self::Help;
        };

        match first.as_ref().to_ascii_lowercase().as_str() {
            "refresh" => Self::Refresh,
            "clear" => Self::Clear {
                player: args.get(1).map(|player| player.as_ref().to_string()),
            },
            "stats" => Self::Stats,
            "reload" => Self::Reload,
            _ => Self::Help,
        }
    }
}

/// Produces the cache configuration to apply on `reload`.
pub trait ReloadSource: Send + Sync {
    fn cache_config(&self) -> Result<CacheConfig, InfraError>;
}

/// A fixed configuration; reloading re-applies it.
impl ReloadSource for CacheConfig {
    fn cache_config(&self) -> Result<CacheConfig, InfraError> {
        Ok(*self)
    }
}

#[derive(Clone)]
pub struct CommandService {
    coordinator: CacheCoordinator,
    reload: Arc<dyn ReloadSource>,
}

impl CommandService {
    pub fn new(coordinator: CacheCoordinator, reload: Arc<dyn ReloadSource>) -> Self {
        Self {
            coordinator,
            reload,
        }
    }

    pub fn coordinator(&self) -> &CacheCoordinator {
        &self.coordinator
    }

    /// Run `command` and return the lines to show the operator.
    pub fn execute(&self, command: &ReporterCommand) -> Result<Vec<String>, AppError> {
        let lines = match command {
            ReporterCommand::Refresh => {
                self.coordinator.refresh();
                vec!["Cache refresh started...".to_string()]
            }
            ReporterCommand::Clear {
                player: Some(player),
            } => {
                self.coordinator.invalidate_entity(player);
                vec![format!("Cache cleared for player: {player}")]
            }
            ReporterCommand::Clear { player: None } => {
                self.coordinator.invalidate_all();
                vec!["All caches cleared!".to_string()]
            }
            ReporterCommand::Stats => stats_lines(&self.coordinator.stats()),
            ReporterCommand::Reload => {
                self.reload()?;
                vec!["Configuration reloaded and caches refreshed!".to_string()]
            }
            ReporterCommand::Help => help_lines(),
        };
        Ok(lines)
    }

    /// Load a fresh configuration and hand it to the coordinator.
    pub fn reload(&self) -> Result<(), AppError> {
        let config = self.reload.cache_config()?;
        self.coordinator.reload(config);
        info!(
            target = "reporter::commands",
            refresh_interval_minutes = config.refresh_interval_minutes,
            "configuration reloaded and caches invalidated"
        );
        Ok(())
    }
}

pub fn help_lines() -> Vec<String> {
    HELP.iter().map(|line| line.to_string()).collect()
}

fn stats_lines(stats: &CacheStats) -> Vec<String> {
    vec![
        "=== Cache Statistics ===".to_string(),
        format!("Player cache entries: {}", stats.player_entries),
        format!("Everyone cache entries: {}", stats.everyone_entries),
    ]
}
