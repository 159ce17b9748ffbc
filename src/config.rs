//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. The storage directory can be
//! overridden with the `BAZAAR_DATA_DIR` environment variable.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::{Coins, EconomyRules};
use crate::error::{ConfigError, Result};

/// Environment variable overriding `storage.data_dir`.
pub const DATA_DIR_ENV: &str = "BAZAAR_DATA_DIR";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Supported persistence backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory holding one JSON document per domain.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
        }
    }
}

/// Economy constants.
#[derive(Debug, Clone, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "default_starting_wallet")]
    pub starting_wallet: Coins,
    #[serde(default = "default_bonus_per_option")]
    pub bonus_per_option: Coins,
    /// Fraction of the price an item resells for (e.g., 0.25 = 25%).
    #[serde(default = "default_resale_ratio")]
    pub resale_ratio: Decimal,
    #[serde(default = "default_moderator_price_multiplier")]
    pub moderator_price_multiplier: Coins,
}

const fn default_starting_wallet() -> Coins {
    500
}

const fn default_bonus_per_option() -> Coins {
    100
}

fn default_resale_ratio() -> Decimal {
    Decimal::new(25, 2) // 0.25
}

const fn default_moderator_price_multiplier() -> Coins {
    4
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_wallet: default_starting_wallet(),
            bonus_per_option: default_bonus_per_option(),
            resale_ratio: default_resale_ratio(),
            moderator_price_multiplier: default_moderator_price_multiplier(),
        }
    }
}

impl From<EconomyConfig> for EconomyRules {
    fn from(config: EconomyConfig) -> Self {
        Self {
            starting_wallet: config.starting_wallet,
            bonus_per_option: config.bonus_per_option,
            resale_ratio: config.resale_ratio,
            moderator_price_multiplier: config.moderator_price_multiplier,
        }
    }
}

/// Command boundary settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandsConfig {
    /// Leading marker of a command message.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Inbound messages buffered ahead of the executor.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_prefix() -> String {
    "!".into()
}

const fn default_queue_capacity() -> usize {
    256
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Local console front end: one simulated server and its roster.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_server")]
    pub server_id: u64,
    #[serde(default = "default_console_channel")]
    pub channel_id: u64,
    #[serde(default)]
    pub channels: Vec<ConsoleChannel>,
    #[serde(default)]
    pub members: Vec<ConsoleMember>,
}

const fn default_console_server() -> u64 {
    1
}

const fn default_console_channel() -> u64 {
    1
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server_id: default_console_server(),
            channel_id: default_console_channel(),
            channels: Vec::new(),
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleChannel {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleMember {
    pub id: u64,
    pub display_name: String,
    pub account_name: String,
    #[serde(default)]
    pub privileged: bool,
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration text, apply environment overrides and validate.
    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                config.storage.data_dir = PathBuf::from(dir);
            }
        }

        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.commands.prefix.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "prefix" }.into());
        }
        if self.commands.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue_capacity",
                reason: "must be at least 1".into(),
            }
            .into());
        }
        if self.economy.starting_wallet < 0 {
            return Err(ConfigError::InvalidValue {
                field: "starting_wallet",
                reason: "must not be negative".into(),
            }
            .into());
        }
        if self.economy.resale_ratio < Decimal::ZERO || self.economy.resale_ratio > Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "resale_ratio",
                reason: format!("{} is outside 0..=1", self.economy.resale_ratio),
            }
            .into());
        }
        if self.economy.moderator_price_multiplier <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "moderator_price_multiplier",
                reason: "must be positive".into(),
            }
            .into());
        }
        Ok(())
    }

    /// Economy constants derived from the `[economy]` section.
    #[must_use]
    pub fn rules(&self) -> EconomyRules {
        self.economy.clone().into()
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            _ => {
                fmt()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            storage: StorageConfig::default(),
            economy: EconomyConfig::default(),
            commands: CommandsConfig::default(),
            console: ConsoleConfig::default(),
        }
    }
}
