//! Configuration module for the freebies watcher.

use serde::Deserialize;
use std::path::Path;

use crate::feed::filter::{builtin_rule, BUILTIN_RULES};
use crate::{FreebiesError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/freebies.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/freebies.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Content source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source kind: "reddit" (JSON listing) or "feed" (RSS/Atom).
    #[serde(default = "default_source_kind")]
    pub kind: String,
    /// URL to poll.
    #[serde(default = "default_source_url")]
    pub url: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum response body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_source_kind() -> String {
    "reddit".to_string()
}

fn default_source_url() -> String {
    "https://old.reddit.com/r/FreeGameFindings/new/.json".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_body_bytes() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_user_agent() -> String {
    "freebies-watcher/0.1 (giveaway notifier)".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            url: default_source_url(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

/// Inclusion filter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Names of the built-in rules to enable.
    #[serde(default = "default_filter_rules")]
    pub rules: Vec<String>,
}

fn default_filter_rules() -> Vec<String> {
    BUILTIN_RULES.iter().map(|name| name.to_string()).collect()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            rules: default_filter_rules(),
        }
    }
}

/// Watcher (polling loop) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    /// Whether the polling loop runs.
    #[serde(default = "default_watcher_enabled")]
    pub enabled: bool,
    /// Minimum wait after a cycle that found something (or failed).
    #[serde(default = "default_cooldown_base")]
    pub cooldown_base_secs: u64,
    /// Minimum wait after a cycle that found nothing new.
    #[serde(default = "default_idle_cooldown_base")]
    pub idle_cooldown_base_secs: u64,
    /// Width of the random jitter added to every wait.
    #[serde(default = "default_cooldown_jitter")]
    pub cooldown_jitter_secs: u64,
    /// Upper bound for the shared fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Upper bound for the delivery barrier.
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,
}

fn default_watcher_enabled() -> bool {
    true
}

fn default_cooldown_base() -> u64 {
    60
}

fn default_idle_cooldown_base() -> u64 {
    120
}

fn default_cooldown_jitter() -> u64 {
    240
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_delivery_timeout() -> u64 {
    120
}

/// Upper bound for every cooldown setting.
pub const MAX_COOLDOWN_SECS: u64 = 24 * 60 * 60;

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_watcher_enabled(),
            cooldown_base_secs: default_cooldown_base(),
            idle_cooldown_base_secs: default_idle_cooldown_base(),
            cooldown_jitter_secs: default_cooldown_jitter(),
            fetch_timeout_secs: default_fetch_timeout(),
            delivery_timeout_secs: default_delivery_timeout(),
        }
    }
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token (must be set).
    #[serde(default)]
    pub token: String,
    /// Bot API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Long-poll timeout for getUpdates in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Whether chat commands (/start, /receive, ...) are handled.
    #[serde(default = "default_commands_enabled")]
    pub commands_enabled: bool,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    300
}

fn default_commands_enabled() -> bool {
    true
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            poll_timeout_secs: default_poll_timeout(),
            commands_enabled: default_commands_enabled(),
        }
    }
}

/// Admin web surface configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Whether the admin HTTP surface is enabled.
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number.
    #[serde(default = "default_web_port")]
    pub port: u16,
}

fn default_web_enabled() -> bool {
    true
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    8080
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: default_web_enabled(),
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Content source configuration.
    #[serde(default)]
    pub source: SourceConfig,
    /// Inclusion filter configuration.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Polling loop configuration.
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// Telegram configuration.
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Admin web configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FreebiesError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FreebiesError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FREEBIES_TELEGRAM_TOKEN`: bot token
    /// - `DB_PATH`: directory holding `db.sqlite3`
    /// - `PORT`: admin web port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("FREEBIES_TELEGRAM_TOKEN") {
            if !token.is_empty() {
                self.telegram.token = token;
            }
        }

        if let Ok(dir) = std::env::var("DB_PATH") {
            if !dir.is_empty() {
                self.database.path = Path::new(&dir)
                    .join("db.sqlite3")
                    .to_string_lossy()
                    .into_owned();
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.web.port = port,
                Err(_) => eprintln!("Ignoring invalid PORT value: {port}"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.token.is_empty() {
            return Err(FreebiesError::Config(
                "telegram token is not set. \
                 Set it in config.toml or via FREEBIES_TELEGRAM_TOKEN environment variable."
                    .to_string(),
            ));
        }

        match self.source.kind.as_str() {
            "reddit" | "feed" => {}
            other => {
                return Err(FreebiesError::Config(format!(
                    "unknown source kind: {other} (expected \"reddit\" or \"feed\")"
                )));
            }
        }

        let url = url::Url::parse(&self.source.url)
            .map_err(|e| FreebiesError::Config(format!("invalid source url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FreebiesError::Config(format!(
                "unsupported source url scheme: {}",
                url.scheme()
            )));
        }

        if let Some(unknown) = self
            .filter
            .rules
            .iter()
            .find(|name| builtin_rule(name).is_none())
        {
            return Err(FreebiesError::Config(format!(
                "unknown filter rule: {unknown}"
            )));
        }

        if self.watcher.fetch_timeout_secs == 0 || self.watcher.delivery_timeout_secs == 0 {
            return Err(FreebiesError::Config(
                "watcher timeouts must be greater than zero".to_string(),
            ));
        }

        let watcher = &self.watcher;
        if let Some((name, _)) = [
            ("cooldown_base_secs", watcher.cooldown_base_secs),
            ("idle_cooldown_base_secs", watcher.idle_cooldown_base_secs),
            ("cooldown_jitter_secs", watcher.cooldown_jitter_secs),
        ]
        .into_iter()
        .find(|(_, secs)| *secs > MAX_COOLDOWN_SECS)
        {
            return Err(FreebiesError::Config(format!(
                "watcher {name} must not exceed {MAX_COOLDOWN_SECS}"
            )));
        }

        if watcher.idle_cooldown_base_secs < watcher.cooldown_base_secs {
            return Err(FreebiesError::Config(
                "watcher idle_cooldown_base_secs must not be shorter than cooldown_base_secs"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
