//! Configuration management for the balance logger.
//!
//! Settings are layered, lowest precedence first:
//! - built-in defaults
//! - an optional `balance-logger.{toml,yaml,json}` file (or `--config PATH`)
//! - prefixed environment variables (`KBL__KUCOIN__CURRENCY`, ...)
//! - the flat legacy variables (`KUCOIN_API_KEY`, `OBSIDIAN_VAULT_PATH`, ...)

use crate::error::BalanceError;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_NAME: &str = "balance-logger";
const ENV_PREFIX: &str = "KBL";

/// Flat environment variables and the setting each one overrides.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("KUCOIN_API_KEY", "kucoin.api_key"),
    ("KUCOIN_API_SECRET", "kucoin.api_secret"),
    ("KUCOIN_API_PASSPHRASE", "kucoin.api_passphrase"),
    ("KUCOIN_BALANCE_CURRENCY", "kucoin.currency"),
    ("KUCOIN_API_TIMEOUT", "kucoin.timeout_secs"),
    ("KUCOIN_API_MAX_RETRIES", "kucoin.max_retries"),
    ("KUCOIN_API_RETRY_WAIT", "kucoin.retry_wait_secs"),
    ("OBSIDIAN_VAULT_PATH", "vault.path"),
    ("BALANCE_FOLDER", "vault.balance_folder"),
    ("BALANCE_CACHE_FILE", "cache.file"),
];

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// KuCoin Futures API credentials and request policy
    #[serde(default)]
    pub kucoin: KucoinConfig,
    /// Where balance notes are written
    #[serde(default)]
    pub vault: VaultConfig,
    /// Same-day dedup cache
    #[serde(default)]
    pub cache: CacheConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct KucoinConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret used for HMAC signing
    #[serde(default)]
    pub api_secret: String,
    /// API passphrase (sent signed, never in clear)
    #[serde(default)]
    pub api_passphrase: String,
    /// Settlement currency of the futures account
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Futures REST endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Total attempts per fetch, including the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff wait in seconds, doubled after every failed attempt
    #[serde(default = "default_retry_wait_secs")]
    pub retry_wait_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Root of the notes vault
    #[serde(default)]
    pub path: PathBuf,
    /// Folder inside the vault holding one note per day
    #[serde(default = "default_balance_folder")]
    pub balance_folder: String,
    /// Note file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// JSON file remembering the last logged date
    #[serde(default = "default_cache_file")]
    pub file: PathBuf,
    /// Maximum wait for the cache lock before giving up
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; stdout only when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_currency() -> String {
    "USDT".to_string()
}

fn default_base_url() -> String {
    "https://api-futures.kucoin.com".to_string()
}

fn default_timeout_secs() -> f64 {
    10.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_wait_secs() -> f64 {
    1.0
}

fn default_balance_folder() -> String {
    "Trading/Balances/KuCoin".to_string()
}

fn default_extension() -> String {
    "md".to_string()
}

fn default_cache_file() -> PathBuf {
    expand_home(Path::new("~/.kucoin_balance_log.json"))
}

fn default_lock_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        builder = match file {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX).separator("__"),
        );
        builder = apply_legacy_env(builder, |name| std::env::var(name).ok())?;

        let settings = builder.build().context("Failed to build configuration")?;
        Self::from_settings(settings)
    }

    /// Deserialize an already layered settings tree and normalize its paths.
    fn from_settings(settings: config::Config) -> Result<Self> {
        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.vault.path = expand_home(&config.vault.path);
        config.cache.file = expand_home(&config.cache.file);
        config.logging.directory = config.logging.directory.as_deref().map(expand_home);
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Every missing required value is reported at once.
    pub fn validate(&self) -> Result<(), BalanceError> {
        let required = [
            ("kucoin.api_key (KUCOIN_API_KEY)", self.kucoin.api_key.is_empty()),
            ("kucoin.api_secret (KUCOIN_API_SECRET)", self.kucoin.api_secret.is_empty()),
            (
                "kucoin.api_passphrase (KUCOIN_API_PASSPHRASE)",
                self.kucoin.api_passphrase.is_empty(),
            ),
            ("vault.path (OBSIDIAN_VAULT_PATH)", self.vault.path.as_os_str().is_empty()),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, is_missing)| *is_missing)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(BalanceError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if HeaderValue::from_str(&self.kucoin.api_key).is_err() {
            return Err(BalanceError::Config(
                "kucoin.api_key contains characters not allowed in an HTTP header".to_string(),
            ));
        }

        if self.kucoin.max_retries == 0 {
            return Err(BalanceError::Config(
                "kucoin.max_retries must be at least 1".to_string(),
            ));
        }
        if !(self.kucoin.timeout_secs.is_finite() && self.kucoin.timeout_secs > 0.0) {
            return Err(BalanceError::Config(
                "kucoin.timeout_secs must be a positive number".to_string(),
            ));
        }
        if !(self.kucoin.retry_wait_secs.is_finite() && self.kucoin.retry_wait_secs >= 0.0) {
            return Err(BalanceError::Config(
                "kucoin.retry_wait_secs must be a non-negative number".to_string(),
            ));
        }

        Ok(())
    }
}

impl KucoinConfig {
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::from_secs(10))
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_wait_secs).unwrap_or_default()
    }
}

impl VaultConfig {
    /// Directory holding the per-day balance notes.
    pub fn balance_dir(&self) -> PathBuf {
        self.path.join(&self.balance_folder)
    }
}

impl CacheConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }
}

impl Default for KucoinConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            api_passphrase: String::new(),
            currency: default_currency(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_wait_secs: default_retry_wait_secs(),
        }
    }
}

// Credentials must never reach the logs.
impl fmt::Debug for KucoinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KucoinConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("api_passphrase", &redact(&self.api_passphrase))
            .field("currency", &self.currency)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_wait_secs", &self.retry_wait_secs)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            balance_folder: default_balance_folder(),
            extension: default_extension(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file: default_cache_file(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

/// Override settings from the flat legacy environment variables.
fn apply_legacy_env<F>(
    mut builder: config::ConfigBuilder<config::builder::DefaultState>,
    lookup: F,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in LEGACY_ENV {
        let value = lookup(var).filter(|v| !v.is_empty());
        builder = builder
            .set_override_option(*key, value)
            .with_context(|| format!("Failed to apply {}", var))?;
    }
    Ok(builder)
}

/// Expand a leading `~` against `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}

/// Resolve the date to log: `today` unless a backfill date was requested.
///
/// The override must be `YYYY-MM-DD` and must not lie in the future.
pub fn resolve_target_date(
    requested: Option<&str>,
    today: NaiveDate,
) -> Result<NaiveDate, BalanceError> {
    let Some(raw) = requested else {
        return Ok(today);
    };

    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        BalanceError::Config(format!("invalid date '{}', expected YYYY-MM-DD: {}", raw, e))
    })?;

    if date > today {
        return Err(BalanceError::Config(format!(
            "date {} is in the future (today is {})",
            date, today
        )));
    }

    Ok(date)
}
